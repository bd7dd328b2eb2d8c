use std::io::{BufRead, Write};

use anyhow::Result;
use ride_booking::{BookingDesk, SubmitOutcome};
use ride_core::{BookingField, Navigation, Translator, VehicleCategory, WizardStep};
use ride_notify::BookingNotifier;

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

enum Action {
    Next,
    Back,
    Submit,
    Edit,
    Quit,
}

/// Line-oriented front end for the booking wizard.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// `None` once input is exhausted.
    fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    pub async fn run<N: BookingNotifier>(&mut self, desk: &BookingDesk<N>) -> Result<()> {
        let t = desk.translator();
        writeln!(
            self.output,
            "{}\n{}\n",
            t.text("booking.title"),
            t.text("booking.subtitle")
        )?;

        loop {
            let step = desk.step();
            self.print_header(t, step)?;
            if !self.fill_step(desk, step)? {
                return Ok(());
            }

            let missing = desk.missing_fields(step);
            if !missing.is_empty() {
                let labels = missing
                    .iter()
                    .map(|field| t.text(field.label_key()))
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(
                    self.output,
                    "{}\n",
                    t.translate("booking.required", &[("fields", labels.as_str())])
                )?;
                continue;
            }

            let Some(action) = self.ask_action(t, step)? else {
                return Ok(());
            };

            match action {
                Action::Next => self.report_navigation(desk.advance())?,
                Action::Back => self.report_navigation(desk.retreat())?,
                Action::Edit => continue,
                Action::Quit => return Ok(()),
                Action::Submit => {
                    writeln!(self.output, "{}", t.text("common.submitting"))?;
                    match desk.submit().await {
                        SubmitOutcome::Completed(result) => {
                            writeln!(self.output, "\n{}\n", result.message)?;
                            if result.success {
                                let prompt = format!("{}? [y/N] ", t.text("common.book_now"));
                                let again = self.ask(&prompt)?.is_some_and(|answer| {
                                    answer.trim().eq_ignore_ascii_case("y")
                                });
                                if !again {
                                    return Ok(());
                                }
                                write!(self.output, "{CLEAR_SCREEN}")?;
                            }
                        }
                        SubmitOutcome::AlreadyInFlight => {
                            writeln!(self.output, "{}", t.text("booking.in_flight"))?
                        }
                        SubmitOutcome::NotReady { .. } | SubmitOutcome::Invalid(_) => {}
                    }
                }
            }
        }
    }

    /// Prompts every field of the step; blank input keeps the current value.
    fn fill_step<N: BookingNotifier>(
        &mut self,
        desk: &BookingDesk<N>,
        step: WizardStep,
    ) -> Result<bool> {
        let t = desk.translator();
        if step == WizardStep::Journey {
            writeln!(self.output, "{}", t.text("booking.anywhere_hint"))?;
        }

        for field in prompt_order(step) {
            if field == BookingField::VehicleCategory {
                self.print_categories(t)?;
            }
            if field == BookingField::PassengerCount {
                let (min, max) = desk.view().passenger_bounds;
                let (min, max) = (min.to_string(), max.to_string());
                writeln!(
                    self.output,
                    "{}",
                    t.translate(
                        "booking.passenger_bounds",
                        &[("min", min.as_str()), ("max", max.as_str())]
                    )
                )?;
            }

            loop {
                let current = desk.field_value(field);
                let prompt = if current.is_empty() {
                    format!("{}: ", t.text(field.label_key()))
                } else {
                    format!("{} [{current}]: ", t.text(field.label_key()))
                };
                let Some(answer) = self.ask(&prompt)? else {
                    return Ok(false);
                };
                if answer.trim().is_empty() {
                    break;
                }
                match desk.update_field(field, &answer) {
                    Ok(()) => {
                        let stored = desk.field_value(field);
                        if field == BookingField::PassengerCount && stored != answer.trim() {
                            writeln!(
                                self.output,
                                "{}",
                                t.translate(
                                    "booking.passengers_adjusted",
                                    &[("count", stored.as_str())]
                                )
                            )?;
                        }
                        break;
                    }
                    Err(error) => writeln!(self.output, "{error}")?,
                }
            }
        }
        Ok(true)
    }

    fn ask_action(&mut self, t: &dyn Translator, step: WizardStep) -> Result<Option<Action>> {
        let forward = if step.is_final() {
            t.text("booking.book_ride")
        } else {
            t.text("common.next")
        };
        let prompt = if step.previous().is_some() {
            format!("[Enter] {forward}  [b] {}  [e] edit  [q] quit: ", t.text("common.back"))
        } else {
            format!("[Enter] {forward}  [e] edit  [q] quit: ")
        };

        let Some(answer) = self.ask(&prompt)? else {
            return Ok(None);
        };
        let action = match answer.trim().to_lowercase().as_str() {
            "b" | "back" => Action::Back,
            "e" | "edit" => Action::Edit,
            "q" | "quit" | "exit" => Action::Quit,
            _ if step.is_final() => Action::Submit,
            _ => Action::Next,
        };
        Ok(Some(action))
    }

    fn print_header(&mut self, t: &dyn Translator, step: WizardStep) -> Result<()> {
        writeln!(
            self.output,
            "{}/{}: {}",
            step.number(),
            WizardStep::ALL.len(),
            t.text(step.title_key())
        )?;
        Ok(())
    }

    fn print_categories(&mut self, t: &dyn Translator) -> Result<()> {
        for category in VehicleCategory::ALL {
            let capacity = category.capacity().to_string();
            writeln!(
                self.output,
                "  {:<9} {} ({})",
                category.as_code(),
                t.text(&category.title_key()),
                t.translate("vehicles.capacity", &[("count", capacity.as_str())])
            )?;
        }
        Ok(())
    }

    fn report_navigation(&mut self, navigation: Navigation) -> Result<()> {
        // A moved step starts on a fresh screen.
        if navigation.moved() {
            write!(self.output, "{CLEAR_SCREEN}")?;
        }
        Ok(())
    }
}

/// The category is asked first so the passenger bounds shown are its own.
fn prompt_order(step: WizardStep) -> Vec<BookingField> {
    let mut fields = BookingField::fields_of(step).collect::<Vec<_>>();
    fields.sort_by_key(|field| *field != BookingField::VehicleCategory);
    fields
}
