use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::models::{BookingDraft, RouteSeed, SubmissionResult, VehicleCategory, WizardStep};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("unknown booking field `{0}`")]
    UnknownField(String),
    #[error("unknown vehicle category `{0}`")]
    UnknownCategory(String),
    #[error("passenger count must be a whole number, got `{0}`")]
    InvalidPassengerCount(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("required fields are empty: {}", field_list(.missing))]
pub struct ValidationError {
    pub step: WizardStep,
    pub missing: Vec<BookingField>,
}

fn field_list(fields: &[BookingField]) -> String {
    fields
        .iter()
        .map(|field| field.as_name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BookingField {
    From,
    To,
    Date,
    Time,
    PassengerCount,
    VehicleCategory,
    FullName,
    Phone,
    Notes,
}

impl BookingField {
    pub const ALL: [BookingField; 9] = [
        BookingField::From,
        BookingField::To,
        BookingField::Date,
        BookingField::Time,
        BookingField::PassengerCount,
        BookingField::VehicleCategory,
        BookingField::FullName,
        BookingField::Phone,
        BookingField::Notes,
    ];

    pub fn as_name(self) -> &'static str {
        match self {
            Self::From => "from",
            Self::To => "to",
            Self::Date => "date",
            Self::Time => "time",
            Self::PassengerCount => "passengerCount",
            Self::VehicleCategory => "vehicleCategory",
            Self::FullName => "fullName",
            Self::Phone => "phone",
            Self::Notes => "notes",
        }
    }

    /// Dictionary key of the form label.
    pub fn label_key(self) -> &'static str {
        match self {
            Self::From => "booking.from",
            Self::To => "booking.to",
            Self::Date => "booking.date",
            Self::Time => "booking.time",
            Self::PassengerCount => "booking.passengers",
            Self::VehicleCategory => "booking.vehicle_type",
            Self::FullName => "booking.full_name",
            Self::Phone => "booking.phone",
            Self::Notes => "booking.notes",
        }
    }

    pub fn step(self) -> WizardStep {
        match self {
            Self::From | Self::To | Self::Date | Self::Time => WizardStep::Journey,
            Self::PassengerCount | Self::VehicleCategory => WizardStep::Vehicle,
            Self::FullName | Self::Phone | Self::Notes => WizardStep::Personal,
        }
    }

    pub fn is_required(self) -> bool {
        !matches!(self, Self::Notes)
    }

    pub fn fields_of(step: WizardStep) -> impl Iterator<Item = BookingField> {
        Self::ALL.into_iter().filter(move |field| field.step() == step)
    }
}

impl FromStr for BookingField {
    type Err = FieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "from" => Ok(Self::From),
            "to" => Ok(Self::To),
            "date" => Ok(Self::Date),
            "time" => Ok(Self::Time),
            "passengerCount" | "passenger_count" | "passengers" => Ok(Self::PassengerCount),
            "vehicleCategory" | "vehicle_category" | "vehicleType" => Ok(Self::VehicleCategory),
            "fullName" | "full_name" => Ok(Self::FullName),
            "phone" => Ok(Self::Phone),
            "notes" => Ok(Self::Notes),
            other => Err(FieldError::UnknownField(other.to_string())),
        }
    }
}

impl fmt::Display for BookingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// The step changed; callers bring the view back to the top.
    Moved { from: WizardStep, to: WizardStep },
    /// Already at a boundary, nothing changed.
    Blocked { at: WizardStep },
}

impl Navigation {
    pub fn moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Three-step booking form state.
#[derive(Debug, Clone)]
pub struct BookingWizard {
    draft: BookingDraft,
    step: WizardStep,
    last_result: Option<SubmissionResult>,
}

impl Default for BookingWizard {
    fn default() -> Self {
        Self::new(None)
    }
}

impl BookingWizard {
    pub fn new(seed: Option<RouteSeed>) -> Self {
        Self {
            draft: seed.map(BookingDraft::seeded).unwrap_or_default(),
            step: WizardStep::Journey,
            last_result: None,
        }
    }

    pub fn from_draft(draft: BookingDraft) -> Self {
        let mut wizard = Self::new(None);
        wizard.draft = draft;
        let category = wizard.draft.vehicle_category;
        wizard.set_vehicle_category(category);
        let count = i64::from(wizard.draft.passenger_count);
        wizard.set_passenger_count(count);
        wizard
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn last_result(&self) -> Option<&SubmissionResult> {
        self.last_result.as_ref()
    }

    pub fn passenger_bounds(&self) -> (u8, u8) {
        (1, self.draft.vehicle_category.capacity())
    }

    pub fn advance(&mut self) -> Navigation {
        let current = self.step();
        match current.next() {
            Some(next) => {
                self.step = next;
                Navigation::Moved {
                    from: current,
                    to: next,
                }
            }
            None => Navigation::Blocked { at: current },
        }
    }

    pub fn retreat(&mut self) -> Navigation {
        let current = self.step();
        match current.previous() {
            Some(previous) => {
                self.step = previous;
                Navigation::Moved {
                    from: current,
                    to: previous,
                }
            }
            None => Navigation::Blocked { at: current },
        }
    }

    /// Applies a raw form edit. Passenger counts and categories are parsed and
    /// clamped; every other field is stored exactly as given.
    pub fn update_field(&mut self, field: BookingField, value: &str) -> Result<(), FieldError> {
        match field {
            BookingField::VehicleCategory => {
                let category = value.parse::<VehicleCategory>()?;
                self.set_vehicle_category(category);
            }
            BookingField::PassengerCount => {
                let requested = value
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| FieldError::InvalidPassengerCount(value.to_string()))?;
                self.set_passenger_count(requested);
            }
            BookingField::From => self.draft.from = value.to_string(),
            BookingField::To => self.draft.to = value.to_string(),
            BookingField::Date => self.draft.date = value.to_string(),
            BookingField::Time => self.draft.time = value.to_string(),
            BookingField::FullName => self.draft.full_name = value.to_string(),
            BookingField::Phone => self.draft.phone = value.to_string(),
            BookingField::Notes => self.draft.notes = value.to_string(),
        }
        Ok(())
    }

    pub fn update_named(&mut self, name: &str, value: &str) -> Result<(), FieldError> {
        let field = name.parse::<BookingField>()?;
        self.update_field(field, value)
    }

    pub fn set_vehicle_category(&mut self, category: VehicleCategory) {
        self.draft.vehicle_category = category;
        self.draft.passenger_count = self.draft.passenger_count.min(category.capacity());
    }

    pub fn set_passenger_count(&mut self, requested: i64) {
        self.draft.passenger_count = self.draft.vehicle_category.clamp_passengers(requested);
    }

    pub fn field_value(&self, field: BookingField) -> String {
        match field {
            BookingField::From => self.draft.from.clone(),
            BookingField::To => self.draft.to.clone(),
            BookingField::Date => self.draft.date.clone(),
            BookingField::Time => self.draft.time.clone(),
            BookingField::PassengerCount => self.draft.passenger_count.to_string(),
            BookingField::VehicleCategory => self.draft.vehicle_category.to_string(),
            BookingField::FullName => self.draft.full_name.clone(),
            BookingField::Phone => self.draft.phone.clone(),
            BookingField::Notes => self.draft.notes.clone(),
        }
    }

    /// Required fields of `step` that are still blank.
    pub fn missing_fields(&self, step: WizardStep) -> Vec<BookingField> {
        BookingField::fields_of(step)
            .filter(|field| field.is_required())
            .filter(|field| self.field_value(*field).trim().is_empty())
            .collect()
    }

    pub fn validate_step(&self, step: WizardStep) -> Result<(), ValidationError> {
        let missing = self.missing_fields(step);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { step, missing })
        }
    }

    pub fn validate_all(&self) -> Result<(), ValidationError> {
        WizardStep::ALL
            .into_iter()
            .try_for_each(|step| self.validate_step(step))
    }

    pub fn clear_result(&mut self) {
        self.last_result = None;
    }

    /// Records the outcome of a submission. Success consumes the draft and
    /// returns the wizard to the first step; failure keeps everything.
    pub fn record_result(&mut self, result: SubmissionResult) {
        if result.success {
            self.draft = BookingDraft::default();
            self.step = WizardStep::Journey;
        }
        self.last_result = Some(result);
    }
}
