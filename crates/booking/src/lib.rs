use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use parking_lot::Mutex;
use ride_core::{
    BookingDraft, BookingField, BookingSubmission, BookingWizard, FieldError, Language,
    Navigation, RouteSeed, SubmissionResult, Translator, ValidationError, WizardStep,
};
use ride_notify::BookingNotifier;
use ride_observability::AppMetrics;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The notifier was called; the result says whether delivery succeeded.
    Completed(SubmissionResult),
    /// Another submission from this desk has not finished yet.
    AlreadyInFlight,
    /// Submission is only offered from the last step.
    NotReady { step: WizardStep },
    Invalid(ValidationError),
}

impl SubmitOutcome {
    pub fn result(&self) -> Option<&SubmissionResult> {
        match self {
            Self::Completed(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub step: WizardStep,
    pub draft: BookingDraft,
    pub passenger_bounds: (u8, u8),
    pub in_flight: bool,
    pub last_result: Option<SubmissionResult>,
}

/// Clears the in-flight flag when dropped, whichever way the submission ends.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One visitor's booking session: the wizard plus its submission pipeline.
pub struct BookingDesk<N>
where
    N: BookingNotifier,
{
    wizard: Mutex<BookingWizard>,
    in_flight: AtomicBool,
    notifier: Arc<N>,
    translator: Arc<dyn Translator>,
    metrics: Arc<AppMetrics>,
}

impl<N> BookingDesk<N>
where
    N: BookingNotifier,
{
    pub fn new(
        notifier: Arc<N>,
        translator: Arc<dyn Translator>,
        metrics: Arc<AppMetrics>,
        seed: Option<RouteSeed>,
    ) -> Self {
        Self::with_wizard(BookingWizard::new(seed), notifier, translator, metrics)
    }

    pub fn with_wizard(
        wizard: BookingWizard,
        notifier: Arc<N>,
        translator: Arc<dyn Translator>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            wizard: Mutex::new(wizard),
            in_flight: AtomicBool::new(false),
            notifier,
            translator,
            metrics,
        }
    }

    pub fn language(&self) -> Language {
        self.translator.language()
    }

    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn view(&self) -> WizardView {
        let wizard = self.wizard.lock();
        WizardView {
            step: wizard.step(),
            draft: wizard.draft().clone(),
            passenger_bounds: wizard.passenger_bounds(),
            in_flight: self.is_in_flight(),
            last_result: wizard.last_result().cloned(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.wizard.lock().step()
    }

    pub fn draft(&self) -> BookingDraft {
        self.wizard.lock().draft().clone()
    }

    pub fn field_value(&self, field: BookingField) -> String {
        self.wizard.lock().field_value(field)
    }

    pub fn missing_fields(&self, step: WizardStep) -> Vec<BookingField> {
        self.wizard.lock().missing_fields(step)
    }

    pub fn advance(&self) -> Navigation {
        self.wizard.lock().advance()
    }

    /// Going back is disabled while a submission is being delivered.
    pub fn retreat(&self) -> Navigation {
        let mut wizard = self.wizard.lock();
        if self.is_in_flight() {
            return Navigation::Blocked { at: wizard.step() };
        }
        wizard.retreat()
    }

    pub fn update_field(&self, field: BookingField, value: &str) -> Result<(), FieldError> {
        self.wizard.lock().update_field(field, value)
    }

    #[instrument(skip(self), fields(channel = self.notifier.channel()))]
    pub async fn submit(&self) -> SubmitOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            self.metrics.inc_rejected_in_flight();
            warn!("submission ignored, previous one still in flight");
            return SubmitOutcome::AlreadyInFlight;
        };

        let submission = {
            let mut wizard = self.wizard.lock();
            let step = wizard.step();
            if !step.is_final() {
                return SubmitOutcome::NotReady { step };
            }
            if let Err(validation) = wizard.validate_all() {
                self.metrics.inc_invalid();
                return SubmitOutcome::Invalid(validation);
            }
            wizard.clear_result();
            BookingSubmission::capture(wizard.draft().clone(), self.language())
        };

        let result = dispatch(
            self.notifier.as_ref(),
            &submission,
            self.translator.as_ref(),
            &self.metrics,
        )
        .await;
        self.wizard.lock().record_result(result.clone());
        SubmitOutcome::Completed(result)
    }
}

/// Hands a submission to a notifier and turns whatever happens into a
/// user-facing result. Delivery errors and panics are logged, never returned.
pub async fn dispatch<N>(
    notifier: &N,
    submission: &BookingSubmission,
    translator: &dyn Translator,
    metrics: &AppMetrics,
) -> SubmissionResult
where
    N: BookingNotifier,
{
    metrics.inc_submission();
    let started = Instant::now();
    let delivery = AssertUnwindSafe(notifier.deliver(submission))
        .catch_unwind()
        .await;
    metrics.observe_delivery(started.elapsed());

    match delivery {
        Ok(Ok(receipt)) => {
            metrics.inc_delivered();
            info!(
                reference = %receipt.reference,
                channel = receipt.channel,
                remote_id = receipt.remote_id.as_deref().unwrap_or("-"),
                "booking submitted"
            );
            SubmissionResult::succeeded(translator.text("booking.success"))
        }
        Ok(Err(delivery_error)) => {
            metrics.inc_failed();
            error!(
                reference = %submission.reference,
                channel = notifier.channel(),
                error = %delivery_error,
                "booking delivery failed"
            );
            SubmissionResult::failed(translator.text("booking.error"))
        }
        Err(_) => {
            metrics.inc_failed();
            error!(
                reference = %submission.reference,
                channel = notifier.channel(),
                "booking delivery panicked"
            );
            SubmissionResult::failed(translator.text("booking.unexpected_error"))
        }
    }
}
