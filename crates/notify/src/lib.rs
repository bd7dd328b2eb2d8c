mod relay;
mod telegram;

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use ride_core::BookingSubmission;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub use relay::{RelayNotifier, RelayRequest, RelayResponse, RELAY_BOOKINGS_PATH};
pub use telegram::{TelegramConfig, TelegramNotifier, DEFAULT_TELEGRAM_API_BASE};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery transport failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("delivery rejected with status {status}: {detail}")]
    Rejected { status: StatusCode, detail: String },
    #[error("delivery response could not be decoded: {0}")]
    Decode(String),
    #[error("delivery channel misconfigured: {0}")]
    Config(String),
}

impl DeliveryError {
    pub(crate) fn transport(error: reqwest::Error) -> Self {
        // Request URLs can embed the bot token.
        Self::Transport(error.without_url())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReceipt {
    pub channel: &'static str,
    pub reference: Uuid,
    pub remote_id: Option<String>,
}

/// A destination booking submissions are forwarded to.
pub trait BookingNotifier: Send + Sync {
    fn channel(&self) -> &'static str;

    fn deliver(
        &self,
        submission: &BookingSubmission,
    ) -> impl Future<Output = Result<DeliveryReceipt, DeliveryError>> + Send;
}

pub fn build_http_client() -> Result<Client, DeliveryError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(6))
        .timeout(Duration::from_secs(20))
        .build()
        .map_err(DeliveryError::transport)
}

pub(crate) const GENERIC_FAILURE_DETAIL: &str = "unknown error";
