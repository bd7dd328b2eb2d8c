use reqwest::Client;
use ride_core::{compose_operator_message, BookingSubmission, Dictionary, Language};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::{BookingNotifier, DeliveryError, DeliveryReceipt, GENERIC_FAILURE_DETAIL};

pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramConfig {
    pub api_base: Url,
    pub bot_token: String,
    pub chat_id: String,
    pub operator_language: Language,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("api_base", &self.api_base.as_str())
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("operator_language", &self.operator_language)
            .finish()
    }
}

impl TelegramConfig {
    pub fn new(
        api_base: &str,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        operator_language: Language,
    ) -> Result<Self, DeliveryError> {
        let api_base = Url::parse(api_base)
            .map_err(|error| DeliveryError::Config(format!("invalid telegram api base: {error}")))?;
        let bot_token = bot_token.into();
        let chat_id = chat_id.into();
        if bot_token.trim().is_empty() || chat_id.trim().is_empty() {
            return Err(DeliveryError::Config(
                "telegram bot token and chat id are required".to_string(),
            ));
        }

        Ok(Self {
            api_base,
            bot_token,
            chat_id,
            operator_language,
        })
    }

    fn send_message_url(&self) -> Result<Url, DeliveryError> {
        let base = self.api_base.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/bot{}/sendMessage", self.bot_token))
            .map_err(|_| DeliveryError::Config("telegram bot token is not url safe".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Posts bookings to an operator chat through the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(client: Client, config: TelegramConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &TelegramConfig {
        &self.config
    }

    pub fn render(&self, submission: &BookingSubmission) -> String {
        compose_operator_message(submission, &Dictionary::new(self.config.operator_language))
    }
}

impl BookingNotifier for TelegramNotifier {
    fn channel(&self) -> &'static str {
        "telegram"
    }

    async fn deliver(&self, submission: &BookingSubmission) -> Result<DeliveryReceipt, DeliveryError> {
        let text = self.render(submission);
        let url = self.config.send_message_url()?;

        let response = self
            .client
            .post(url)
            .json(&SendMessageRequest {
                chat_id: &self.config.chat_id,
                text: &text,
                parse_mode: "Markdown",
            })
            .send()
            .await
            .map_err(DeliveryError::transport)?;

        let status = response.status();
        let body = response.text().await.map_err(DeliveryError::transport)?;
        let parsed = serde_json::from_str::<SendMessageResponse>(&body).ok();

        if !status.is_success() {
            let detail = parsed
                .and_then(|payload| payload.description)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| GENERIC_FAILURE_DETAIL.to_string());
            warn!(
                reference = %submission.reference,
                status = status.as_u16(),
                detail = %detail,
                "telegram rejected booking"
            );
            return Err(DeliveryError::Rejected { status, detail });
        }

        let remote_id = match parsed {
            Some(payload) if payload.ok => payload.result.map(|sent| sent.message_id.to_string()),
            _ => {
                warn!(reference = %submission.reference, "telegram acknowledgement was not well formed");
                None
            }
        };

        info!(
            reference = %submission.reference,
            message_id = remote_id.as_deref().unwrap_or("-"),
            "booking delivered to telegram"
        );

        Ok(DeliveryReceipt {
            channel: self.channel(),
            reference: submission.reference,
            remote_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use httpmock::prelude::*;
    use ride_core::{BookingDraft, VehicleCategory};
    use serde_json::json;

    use super::*;
    use crate::build_http_client;

    fn submission() -> BookingSubmission {
        let draft = BookingDraft {
            from: "Bishkek".to_string(),
            to: "Osh".to_string(),
            date: "2026-12-01".to_string(),
            time: "07:00".to_string(),
            passenger_count: 2,
            vehicle_category: VehicleCategory::Premium,
            full_name: "Timur".to_string(),
            phone: "+996 700 000 000".to_string(),
            notes: String::new(),
        };
        let at = Utc.with_ymd_and_hms(2026, 11, 20, 6, 0, 0).unwrap();
        BookingSubmission::capture_at(draft, Language::Ru, at)
    }

    fn notifier(server: &MockServer) -> TelegramNotifier {
        let config =
            TelegramConfig::new(&server.base_url(), "123:ABC", "42", Language::Ru).unwrap();
        TelegramNotifier::new(build_http_client().unwrap(), config)
    }

    #[tokio::test]
    async fn posts_markdown_message_to_the_chat() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/bot123:ABC/sendMessage")
                    .json_body_partial(r#"{"chat_id":"42","parse_mode":"Markdown"}"#);
                then.status(200)
                    .json_body(json!({ "ok": true, "result": { "message_id": 991 } }));
            })
            .await;

        let receipt = notifier(&server).deliver(&submission()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(receipt.channel, "telegram");
        assert_eq!(receipt.remote_id.as_deref(), Some("991"));
    }

    #[tokio::test]
    async fn surfaces_the_api_description_on_rejection() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/bot123:ABC/sendMessage");
                then.status(400).json_body(
                    json!({ "ok": false, "description": "Bad Request: chat not found" }),
                );
            })
            .await;

        let error = notifier(&server).deliver(&submission()).await.unwrap_err();
        match error {
            DeliveryError::Rejected { status, detail } => {
                assert_eq!(status.as_u16(), 400);
                assert_eq!(detail, "Bad Request: chat not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn falls_back_to_generic_detail_without_a_json_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/bot123:ABC/sendMessage");
                then.status(500).body("upstream exploded");
            })
            .await;

        let error = notifier(&server).deliver(&submission()).await.unwrap_err();
        assert!(matches!(
            error,
            DeliveryError::Rejected { ref detail, .. } if detail == GENERIC_FAILURE_DETAIL
        ));
    }

    #[test]
    fn debug_output_hides_the_token() {
        let config =
            TelegramConfig::new(DEFAULT_TELEGRAM_API_BASE, "123:SECRET", "42", Language::En)
                .unwrap();
        assert!(!format!("{config:?}").contains("SECRET"));
    }

    #[test]
    fn rejects_blank_credentials() {
        assert!(matches!(
            TelegramConfig::new(DEFAULT_TELEGRAM_API_BASE, " ", "42", Language::Ru),
            Err(DeliveryError::Config(_))
        ));
    }
}
