use reqwest::header::ACCEPT_LANGUAGE;
use reqwest::Client;
use ride_core::{BookingDraft, BookingSubmission};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::{BookingNotifier, DeliveryError, DeliveryReceipt, GENERIC_FAILURE_DETAIL};

pub const RELAY_BOOKINGS_PATH: &str = "/v1/bookings";

/// Body accepted by the backend's booking endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayRequest {
    pub draft: BookingDraft,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub reference: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub reference: Option<Uuid>,
}

/// Forwards bookings to the project's own backend, which holds the bot
/// credentials and talks to Telegram on the client's behalf.
#[derive(Debug, Clone)]
pub struct RelayNotifier {
    client: Client,
    endpoint: Url,
}

impl RelayNotifier {
    pub fn new(client: Client, backend_base: &str) -> Result<Self, DeliveryError> {
        let base = backend_base.trim().trim_end_matches('/');
        let endpoint = Url::parse(&format!("{base}{RELAY_BOOKINGS_PATH}"))
            .map_err(|error| DeliveryError::Config(format!("invalid backend url: {error}")))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl BookingNotifier for RelayNotifier {
    fn channel(&self) -> &'static str {
        "relay"
    }

    async fn deliver(&self, submission: &BookingSubmission) -> Result<DeliveryReceipt, DeliveryError> {
        let request = RelayRequest {
            draft: submission.draft.clone(),
            language: Some(submission.language.as_code().to_string()),
            reference: Some(submission.reference),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(ACCEPT_LANGUAGE, submission.language.as_code())
            .json(&request)
            .send()
            .await
            .map_err(DeliveryError::transport)?;

        let status = response.status();
        let body = response.text().await.map_err(DeliveryError::transport)?;
        let parsed = serde_json::from_str::<serde_json::Value>(&body).ok();

        if !status.is_success() {
            let detail = parsed
                .as_ref()
                .and_then(|value| value.get("message"))
                .and_then(|value| value.as_str())
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(GENERIC_FAILURE_DETAIL)
                .to_string();
            warn!(
                reference = %submission.reference,
                status = status.as_u16(),
                detail = %detail,
                "backend rejected booking"
            );
            return Err(DeliveryError::Rejected { status, detail });
        }

        let acknowledged = parsed
            .and_then(|value| serde_json::from_value::<RelayResponse>(value).ok())
            .ok_or_else(|| DeliveryError::Decode("backend reply is not a booking result".to_string()))?;
        if !acknowledged.success {
            return Err(DeliveryError::Rejected {
                status,
                detail: acknowledged.message,
            });
        }

        info!(reference = %submission.reference, "booking relayed to backend");
        Ok(DeliveryReceipt {
            channel: self.channel(),
            reference: acknowledged.reference.unwrap_or(submission.reference),
            remote_id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use ride_core::Language;
    use serde_json::json;

    use super::*;
    use crate::build_http_client;

    fn submission() -> BookingSubmission {
        let draft = BookingDraft {
            from: "Almaty".to_string(),
            to: "Issyk-Kul".to_string(),
            date: "2026-07-14".to_string(),
            time: "06:15".to_string(),
            full_name: "Dana".to_string(),
            phone: "+7 701 000 0000".to_string(),
            ..BookingDraft::default()
        };
        BookingSubmission::capture(draft, Language::En)
    }

    #[tokio::test]
    async fn posts_the_draft_to_the_backend() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(RELAY_BOOKINGS_PATH)
                    .header("accept-language", "en")
                    .json_body_partial(r#"{"language":"en","draft":{"fullName":"Dana"}}"#);
                then.status(200)
                    .json_body(json!({ "success": true, "message": "sent" }));
            })
            .await;

        let relay = RelayNotifier::new(build_http_client().unwrap(), &server.base_url()).unwrap();
        let submission = submission();
        let receipt = relay.deliver(&submission).await.unwrap();

        mock.assert_async().await;
        assert_eq!(receipt.reference, submission.reference);
    }

    #[tokio::test]
    async fn reads_the_backend_error_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(RELAY_BOOKINGS_PATH);
                then.status(502)
                    .json_body(json!({ "success": false, "message": "operator channel down" }));
            })
            .await;

        let relay = RelayNotifier::new(build_http_client().unwrap(), &server.base_url()).unwrap();
        let error = relay.deliver(&submission()).await.unwrap_err();
        assert!(matches!(
            error,
            DeliveryError::Rejected { ref detail, .. } if detail == "operator channel down"
        ));
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(RELAY_BOOKINGS_PATH);
                then.status(200).body("<html>proxy login</html>");
            })
            .await;

        let relay = RelayNotifier::new(build_http_client().unwrap(), &server.base_url()).unwrap();
        assert!(matches!(
            relay.deliver(&submission()).await,
            Err(DeliveryError::Decode(_))
        ));
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let relay =
            RelayNotifier::new(build_http_client().unwrap(), "https://ride.example.com/").unwrap();
        assert_eq!(relay.endpoint().as_str(), "https://ride.example.com/v1/bookings");
    }
}
