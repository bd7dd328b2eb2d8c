use anyhow::{bail, Context, Result};
use ride_core::{BookingSubmission, Language};
use ride_notify::{
    build_http_client, BookingNotifier, DeliveryError, DeliveryReceipt, RelayNotifier,
    TelegramConfig, TelegramNotifier,
};

/// Where the terminal client sends finished bookings.
pub enum Channel {
    Relay(RelayNotifier),
    Telegram(TelegramNotifier),
}

pub struct ChannelOptions {
    pub backend: Option<String>,
    pub telegram_api_base: String,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub operator_language: Language,
}

impl Channel {
    /// Prefers the backend relay; direct Telegram delivery needs both
    /// credentials.
    pub fn from_options(options: ChannelOptions) -> Result<Self> {
        let client = build_http_client().context("failed to build http client")?;

        if let Some(backend) = options.backend {
            let relay = RelayNotifier::new(client, &backend)
                .with_context(|| format!("invalid --backend `{backend}`"))?;
            return Ok(Self::Relay(relay));
        }

        match (options.bot_token, options.chat_id) {
            (Some(token), Some(chat_id)) => {
                let config = TelegramConfig::new(
                    &options.telegram_api_base,
                    token,
                    chat_id,
                    options.operator_language,
                )
                .context("invalid telegram configuration")?;
                Ok(Self::Telegram(TelegramNotifier::new(client, config)))
            }
            _ => bail!(
                "no delivery channel: pass --backend or set RIDE_TELEGRAM_BOT_TOKEN and RIDE_TELEGRAM_CHAT_ID"
            ),
        }
    }
}

impl BookingNotifier for Channel {
    fn channel(&self) -> &'static str {
        match self {
            Self::Relay(relay) => relay.channel(),
            Self::Telegram(telegram) => telegram.channel(),
        }
    }

    async fn deliver(&self, submission: &BookingSubmission) -> Result<DeliveryReceipt, DeliveryError> {
        match self {
            Self::Relay(relay) => relay.deliver(submission).await,
            Self::Telegram(telegram) => telegram.deliver(submission).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ChannelOptions {
        ChannelOptions {
            backend: None,
            telegram_api_base: ride_notify::DEFAULT_TELEGRAM_API_BASE.to_string(),
            bot_token: None,
            chat_id: None,
            operator_language: Language::Ru,
        }
    }

    #[test]
    fn backend_wins_over_telegram_credentials() {
        let channel = Channel::from_options(ChannelOptions {
            backend: Some("http://localhost:8080".to_string()),
            bot_token: Some("1:A".to_string()),
            chat_id: Some("42".to_string()),
            ..options()
        })
        .unwrap();
        assert_eq!(channel.channel(), "relay");
    }

    #[test]
    fn telegram_needs_both_credentials() {
        let half_configured = Channel::from_options(ChannelOptions {
            bot_token: Some("1:A".to_string()),
            ..options()
        });
        assert!(half_configured.is_err());

        let channel = Channel::from_options(ChannelOptions {
            bot_token: Some("1:A".to_string()),
            chat_id: Some("42".to_string()),
            ..options()
        })
        .unwrap();
        assert_eq!(channel.channel(), "telegram");
    }
}
