//! Telegram Bot API notifier.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::TradeRecord;

use super::TradeSink;

const TELEGRAM_API: &str = "https://api.telegram.org";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends a plain-text summary of every record to one chat.
pub struct TelegramNotifier {
    client: Client,
    base_url: String,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self> {
        Self::with_base_url(TELEGRAM_API.to_string(), config)
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(base_url: String, config: TelegramConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    pub async fn send(&self, text: String) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.config.bot_token);
        let body = SendMessage {
            chat_id: &self.config.chat_id,
            text,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to reach Telegram")?;

        let status = response.status();
        let parsed: SendMessageResponse = response
            .json()
            .await
            .with_context(|| format!("Unexpected Telegram response (HTTP {})", status))?;

        if !parsed.ok {
            bail!(
                "Telegram rejected message: {}",
                parsed.description.unwrap_or_else(|| status.to_string())
            );
        }

        debug!(chat_id = %self.config.chat_id, "Telegram message sent");
        Ok(())
    }
}

#[async_trait]
impl TradeSink for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn record(&self, record: &TradeRecord) -> Result<()> {
        self.send(record.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::models::{AccountSnapshot, OrderOutcome};

    fn notifier(server: &MockServer) -> TelegramNotifier {
        TelegramNotifier::with_base_url(
            server.uri(),
            TelegramConfig {
                bot_token: "123:abc".to_string(),
                chat_id: "42".to_string(),
            },
        )
        .unwrap()
    }

    fn record() -> TradeRecord {
        TradeRecord {
            timestamp: Utc::now(),
            instrument: "ETH-USDT-SWAP".to_string(),
            snapshot: AccountSnapshot::new(dec!(1000), dec!(2000), dec!(1.5)),
            decision: None,
            outcome: OrderOutcome::Held,
        }
    }

    #[tokio::test]
    async fn test_sends_record_summary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(serde_json::json!({ "chat_id": "42" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        notifier(&server).record(&record()).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_message_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let err = notifier(&server).record(&record()).await.unwrap_err();
        assert!(err.to_string().contains("chat not found"));
    }
}
