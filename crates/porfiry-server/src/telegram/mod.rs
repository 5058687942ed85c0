//! Minimal Telegram Bot API client over reqwest.

pub mod poller;

pub use poller::Poller;

use async_trait::async_trait;
use porfiry_core::{Messenger, OutgoingMessage, PorfiryError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use telegram_adapter::{ApiResponse, Update, User, ALLOWED_UPDATES};
use thiserror::Error;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
/// Timeout for everything except long polls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Slack on top of the long-poll timeout before the HTTP request gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Telegram request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Telegram API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("Unexpected Telegram response (HTTP {status}): {detail}")]
    Malformed { status: u16, detail: String },
}

/// An update that arrived in a `getUpdates` batch, parsed or not.
pub struct RawUpdate {
    pub update_id: i64,
    pub parsed: Option<Update>,
}

#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    /// `{api_base}/bot{token}`. Never logged.
    endpoint: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Result<Self, TelegramError> {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    pub fn with_api_base(token: &str, api_base: &str) -> Result<Self, TelegramError> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<T, TelegramError> {
        let response = self
            .http
            .post(format!("{}/{}", self.endpoint, method))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            // The URL carries the bot token.
            .map_err(|e| TelegramError::Transport(e.without_url()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TelegramError::Transport(e.without_url()))?;

        let parsed: ApiResponse<T> =
            serde_json::from_str(&text).map_err(|e| TelegramError::Malformed {
                status,
                detail: e.to_string(),
            })?;
        if !parsed.ok {
            return Err(TelegramError::Api {
                code: parsed.error_code.unwrap_or(i64::from(status)),
                description: parsed.description.unwrap_or_default(),
            });
        }
        parsed.result.ok_or_else(|| TelegramError::Malformed {
            status,
            detail: format!("{method} returned ok without a result"),
        })
    }

    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &json!({}), REQUEST_TIMEOUT).await
    }

    /// Long-poll for updates after `offset`. Updates that do not match the
    /// modelled shapes are returned unparsed so the offset still advances.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<RawUpdate>, TelegramError> {
        let mut body = json!({
            "timeout": timeout.as_secs(),
            "allowed_updates": ALLOWED_UPDATES,
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }

        let raw: Vec<Value> = self.call("getUpdates", &body, timeout + POLL_GRACE).await?;
        Ok(raw
            .into_iter()
            .filter_map(|value| {
                let update_id = value.get("update_id").and_then(Value::as_i64)?;
                let parsed = match serde_json::from_value::<Update>(value) {
                    Ok(update) => Some(update),
                    Err(e) => {
                        tracing::warn!("Skipping unparseable update {}: {}", update_id, e);
                        None
                    }
                };
                Some(RawUpdate { update_id, parsed })
            })
            .collect())
    }

    pub async fn send_message(&self, message: &OutgoingMessage) -> Result<(), TelegramError> {
        let mut body = json!({
            "chat_id": message.chat_id,
            "text": message.text,
        });
        if let Some(reply_to) = message.reply_to {
            body["reply_to_message_id"] = json!(reply_to);
            // Still deliver if the original was deleted meanwhile.
            body["allow_sending_without_reply"] = json!(true);
        }
        if !message.buttons.is_empty() {
            let row: Vec<Value> = message
                .buttons
                .iter()
                .map(|b| json!({"text": b.text, "callback_data": b.data}))
                .collect();
            body["reply_markup"] = json!({ "inline_keyboard": [row] });
        }
        let _: Value = self.call("sendMessage", &body, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_id: &str) -> Result<(), TelegramError> {
        let _: Value = self
            .call(
                "answerCallbackQuery",
                &json!({ "callback_query_id": callback_id }),
                REQUEST_TIMEOUT,
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send(&self, message: OutgoingMessage) -> porfiry_core::Result<()> {
        self.send_message(&message)
            .await
            .map_err(|e| PorfiryError::Messenger(e.to_string()))
    }

    async fn answer_callback(&self, callback_id: &str) -> porfiry_core::Result<()> {
        self.answer_callback_query(callback_id)
            .await
            .map_err(|e| PorfiryError::Messenger(e.to_string()))
    }
}
