use crate::error::Result;
use crate::types::ChatId;
use async_trait::async_trait;
use std::sync::Mutex;

/// An inline keyboard button that sends `data` back as a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub reply_to: Option<i64>,
    pub buttons: Vec<InlineButton>,
}

impl OutgoingMessage {
    pub fn new(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply_to: None,
            buttons: Vec::new(),
        }
    }

    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    pub fn with_button(mut self, text: impl Into<String>, data: impl Into<String>) -> Self {
        self.buttons.push(InlineButton {
            text: text.into(),
            data: data.into(),
        });
        self
    }
}

/// Outbound side of the messaging platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, message: OutgoingMessage) -> Result<()>;

    /// Acknowledge a button press so the client stops showing a spinner.
    async fn answer_callback(&self, callback_id: &str) -> Result<()>;
}

/// Messenger that keeps everything it is asked to send. Used by tests and
/// dry runs.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<OutgoingMessage>>,
    answered: Mutex<Vec<String>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn sent_to(&self, chat_id: ChatId) -> Vec<OutgoingMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.chat_id == chat_id)
            .collect()
    }

    pub fn answered_callbacks(&self) -> Vec<String> {
        self.answered.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.answered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(callback_id.to_string());
        Ok(())
    }
}
