//! Completion gateway: the single seam between the bot and the remote
//! text-generation service.

mod comet;
mod mock;
mod shapes;

pub use comet::{CometClient, GatewayConfig};
pub use mock::{MockGateway, MockReply};
pub use shapes::{extract_text, ResponseShape};

use async_trait::async_trait;
use thiserror::Error;

/// Longest slice of an error response body kept in [`CompletionError::Status`].
const ERROR_BODY_EXCERPT: usize = 500;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed completion response: {0}")]
    MalformedBody(#[source] serde_json::Error),

    #[error("completion API returned no text output")]
    NoTextOutput,
}

impl CompletionError {
    pub(crate) fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: crate::types::truncate_chars(body.trim(), ERROR_BODY_EXCERPT),
        }
    }

    /// HTTP status of a non-success response, if that is what failed.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Remote text generation. Implementations perform no retries of their own
/// beyond what an operation documents.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// One chat-completion round trip with a system and a user message.
    async fn complete(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, CompletionError>;

    /// A completion with web search enabled.
    async fn search(&self, prompt: &str) -> Result<String, CompletionError>;
}
