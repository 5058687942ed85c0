use super::{CompletionError, CompletionGateway};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// What the mock answers for one call.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    /// Fail as if the remote answered with this HTTP status.
    Status(u16, String),
    NoText,
}

/// Scripted in-process gateway. Replies are consumed in order; once the
/// script runs out every call gets the fallback reply.
#[derive(Debug)]
pub struct MockGateway {
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockGateway {
    /// A gateway that always answers `text`.
    pub fn answering(text: &str) -> Self {
        Self::scripted(Vec::new(), MockReply::Text(text.to_string()))
    }

    pub fn scripted(script: Vec<MockReply>, fallback: MockReply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every `(system_prompt, user_prompt)` seen so far. Search calls are
    /// recorded with an empty system prompt.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn next_reply(&self, system_prompt: &str, user_prompt: &str) -> Result<String, CompletionError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((system_prompt.to_string(), user_prompt.to_string()));

        let reply = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Status(status, body) => Err(CompletionError::status(status, &body)),
            MockReply::NoText => Err(CompletionError::NoTextOutput),
        }
    }
}

#[async_trait]
impl CompletionGateway for MockGateway {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError> {
        self.next_reply(system_prompt, user_prompt)
    }

    async fn search(&self, prompt: &str) -> Result<String, CompletionError> {
        self.next_reply("", prompt)
    }
}
