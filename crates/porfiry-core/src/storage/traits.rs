use crate::error::Result;
use crate::types::{ChatBinding, ChatId, MessageRecord};
use chrono::Duration;
use std::collections::BTreeMap;

/// Persistent set of chats the bot has been bound to.
pub trait ChatRegistry: Send + Sync {
    /// Insert or overwrite the binding for `chat_id`, stamping it with the current time.
    fn bind(&self, chat_id: ChatId, title: Option<&str>) -> Result<ChatBinding>;

    /// True iff a binding exists for `chat_id`.
    fn is_bound(&self, chat_id: ChatId) -> Result<bool>;

    /// Full snapshot of every binding, keyed by chat id.
    fn list_bindings(&self) -> Result<BTreeMap<ChatId, ChatBinding>>;
}

/// Append-only record of chat messages.
pub trait MessageLog: Send + Sync {
    /// Append one record. Text longer than the record cap is truncated.
    fn append(&self, chat_id: ChatId, user: &str, text: &str) -> Result<MessageRecord>;

    /// Records of `chat_id` no older than `window`, oldest first.
    fn recent_within_window(&self, chat_id: ChatId, window: Duration) -> Result<Vec<MessageRecord>>;

    /// The newest `n` records of `chat_id`, oldest first.
    fn last_n(&self, chat_id: ChatId, n: usize) -> Result<Vec<MessageRecord>>;

    /// Every stored record in append order.
    fn records(&self) -> Result<Vec<MessageRecord>>;

    /// Replace the log with `f(records)` while holding the writer lock.
    /// Lines that never parsed are kept as they are. Returns how many records
    /// were dropped.
    fn rewrite_with(
        &self,
        f: &mut dyn FnMut(Vec<MessageRecord>) -> Vec<MessageRecord>,
    ) -> Result<usize>;
}
