use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Platform chat identifier. Group ids are negative on Telegram.
pub type ChatId = i64;

/// Platform user identifier.
pub type UserId = i64;

/// Maximum stored length of a logged message, in characters.
pub const MAX_RECORD_CHARS: usize = 2000;

/// A chat this bot has been attached to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatBinding {
    pub chat_id: ChatId,
    /// Chat title at bind time; the chat id rendered as text when unknown.
    pub title: String,
    pub bound_at: DateTime<Utc>,
}

/// One line of the message log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageRecord {
    pub ts: DateTime<Utc>,
    pub chat_id: ChatId,
    pub user: String,
    pub text: String,
}

impl MessageRecord {
    /// Build a record, capping `text` at [`MAX_RECORD_CHARS`].
    pub fn new(ts: DateTime<Utc>, chat_id: ChatId, user: &str, text: &str) -> Self {
        Self {
            ts,
            chat_id,
            user: user.to_string(),
            text: truncate_chars(text, MAX_RECORD_CHARS),
        }
    }
}

/// Static set of chats the bot may serve. Empty means every chat is allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    ids: HashSet<ChatId>,
}

impl AllowList {
    pub fn new(ids: impl IntoIterator<Item = ChatId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Parse a comma-separated list of chat ids, ignoring blank entries.
    pub fn parse(raw: &str) -> crate::Result<Self> {
        let mut ids = HashSet::new();
        for part in raw.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let id = part.parse::<ChatId>().map_err(|_| {
                crate::PorfiryError::Validation(format!("invalid chat id in allow-list: {part:?}"))
            })?;
            ids.insert(id);
        }
        Ok(Self { ids })
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn permits(&self, chat_id: ChatId) -> bool {
        self.ids.is_empty() || self.ids.contains(&chat_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Truncate `s` to at most `max_chars` Unicode scalar values.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_end, _)) => s[..byte_end].to_string(),
        None => s.to_string(),
    }
}
