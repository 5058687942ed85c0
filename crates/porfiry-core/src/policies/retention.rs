use crate::clock::Clock;
use crate::error::Result;
use crate::storage::MessageLog;
use crate::types::{ChatId, MessageRecord};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Retention configuration for the message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Records older than this many days are dropped. 0 = keep forever.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,
    /// Hard cap on records kept per chat; the newest survive.
    #[serde(default)]
    pub max_records_per_chat: Option<usize>,
}

fn default_max_age_days() -> u64 {
    7
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
            max_records_per_chat: None,
        }
    }
}

impl RetentionConfig {
    pub fn is_noop(&self) -> bool {
        self.max_age_days == 0 && self.max_records_per_chat.is_none()
    }
}

/// Drives message-log compaction based on age and per-chat count caps.
pub struct RetentionEngine {
    config: RetentionConfig,
}

impl RetentionEngine {
    pub fn new(config: RetentionConfig) -> Self {
        Self { config }
    }

    /// Rewrite the log without expired or over-cap records.
    /// Returns the number of records removed.
    pub fn compact<L: MessageLog + ?Sized>(&self, log: &L, clock: &dyn Clock) -> Result<usize> {
        if self.config.is_noop() {
            return Ok(0);
        }
        let now = clock.now();
        let max_age = (self.config.max_age_days > 0)
            .then(|| Duration::days(self.config.max_age_days as i64));
        let per_chat_cap = self.config.max_records_per_chat;

        log.rewrite_with(&mut |records| {
            let fresh: Vec<MessageRecord> = match max_age {
                Some(age) => records.into_iter().filter(|r| now - r.ts <= age).collect(),
                None => records,
            };
            match per_chat_cap {
                Some(cap) => keep_newest_per_chat(fresh, cap),
                None => fresh,
            }
        })
    }
}

/// Keep only the newest `cap` records of every chat, preserving append order.
fn keep_newest_per_chat(records: Vec<MessageRecord>, cap: usize) -> Vec<MessageRecord> {
    let mut totals: HashMap<ChatId, usize> = HashMap::new();
    for r in &records {
        *totals.entry(r.chat_id).or_default() += 1;
    }
    let mut seen: HashMap<ChatId, usize> = HashMap::new();
    records
        .into_iter()
        .filter(|r| {
            let total = totals[&r.chat_id];
            let idx = seen.entry(r.chat_id).or_default();
            *idx += 1;
            // Skip the oldest (total - cap) of this chat.
            *idx > total.saturating_sub(cap)
        })
        .collect()
}
