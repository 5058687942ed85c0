use super::traits::ChatRegistry;
use super::write_atomic;
use crate::clock::{Clock, SystemClock};
use crate::error::{PorfiryError, Result};
use crate::types::{ChatBinding, ChatId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// On-disk shape of one binding. The chat id is the map key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredBinding {
    title: String,
    bound_at: DateTime<Utc>,
}

/// Chat registry kept in a single pretty-printed JSON object
/// (`"<chat_id>": {"title": ..., "bound_at": ...}`).
///
/// The file is re-read on every query, so edits made by hand while the bot
/// runs are picked up immediately. Writes go through a process-local mutex.
pub struct JsonChatRegistry {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl JsonChatRegistry {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            clock: Arc::new(SystemClock),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, StoredBinding>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, chats: &BTreeMap<String, StoredBinding>) -> Result<()> {
        let json = serde_json::to_string_pretty(chats)?;
        write_atomic(&self.path, json.as_bytes())?;
        Ok(())
    }
}

impl ChatRegistry for JsonChatRegistry {
    fn bind(&self, chat_id: ChatId, title: Option<&str>) -> Result<ChatBinding> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut chats = self.load()?;
        let title = match title {
            Some(t) if !t.trim().is_empty() => t.to_string(),
            _ => chat_id.to_string(),
        };
        let stored = StoredBinding {
            title,
            bound_at: self.clock.now(),
        };
        chats.insert(chat_id.to_string(), stored.clone());
        self.save(&chats)?;

        log::info!("Bound chat {} ({})", chat_id, stored.title);
        Ok(ChatBinding {
            chat_id,
            title: stored.title,
            bound_at: stored.bound_at,
        })
    }

    fn is_bound(&self, chat_id: ChatId) -> Result<bool> {
        Ok(self.load()?.contains_key(&chat_id.to_string()))
    }

    fn list_bindings(&self) -> Result<BTreeMap<ChatId, ChatBinding>> {
        let mut out = BTreeMap::new();
        for (key, stored) in self.load()? {
            let chat_id = key
                .parse::<ChatId>()
                .map_err(|_| PorfiryError::CorruptRegistry { key: key.clone() })?;
            out.insert(
                chat_id,
                ChatBinding {
                    chat_id,
                    title: stored.title,
                    bound_at: stored.bound_at,
                },
            );
        }
        Ok(out)
    }
}
