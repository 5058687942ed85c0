use super::traits::MessageLog;
use super::write_atomic;
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::types::{ChatId, MessageRecord};
use chrono::Duration;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Message log stored as JSON Lines, one [`MessageRecord`] per line.
///
/// Queries scan the whole file. Lines that fail to parse are skipped with a
/// warning so one bad write cannot hide the rest of the history.
pub struct JsonlMessageLog {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl JsonlMessageLog {
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

    fn read_all(&self) -> Result<Vec<MessageRecord>> {
        Ok(self.read_lines()?.0)
    }

    /// Parsed records plus the raw text of every line that failed to parse.
    fn read_lines(&self) -> Result<(Vec<MessageRecord>, Vec<String>)> {
        if !self.path.exists() {
            return Ok((Vec::new(), Vec::new()));
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let mut records = Vec::new();
        let mut malformed = Vec::new();
        for (lineno, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<MessageRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    log::warn!(
                        "Skipping malformed line {} in {:?}: {}",
                        lineno + 1,
                        self.path,
                        e
                    );
                    malformed.push(line.to_string());
                }
            }
        }
        Ok((records, malformed))
    }
}

impl MessageLog for JsonlMessageLog {
    fn append(&self, chat_id: ChatId, user: &str, text: &str) -> Result<MessageRecord> {
        let record = MessageRecord::new(self.clock.now(), chat_id, user, text);
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        Ok(record)
    }

    fn recent_within_window(&self, chat_id: ChatId, window: Duration) -> Result<Vec<MessageRecord>> {
        let now = self.clock.now();
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.chat_id == chat_id && now - r.ts <= window)
            .collect())
    }

    fn last_n(&self, chat_id: ChatId, n: usize) -> Result<Vec<MessageRecord>> {
        let mut rows: Vec<MessageRecord> = self
            .read_all()?
            .into_iter()
            .filter(|r| r.chat_id == chat_id)
            .collect();
        let skip = rows.len().saturating_sub(n);
        Ok(rows.split_off(skip))
    }

    fn records(&self) -> Result<Vec<MessageRecord>> {
        self.read_all()
    }

    fn rewrite_with(
        &self,
        f: &mut dyn FnMut(Vec<MessageRecord>) -> Vec<MessageRecord>,
    ) -> Result<usize> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let (before, malformed) = self.read_lines()?;
        let before_len = before.len();
        let kept = f(before);
        if kept.len() == before_len {
            return Ok(0);
        }

        let mut buf = String::new();
        for record in &kept {
            buf.push_str(&serde_json::to_string(record)?);
            buf.push('\n');
        }
        // Unparseable lines are left for a human to fix, after the records.
        for line in &malformed {
            buf.push_str(line);
            buf.push('\n');
        }
        if !malformed.is_empty() {
            log::warn!(
                "Kept {} unparseable line(s) in {:?} during compaction",
                malformed.len(),
                self.path
            );
        }
        write_atomic(&self.path, buf.as_bytes())?;
        Ok(before_len.saturating_sub(kept.len()))
    }
}
