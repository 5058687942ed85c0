//! Daily per-chat summaries of the message log.

pub mod schedule;

pub use schedule::DailySchedule;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::gateway::CompletionGateway;
use crate::messenger::{Messenger, OutgoingMessage};
use crate::persona::Persona;
use crate::storage::{ChatRegistry, MessageLog};
use crate::types::{truncate_chars, AllowList, ChatId};
use chrono::Duration;
use std::sync::Arc;

/// Configuration for the digest engine
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// How far back a digest looks.
    pub window: Duration,
    /// Only the newest this-many messages of the window go into the prompt.
    pub max_messages: usize,
    /// Cap on the generated text, not counting the header.
    pub max_chars: usize,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            window: Duration::hours(24),
            max_messages: 200,
            max_chars: 3900,
        }
    }
}

/// Tally of one digest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestReport {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum ChatDigest {
    Sent,
    Skipped,
    Failed,
}

pub struct DigestEngine {
    registry: Arc<dyn ChatRegistry>,
    log: Arc<dyn MessageLog>,
    gateway: Arc<dyn CompletionGateway>,
    messenger: Arc<dyn Messenger>,
    persona: Persona,
    allow_list: AllowList,
    clock: Arc<dyn Clock>,
    config: DigestConfig,
}

impl DigestEngine {
    pub fn new(
        registry: Arc<dyn ChatRegistry>,
        log: Arc<dyn MessageLog>,
        gateway: Arc<dyn CompletionGateway>,
        messenger: Arc<dyn Messenger>,
        persona: Persona,
        allow_list: AllowList,
    ) -> Self {
        Self {
            registry,
            log,
            gateway,
            messenger,
            persona,
            allow_list,
            clock: Arc::new(SystemClock),
            config: DigestConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: DigestConfig) -> Self {
        self.config = config;
        self
    }

    /// Digest every bound, allowed chat once.
    ///
    /// Only a failure to read the registry aborts the run. Anything that goes
    /// wrong for a single chat is logged, counted in [`DigestReport::failed`]
    /// and the run moves on.
    pub async fn run_once(&self) -> Result<DigestReport> {
        let bindings = self.registry.list_bindings()?;
        let mut report = DigestReport::default();

        for (chat_id, binding) in bindings {
            if !self.allow_list.permits(chat_id) {
                log::debug!("Digest: chat {} is not on the allow-list", chat_id);
                continue;
            }
            match self.digest_chat(chat_id).await {
                ChatDigest::Sent => {
                    log::info!("Digest sent to chat {} ({})", chat_id, binding.title);
                    report.sent += 1;
                }
                ChatDigest::Skipped => report.skipped += 1,
                ChatDigest::Failed => report.failed += 1,
            }
        }

        log::info!(
            "Digest run finished: sent={} skipped={} failed={}",
            report.sent,
            report.skipped,
            report.failed
        );
        Ok(report)
    }

    async fn digest_chat(&self, chat_id: ChatId) -> ChatDigest {
        let rows = match self.recent_rows(chat_id) {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("Digest: failed to read the log for chat {}: {}", chat_id, e);
                return ChatDigest::Failed;
            }
        };
        if rows.is_empty() {
            return ChatDigest::Skipped;
        }

        let prompt = self.persona.digest_prompt(&rows);
        let (text, outcome) = match self
            .gateway
            .complete(&self.persona.system_prompt(), &prompt)
            .await
        {
            Ok(answer) => (
                format!(
                    "{}\n\n{}",
                    self.persona.digest_header(),
                    truncate_chars(&answer, self.config.max_chars)
                ),
                ChatDigest::Sent,
            ),
            Err(e) => {
                log::error!("Digest failed for chat {}: {}", chat_id, e);
                (
                    format!("Couldn't put together the review: {e}"),
                    ChatDigest::Failed,
                )
            }
        };

        if let Err(e) = self.messenger.send(OutgoingMessage::new(chat_id, text)).await {
            log::warn!("Digest: failed to deliver to chat {}: {}", chat_id, e);
            return ChatDigest::Failed;
        }
        outcome
    }

    fn recent_rows(&self, chat_id: ChatId) -> Result<Vec<crate::types::MessageRecord>> {
        let mut rows = self
            .log
            .recent_within_window(chat_id, self.config.window)?;
        if rows.len() > self.config.max_messages {
            rows.drain(..rows.len() - self.config.max_messages);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::gateway::{MockGateway, MockReply};
    use crate::messenger::RecordingMessenger;
    use crate::storage::{JsonChatRegistry, JsonlMessageLog};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    struct Fixture {
        engine: DigestEngine,
        registry: Arc<JsonChatRegistry>,
        log: Arc<JsonlMessageLog>,
        gateway: Arc<MockGateway>,
        messenger: Arc<RecordingMessenger>,
        clock: Arc<ManualClock>,
        _dir: TempDir,
    }

    fn fixture(gateway: MockGateway, allow_list: AllowList) -> Fixture {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 15, 0, 0).unwrap(),
        ));
        let registry = Arc::new(
            JsonChatRegistry::open(dir.path().join("chats.json")).with_clock(clock.clone()),
        );
        let log = Arc::new(
            JsonlMessageLog::open(dir.path().join("messages.jsonl")).with_clock(clock.clone()),
        );
        let gateway = Arc::new(gateway);
        let messenger = Arc::new(RecordingMessenger::new());
        let engine = DigestEngine::new(
            registry.clone(),
            log.clone(),
            gateway.clone(),
            messenger.clone(),
            Persona::default(),
            allow_list,
        )
        .with_clock(clock.clone());

        Fixture {
            engine,
            registry,
            log,
            gateway,
            messenger,
            clock,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_quiet_chat_is_skipped_others_still_run() {
        let f = fixture(MockGateway::answering("what a day"), AllowList::default());
        f.registry.bind(-1, Some("Quiet")).unwrap();
        f.registry.bind(-2, Some("Busy")).unwrap();
        f.log.append(-2, "Anna", "hello").unwrap();

        let report = f.engine.run_once().await.unwrap();
        assert_eq!(
            report,
            DigestReport {
                sent: 1,
                skipped: 1,
                failed: 0
            }
        );
        assert_eq!(f.gateway.call_count(), 1);
        assert!(f.messenger.sent_to(-1).is_empty());

        let sent = f.messenger.sent_to(-2);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.starts_with("🕕 Porfiry's daily review\n\n"));
        assert!(sent[0].text.ends_with("what a day"));
    }

    #[tokio::test]
    async fn test_only_last_day_is_summarised() {
        let f = fixture(MockGateway::answering("ok"), AllowList::default());
        f.registry.bind(-1, None).unwrap();
        f.log.append(-1, "Anna", "ancient history").unwrap();
        f.clock.advance(Duration::hours(25));
        f.log.append(-1, "Boris", "fresh news").unwrap();

        f.engine.run_once().await.unwrap();
        let prompt = &f.gateway.calls()[0].1;
        assert!(prompt.contains("- Boris: fresh news"));
        assert!(!prompt.contains("ancient history"));
    }

    #[tokio::test]
    async fn test_prompt_keeps_newest_messages() {
        let f = fixture(MockGateway::answering("ok"), AllowList::default());
        f.registry.bind(-1, None).unwrap();
        for i in 0..205 {
            f.log.append(-1, "Anna", &format!("msg {i};")).unwrap();
        }

        f.engine.run_once().await.unwrap();
        let prompt = &f.gateway.calls()[0].1;
        assert!(!prompt.contains("msg 4;"));
        assert!(prompt.contains("msg 5;"));
        assert!(prompt.contains("msg 204;"));
    }

    #[tokio::test]
    async fn test_failure_is_isolated_and_reported() {
        let gateway = MockGateway::scripted(
            vec![MockReply::Status(502, "bad gateway".to_string())],
            MockReply::Text("fine".to_string()),
        );
        let f = fixture(gateway, AllowList::default());
        f.registry.bind(-2, None).unwrap();
        f.registry.bind(-1, None).unwrap();
        f.log.append(-1, "Anna", "one").unwrap();
        f.log.append(-2, "Boris", "two").unwrap();

        let report = f.engine.run_once().await.unwrap();
        assert_eq!((report.sent, report.failed), (1, 1));

        // Bindings are visited in chat id order, so -2 got the scripted 502.
        let notice = &f.messenger.sent_to(-2)[0];
        assert!(notice.text.starts_with("Couldn't put together the review:"));
        assert!(notice.text.contains("502"));
        assert!(f.messenger.sent_to(-1)[0].text.ends_with("fine"));
    }

    #[tokio::test]
    async fn test_long_digest_is_capped() {
        let f = fixture(MockGateway::answering(&"x".repeat(5000)), AllowList::default());
        f.registry.bind(-1, None).unwrap();
        f.log.append(-1, "Anna", "hi").unwrap();

        f.engine.run_once().await.unwrap();
        let text = &f.messenger.sent()[0].text;
        let body = text.split_once("\n\n").unwrap().1;
        assert_eq!(body.chars().count(), 3900);
    }

    #[tokio::test]
    async fn test_allow_list_filters_chats() {
        let f = fixture(MockGateway::answering("ok"), AllowList::new([-1]));
        f.registry.bind(-1, None).unwrap();
        f.registry.bind(-2, None).unwrap();
        f.log.append(-1, "Anna", "a").unwrap();
        f.log.append(-2, "Boris", "b").unwrap();

        let report = f.engine.run_once().await.unwrap();
        assert_eq!(report.sent, 1);
        assert!(f.messenger.sent_to(-2).is_empty());
    }

    #[tokio::test]
    async fn test_empty_registry_is_a_quiet_run() {
        let f = fixture(MockGateway::answering("ok"), AllowList::default());
        let report = f.engine.run_once().await.unwrap();
        assert_eq!(report, DigestReport::default());
        assert_eq!(f.gateway.call_count(), 0);
    }
}
