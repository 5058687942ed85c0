use crate::clock::Clock;
use crate::types::ChatId;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    /// The caller owns this window; the trigger time has been recorded.
    Proceed,
    /// Too soon. Always at least one second.
    Wait { remaining_secs: u64 },
}

/// Per-chat "last triggered reply" bookkeeping.
///
/// Check and update happen under one lock acquisition, so of two concurrent
/// triggers for the same chat exactly one gets [`CooldownDecision::Proceed`].
/// Nothing here is persisted.
pub struct CooldownTracker {
    window: Duration,
    clock: Arc<dyn Clock>,
    last: Mutex<HashMap<ChatId, DateTime<Utc>>>,
}

impl CooldownTracker {
    pub fn new(window_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            window: Duration::seconds(window_secs as i64),
            clock,
            last: Mutex::new(HashMap::new()),
        }
    }

    pub fn try_acquire(&self, chat_id: ChatId) -> CooldownDecision {
        let now = self.clock.now();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(prev) = last.get(&chat_id) {
            let elapsed = now - *prev;
            if elapsed < self.window {
                let remaining = (self.window - elapsed).min(self.window);
                let millis = remaining.num_milliseconds().max(0) as u64;
                return CooldownDecision::Wait {
                    remaining_secs: millis.div_ceil(1000).max(1),
                };
            }
        }

        last.insert(chat_id, now);
        CooldownDecision::Proceed
    }

    pub fn last_trigger(&self, chat_id: ChatId) -> Option<DateTime<Utc>> {
        self.last
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&chat_id)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn make_tracker(window: u64) -> (CooldownTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ));
        (CooldownTracker::new(window, clock.clone()), clock)
    }

    #[test]
    fn test_first_trigger_proceeds() {
        let (tracker, clock) = make_tracker(20);
        assert_eq!(tracker.try_acquire(-1), CooldownDecision::Proceed);
        assert_eq!(tracker.last_trigger(-1), Some(clock.now()));
    }

    #[test]
    fn test_second_trigger_waits_with_rounded_up_seconds() {
        let (tracker, clock) = make_tracker(20);
        tracker.try_acquire(-1);
        clock.advance(Duration::milliseconds(19_500));

        assert_eq!(
            tracker.try_acquire(-1),
            CooldownDecision::Wait { remaining_secs: 1 }
        );
    }

    #[test]
    fn test_waiting_does_not_extend_window() {
        let (tracker, clock) = make_tracker(20);
        tracker.try_acquire(-1);
        clock.advance(Duration::seconds(5));
        assert_eq!(
            tracker.try_acquire(-1),
            CooldownDecision::Wait { remaining_secs: 15 }
        );
        clock.advance(Duration::seconds(15));
        assert_eq!(tracker.try_acquire(-1), CooldownDecision::Proceed);
    }

    #[test]
    fn test_chats_are_independent() {
        let (tracker, _clock) = make_tracker(20);
        assert_eq!(tracker.try_acquire(-1), CooldownDecision::Proceed);
        assert_eq!(tracker.try_acquire(-2), CooldownDecision::Proceed);
    }

    #[test]
    fn test_zero_window_never_blocks() {
        let (tracker, _clock) = make_tracker(0);
        assert_eq!(tracker.try_acquire(-1), CooldownDecision::Proceed);
        assert_eq!(tracker.try_acquire(-1), CooldownDecision::Proceed);
    }

    #[test]
    fn test_concurrent_triggers_admit_exactly_one() {
        let (tracker, _clock) = make_tracker(60);
        let tracker = Arc::new(tracker);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let t = tracker.clone();
                std::thread::spawn(move || t.try_acquire(-1))
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|d| *d == CooldownDecision::Proceed)
            .count();
        assert_eq!(admitted, 1);
    }
}
