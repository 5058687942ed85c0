use super::TelegramClient;
use porfiry_core::{ChatId, DispatchOutcome, Dispatcher};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Pause after a failed `getUpdates` before trying again.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Long-polling loop feeding updates to the dispatcher.
pub struct Poller {
    client: Arc<TelegramClient>,
    dispatcher: Arc<Dispatcher>,
    timeout: Duration,
}

impl Poller {
    pub fn new(client: Arc<TelegramClient>, dispatcher: Arc<Dispatcher>, timeout: Duration) -> Self {
        Self {
            client,
            dispatcher,
            timeout,
        }
    }

    /// Poll forever. Call via `tokio::spawn`.
    ///
    /// Updates of one chat are handled in arrival order; a slow completion in
    /// one chat does not hold up the others.
    pub async fn run(self) {
        info!("Polling Telegram (timeout {}s)", self.timeout.as_secs());
        let mut offset: Option<i64> = None;
        let mut queue = ChatQueue::default();

        loop {
            let updates = match self.client.get_updates(offset, self.timeout).await {
                Ok(updates) => updates,
                Err(e) => {
                    warn!("getUpdates failed, retrying: {}", e);
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };

            for raw in updates {
                offset = Some(offset.map_or(raw.update_id + 1, |o| o.max(raw.update_id + 1)));

                let Some(event) = raw.parsed.as_ref().and_then(|u| u.to_event()) else {
                    debug!("Update {} carries nothing to handle", raw.update_id);
                    continue;
                };

                let dispatcher = self.dispatcher.clone();
                let update_id = raw.update_id;
                queue.submit(event.chat_id(), async move {
                    match dispatcher.dispatch(event).await {
                        Ok(DispatchOutcome::Ignored) => {}
                        Ok(outcome) => debug!("Update {}: {:?}", update_id, outcome),
                        Err(e) => error!("Failed to handle update {}: {}", update_id, e),
                    }
                });
            }
            debug!("{} chat(s) busy", queue.busy_chats());
        }
    }
}

/// Per-chat task chains: work for one chat runs one piece at a time, in
/// submission order. Work for different chats, or without a chat, runs
/// concurrently.
#[derive(Default)]
pub struct ChatQueue {
    tails: HashMap<ChatId, JoinHandle<()>>,
}

impl ChatQueue {
    pub fn submit<F>(&mut self, chat_id: Option<ChatId>, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tails.retain(|_, tail| !tail.is_finished());

        let Some(chat_id) = chat_id else {
            tokio::spawn(work);
            return;
        };
        let previous = self.tails.remove(&chat_id);
        let tail = tokio::spawn(async move {
            if let Some(previous) = previous {
                // A panicked predecessor must not stall the chat.
                if let Err(e) = previous.await {
                    warn!("Previous update task for chat {} failed: {}", chat_id, e);
                }
            }
            work.await;
        });
        self.tails.insert(chat_id, tail);
    }

    /// Chats with work still queued or running.
    pub fn busy_chats(&self) -> usize {
        self.tails.values().filter(|tail| !tail.is_finished()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    async fn drain(queue: &mut ChatQueue) {
        for (_, tail) in queue.tails.drain() {
            tail.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_same_chat_runs_in_arrival_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut queue = ChatQueue::default();

        // The first update is the slowest; it must still land first.
        for (i, delay_ms) in [(0, 50u64), (1, 0), (2, 10)] {
            let order = order.clone();
            queue.submit(Some(-1), async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                order.lock().unwrap().push(i);
            });
        }
        drain(&mut queue).await;

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_different_chats_do_not_wait_for_each_other() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mut queue = ChatQueue::default();

        // Chat -1 blocks until chat -2 has run.
        queue.submit(Some(-1), async move {
            rx.await.unwrap();
        });
        queue.submit(Some(-2), async move {
            tx.send(()).unwrap();
        });
        assert!(queue.busy_chats() >= 1);

        tokio::time::timeout(Duration::from_secs(5), drain(&mut queue))
            .await
            .expect("chats should run concurrently");
    }

    #[tokio::test]
    async fn test_failed_task_does_not_block_its_chat() {
        let done = Arc::new(Mutex::new(false));
        let mut queue = ChatQueue::default();

        queue.submit(Some(-1), async { panic!("handler blew up") });
        let flag = done.clone();
        queue.submit(Some(-1), async move {
            *flag.lock().unwrap() = true;
        });
        drain(&mut queue).await;

        assert!(*done.lock().unwrap());
    }
}
