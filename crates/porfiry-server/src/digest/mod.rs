use chrono::Utc;
use porfiry_core::{DailySchedule, DigestEngine};
use std::sync::Arc;
use tracing::{error, info};

/// Background task: runs the digest once a day on the configured schedule.
pub struct DigestScheduler {
    engine: Arc<DigestEngine>,
    schedule: DailySchedule,
}

impl DigestScheduler {
    pub fn new(engine: Arc<DigestEngine>, schedule: DailySchedule) -> Self {
        Self { engine, schedule }
    }

    /// Run the scheduling loop. Call via `tokio::spawn`.
    pub async fn run(self) {
        info!(
            "DigestScheduler started: daily at {:02}:{:02} {}",
            self.schedule.hour(),
            self.schedule.minute(),
            self.schedule.timezone()
        );

        let mut cursor = Utc::now();
        loop {
            let next = self.schedule.next_after(cursor);
            info!("Next digest at {}", next.with_timezone(&self.schedule.timezone()));

            let wait = (next - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            match self.engine.run_once().await {
                Ok(report) => info!(
                    "Digest done: sent={} skipped={} failed={}",
                    report.sent, report.skipped, report.failed
                ),
                Err(e) => error!("Digest run failed: {}", e),
            }

            // Never fire the same slot twice, and skip slots missed while
            // the process was suspended.
            cursor = next.max(Utc::now());
        }
    }
}
