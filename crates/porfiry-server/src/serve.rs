use crate::config::Settings;
use crate::digest::DigestScheduler;
use crate::telegram::{Poller, TelegramClient};
use porfiry_core::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How often the message log is compacted.
const RETENTION_INTERVAL: Duration = Duration::from_secs(3600);

pub async fn run(settings: Settings) -> anyhow::Result<()> {
    info!("Starting Porfiry v{}", env!("CARGO_PKG_VERSION"));
    info!("Data: {:?}", settings.data_dir);
    info!("Humor mode: {}", settings.humor);
    if settings.allow_list.is_empty() {
        warn!("No allow-list configured, every chat may bind the bot");
    } else {
        info!("Allow-list: {} chat(s)", settings.allow_list.len());
    }

    let registry = Arc::new(JsonChatRegistry::open(settings.registry_path()));
    let log = Arc::new(JsonlMessageLog::open(settings.log_path()));
    let bound = registry.list_bindings()?;
    info!("Registry loaded: {} bound chat(s)", bound.len());

    let gateway = Arc::new(CometClient::new(settings.comet.clone())?);
    info!("Completion gateway: {} ({})", settings.comet.base_url, gateway.model());

    let telegram = Arc::new(TelegramClient::new(&settings.bot_token)?);
    let me = telegram.get_me().await?;
    info!(
        "Logged in as @{} (id {})",
        me.username.as_deref().unwrap_or("?"),
        me.id
    );

    let persona = Persona::new(settings.humor);
    let dispatcher = Arc::new(Dispatcher::new(
        registry.clone(),
        log.clone(),
        gateway.clone(),
        telegram.clone(),
        persona.clone(),
        DispatcherConfig::new(BotIdentity {
            user_id: me.id,
            username: me.username.clone(),
        })
        .with_allow_list(settings.allow_list.clone())
        .with_cooldown_secs(settings.cooldown_secs),
    ));
    info!("Dispatcher ready (cooldown {}s)", settings.cooldown_secs);

    let digest_engine = Arc::new(DigestEngine::new(
        registry.clone(),
        log.clone(),
        gateway.clone(),
        telegram.clone(),
        persona,
        settings.allow_list.clone(),
    ));

    let poller_task = {
        let poller = Poller::new(telegram.clone(), dispatcher, settings.poll_timeout());
        tokio::spawn(poller.run())
    };

    let digest_task = {
        let scheduler = DigestScheduler::new(digest_engine, settings.schedule);
        tokio::spawn(scheduler.run())
    };

    let retention_task = if settings.retention.is_noop() {
        info!("Retention disabled");
        None
    } else {
        let engine = RetentionEngine::new(settings.retention.clone());
        let log = log.clone();
        Some(tokio::spawn(async move {
            loop {
                match engine.compact(log.as_ref(), &SystemClock) {
                    Ok(0) => {}
                    Ok(n) => info!("Retention: dropped {} logged messages", n),
                    Err(e) => error!("Retention compaction failed: {}", e),
                }
                tokio::time::sleep(RETENTION_INTERVAL).await;
            }
        }))
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, terminating...");

    poller_task.abort();
    digest_task.abort();
    if let Some(task) = retention_task {
        task.abort();
    }

    Ok(())
}
