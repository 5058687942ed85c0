use anyhow::{anyhow, Context};
use chrono_tz::Tz;
use clap::Parser;
use porfiry_core::{AllowList, DailySchedule, GatewayConfig, HumorMode, RetentionConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_TIMEZONE: &str = "Europe/Moscow";

/// Command line and environment. Every setting is optional here so that
/// values from the config file can fill the gaps.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "porfiry")]
#[command(about = "Telegram group-chat comedian with a daily digest")]
pub struct Cli {
    /// Optional TOML config file
    #[arg(long, env = "PORFIRY_CONFIG", default_value = "porfiry.toml")]
    pub config: PathBuf,

    /// Telegram bot token
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    /// CometAPI token
    #[arg(long, env = "COMET_API_TOKEN", hide_env_values = true)]
    pub comet_api_token: Option<String>,

    /// CometAPI base URL
    #[arg(long, env = "COMET_BASE_URL")]
    pub comet_base_url: Option<String>,

    /// Completion model
    #[arg(long, env = "COMET_MODEL")]
    pub comet_model: Option<String>,

    /// IANA timezone of the digest schedule
    #[arg(long = "timezone", env = "TZ")]
    pub timezone: Option<String>,

    /// Comma-separated chat ids the bot may serve (empty = all)
    #[arg(long, env = "ALLOWED_CHAT_IDS")]
    pub allowed_chat_ids: Option<String>,

    /// Minimum seconds between triggered replies per chat
    #[arg(long, env = "BOT_COOLDOWN_SECONDS")]
    pub cooldown_seconds: Option<u64>,

    /// soft, hard or insane
    #[arg(long, env = "HUMOR_MODE")]
    pub humor_mode: Option<String>,

    /// Digest hour (0-23)
    #[arg(long, env = "DIGEST_HOUR")]
    pub digest_hour: Option<u32>,

    /// Digest minute (0-59)
    #[arg(long, env = "DIGEST_MINUTE")]
    pub digest_minute: Option<u32>,

    /// Data directory for chats.json and messages.jsonl
    #[arg(long, env = "PORFIRY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Long-poll timeout for getUpdates, in seconds
    #[arg(long, env = "POLL_TIMEOUT_SECONDS")]
    pub poll_timeout: Option<u64>,

    /// Drop logged messages older than this many days (0 = keep)
    #[arg(long, env = "RETENTION_DAYS")]
    pub retention_days: Option<u64>,

    /// Keep at most this many logged messages per chat
    #[arg(long, env = "RETENTION_MAX_RECORDS")]
    pub retention_max_records: Option<usize>,
}

// ── Config file ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub telegram: TelegramSection,
    pub comet: CometSection,
    pub bot: BotSection,
    pub digest: DigestSection,
    pub retention: RetentionSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    pub bot_token: Option<String>,
    pub poll_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CometSection {
    pub api_token: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BotSection {
    pub timezone: Option<String>,
    pub allowed_chat_ids: Option<Vec<i64>>,
    pub cooldown_seconds: Option<u64>,
    pub humor_mode: Option<String>,
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DigestSection {
    pub hour: Option<u32>,
    pub minute: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RetentionSection {
    pub max_age_days: Option<u64>,
    pub max_records_per_chat: Option<usize>,
}

impl FileConfig {
    /// Read `path`. A missing file is an empty config.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let parsed = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        info!("Loaded config file {:?}", path);
        Ok(parsed)
    }
}

// ── Resolved settings ────────────────────────────────────────────────────────

/// Everything the server needs, validated. Not `Debug`: it carries tokens.
#[derive(Clone)]
#[cfg_attr(test, derive(Debug))]
pub struct Settings {
    pub bot_token: String,
    pub comet: GatewayConfig,
    pub allow_list: AllowList,
    pub cooldown_secs: u64,
    pub humor: HumorMode,
    pub schedule: DailySchedule,
    pub data_dir: PathBuf,
    pub poll_timeout_secs: u64,
    pub retention: RetentionConfig,
}

impl Settings {
    /// Load the config file named by `cli` and merge it under the flags.
    pub fn resolve(cli: Cli) -> anyhow::Result<Self> {
        let file = FileConfig::load(&cli.config)?;
        Self::merge(cli, file)
    }

    /// Flags and environment win over the file; the file wins over defaults.
    pub fn merge(cli: Cli, file: FileConfig) -> anyhow::Result<Self> {
        let bot_token = non_empty(cli.bot_token.or(file.telegram.bot_token));
        let api_token = non_empty(cli.comet_api_token.or(file.comet.api_token));
        let (bot_token, api_token) = match (bot_token, api_token) {
            (Some(bot), Some(api)) => (bot, api),
            _ => return Err(anyhow!("Set BOT_TOKEN and COMET_API_TOKEN")),
        };

        let mut comet = GatewayConfig::new(api_token);
        if let Some(model) = cli.comet_model.or(file.comet.model) {
            comet = comet.with_model(model);
        }
        if let Some(base_url) = cli.comet_base_url.or(file.comet.base_url) {
            comet = comet.with_base_url(base_url);
        }

        let tz_name = cli
            .timezone
            .or(file.bot.timezone)
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let tz: Tz = tz_name
            .parse()
            .map_err(|_| anyhow!("Unknown timezone {:?}", tz_name))?;

        let allow_list = match (cli.allowed_chat_ids, file.bot.allowed_chat_ids) {
            (Some(raw), _) => AllowList::parse(&raw)?,
            (None, Some(ids)) => AllowList::new(ids),
            (None, None) => AllowList::default(),
        };

        let humor = match cli.humor_mode.or(file.bot.humor_mode) {
            Some(raw) => raw.parse::<HumorMode>().unwrap_or_else(|e| {
                warn!("{}; falling back to {}", e, HumorMode::default());
                HumorMode::default()
            }),
            None => HumorMode::default(),
        };

        let schedule = DailySchedule::new(
            cli.digest_hour.or(file.digest.hour).unwrap_or(18),
            cli.digest_minute.or(file.digest.minute).unwrap_or(0),
            tz,
        )?;

        let defaults = RetentionConfig::default();
        let retention = RetentionConfig {
            max_age_days: cli
                .retention_days
                .or(file.retention.max_age_days)
                .unwrap_or(defaults.max_age_days),
            max_records_per_chat: cli
                .retention_max_records
                .or(file.retention.max_records_per_chat),
        };

        Ok(Self {
            bot_token,
            comet,
            allow_list,
            cooldown_secs: cli
                .cooldown_seconds
                .or(file.bot.cooldown_seconds)
                .unwrap_or(20),
            humor,
            schedule,
            data_dir: cli
                .data_dir
                .or(file.bot.data_dir)
                .unwrap_or_else(|| PathBuf::from("./data")),
            poll_timeout_secs: cli
                .poll_timeout
                .or(file.telegram.poll_timeout_secs)
                .unwrap_or(30),
            retention,
        })
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join("chats.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("messages.jsonl")
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)?;
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
