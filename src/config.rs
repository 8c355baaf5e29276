//! Watcher configuration, loaded from TOML with environment overrides.
//!
//! # Configuration file format
//!
//! chesswatch looks for `chesswatch.toml` by default (override with `--config`).
//! Every key is optional; a missing file means defaults. Environment variables
//! are applied on top of whatever the file says.
//!
//! ```toml
//! # Players to watch (env: USERNAMES, comma-separated).
//! usernames = ["hikaru", "magnuscarlsen"]
//!
//! # Seconds between presence sweeps (env: CHECK_INTERVAL, default: 60).
//! check_interval_secs = 60
//!
//! # IANA zone used when rendering last-seen times (env: TIMEZONE).
//! timezone = "Asia/Kolkata"
//!
//! # Serve `GET /` on this port for platform liveness probes (env: PORT).
//! # health_port = 10000
//!
//! [telegram]
//! bot_token = "7000000000:AA..."   # env: BOT_TOKEN
//! chat_id = 123456789              # env: CHAT_ID
//! ```

use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Zone used when `timezone` is missing or not a valid IANA name.
pub const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";

const DEFAULT_USERNAMES: &[&str] = &[
    "aaditya4chess",
    "xxhimanshu",
    "garrymarkus",
    "newboy97",
    "aiiyk",
    "yashkuma7586",
    "iva0912",
    "anshul_2004",
    "hitmeharder132",
    "kav_2004",
    "atharv741",
    "Utkarsh3604",
    "kartik689787",
    "darklyamused",
    "insaneishi",
    "priyanshu2564",
    "omenio",
    "shubhamyadav17",
    "abhinav_0810",
    "mkrock",
];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Usernames to track, in the order they are checked and reported.
    #[serde(default = "default_usernames")]
    pub usernames: Vec<String>,

    /// Seconds to sleep between presence sweeps.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// IANA time zone for rendering last-seen times.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Port for the liveness endpoint. `None` disables it.
    #[serde(default)]
    pub health_port: Option<u16>,

    #[serde(default)]
    pub telegram: TelegramConfig,
}

/// Telegram bot credentials and the chat that receives notifications.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API token from @BotFather. Empty disables all Telegram traffic.
    #[serde(default)]
    pub bot_token: String,

    /// Chat that receives notifications. Also the only chat allowed to send
    /// commands when set.
    #[serde(default)]
    pub chat_id: Option<i64>,
}

fn default_usernames() -> Vec<String> {
    DEFAULT_USERNAMES.iter().map(|s| s.to_string()).collect()
}

fn default_check_interval() -> u64 {
    60
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.into()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            usernames: default_usernames(),
            check_interval_secs: default_check_interval(),
            timezone: default_timezone(),
            health_port: None,
            telegram: TelegramConfig::default(),
        }
    }
}

impl WatchConfig {
    /// Load config from `path` (defaults if it does not exist), then apply
    /// process environment overrides.
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                color_eyre::eyre::eyre!("failed to read {}: {e}", path.display())
            })?;
            let config: WatchConfig = toml::from_str(&content)
                .map_err(|e| color_eyre::eyre::eyre!("failed to parse {}: {e}", path.display()))?;
            info!("loaded config from {}", path.display());
            config
        } else {
            info!("config file {} not found, using defaults", path.display());
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.normalize();
        config.validate();
        Ok(config)
    }

    /// Override fields from environment-style lookups.
    ///
    /// Values that fail to parse are logged and ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).map(|v| v.trim().to_string());

        if let Some(token) = lookup("BOT_TOKEN")
            && !token.is_empty()
        {
            self.telegram.bot_token = token;
        }

        if let Some(chat) = lookup("CHAT_ID")
            && !chat.is_empty()
        {
            match chat.parse::<i64>() {
                Ok(id) => self.telegram.chat_id = Some(id),
                Err(_) => warn!("CHAT_ID {chat:?} is not a numeric chat id, ignoring"),
            }
        }

        if let Some(list) = lookup("USERNAMES")
            && !list.is_empty()
        {
            self.usernames = list.split(',').map(str::to_string).collect();
        }

        if let Some(interval) = lookup("CHECK_INTERVAL")
            && !interval.is_empty()
        {
            match interval.parse::<u64>() {
                Ok(secs) => self.check_interval_secs = secs,
                Err(_) => warn!("CHECK_INTERVAL {interval:?} is not a number of seconds, ignoring"),
            }
        }

        if let Some(tz) = lookup("TIMEZONE")
            && !tz.is_empty()
        {
            self.timezone = tz;
        }

        if let Some(port) = lookup("PORT")
            && !port.is_empty()
        {
            match port.parse::<u16>() {
                Ok(port) => self.health_port = Some(port),
                Err(_) => warn!("PORT {port:?} is not a valid port, ignoring"),
            }
        }
    }

    /// Trim usernames, drop blanks and repeated names (first occurrence wins).
    pub fn normalize(&mut self) {
        let mut seen = std::collections::HashSet::new();
        let mut usernames = Vec::with_capacity(self.usernames.len());
        for name in &self.usernames {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            if !seen.insert(name.to_lowercase()) {
                warn!("username {name} listed more than once, tracking it once");
                continue;
            }
            usernames.push(name.to_string());
        }
        self.usernames = usernames;
    }

    /// Log configuration problems. Never fails: the watcher runs degraded.
    fn validate(&self) {
        if self.telegram.bot_token.is_empty() || self.telegram.chat_id.is_none() {
            warn!("BOT_TOKEN/CHAT_ID not set, Telegram messages will not be sent");
        }
        if self.usernames.is_empty() {
            warn!("no usernames configured, nothing to watch");
        }
        if self.check_interval_secs == 0 {
            warn!("check_interval_secs is 0, presence will be polled back to back");
        }
        if self.timezone.parse::<Tz>().is_err() {
            warn!(
                "unknown timezone {:?}, falling back to {DEFAULT_TIMEZONE}",
                self.timezone
            );
        }
    }

    /// The configured zone, or [`DEFAULT_TIMEZONE`] when it does not parse.
    pub fn resolved_timezone(&self) -> Tz {
        self.timezone
            .parse::<Tz>()
            .unwrap_or(chrono_tz::Asia::Kolkata)
    }
}
