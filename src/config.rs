// src/config.rs
use std::path::PathBuf;

use thiserror::Error;

const ENV_BOT_TOKEN: &str = "BOT_TOKEN";
const ENV_CHANNEL_ID: &str = "CHANNEL_ID";
const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL_SECS";
const ENV_SEEN_RETENTION: &str = "SEEN_RETENTION_SECS";
const ENV_MAX_ATTEMPTS: &str = "MAX_PUBLISH_ATTEMPTS";
const ENV_STATE_PATH: &str = "SEEN_STATE_PATH";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 120;
const DEFAULT_SEEN_RETENTION_SECS: u64 = 24 * 3600;
const DEFAULT_MAX_PUBLISH_ATTEMPTS: u32 = 5;
const DEFAULT_STATE_PATH: &str = "state/seen_items.json";

/// Startup configuration errors. These are the only fatal errors in the
/// system; everything after startup is logged and retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("environment variable {var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub channel_id: String,
    pub poll_interval_secs: u64,
    pub seen_retention_secs: u64,
    pub max_publish_attempts: u32,
    /// Snapshot path for the seen-item store; `None` disables persistence
    /// (at-least-once across restarts becomes "duplicates likely").
    pub state_path: Option<PathBuf>,
}

impl BotConfig {
    /// Read configuration from the environment. Call `dotenvy::dotenv()`
    /// first if a `.env` file should be honored.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = require(ENV_BOT_TOKEN)?;
        let channel_id = normalize_channel_id(&require(ENV_CHANNEL_ID)?);

        Ok(Self {
            bot_token,
            channel_id,
            poll_interval_secs: parsed(ENV_POLL_INTERVAL, DEFAULT_POLL_INTERVAL_SECS)?,
            seen_retention_secs: parsed(ENV_SEEN_RETENTION, DEFAULT_SEEN_RETENTION_SECS)?,
            max_publish_attempts: parsed(ENV_MAX_ATTEMPTS, DEFAULT_MAX_PUBLISH_ATTEMPTS)?,
            state_path: state_path_from_env(),
        })
    }
}

fn require(var: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Missing(var)),
    }
}

fn parsed<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            value: raw.clone(),
        }),
        Err(_) => Ok(default),
    }
}

/// Public channel names must carry a leading `@` for the Bot API; numeric
/// chat ids (including `-100…` supergroup ids) pass through untouched.
fn normalize_channel_id(raw: &str) -> String {
    if raw.starts_with('@') || raw.parse::<i64>().is_ok() {
        raw.to_string()
    } else {
        format!("@{raw}")
    }
}

fn state_path_from_env() -> Option<PathBuf> {
    match std::env::var(ENV_STATE_PATH) {
        Ok(p) if p.trim().is_empty() => None,
        Ok(p) => Some(PathBuf::from(p)),
        Err(_) => Some(PathBuf::from(DEFAULT_STATE_PATH)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names_get_at_prefix() {
        assert_eq!(normalize_channel_id("mychannel"), "@mychannel");
        assert_eq!(normalize_channel_id("@already"), "@already");
    }

    #[test]
    fn numeric_chat_ids_pass_through() {
        assert_eq!(normalize_channel_id("-1001234567890"), "-1001234567890");
        assert_eq!(normalize_channel_id("42"), "42");
    }
}
