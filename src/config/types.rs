//! Configuration types for bot settings
//!
//! `BotSettings` is loaded once at startup from an optional YAML file and
//! environment overrides. Runtime-mutable values (the rotation interval,
//! the market registry) live in `core`, not here.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::constants::{
    DEFAULT_INTERVAL_MINUTES, DEFAULT_PRICE_API_BASE, DEFAULT_STATE_FILE,
    DEFAULT_TELEGRAM_API_BASE, DEFAULT_TIMEZONE,
};
use crate::error::AppError;

fn default_interval_minutes() -> u64 {
    DEFAULT_INTERVAL_MINUTES
}

fn default_state_file() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_FILE)
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_telegram_api_base() -> String {
    DEFAULT_TELEGRAM_API_BASE.to_string()
}

fn default_price_api_base() -> String {
    DEFAULT_PRICE_API_BASE.to_string()
}

/// Root bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Telegram bot credential (usually provided via `BOT_TOKEN`)
    #[serde(default)]
    pub bot_token: String,
    /// Destination channel for rotation notifications (`CHANNEL_ID`)
    #[serde(default)]
    pub channel_id: String,
    /// Default spacing between single-market sends, in minutes
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    /// JSON file holding the persisted market registry
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    /// IANA timezone for notification timestamps (e.g., "Asia/Shanghai")
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_telegram_api_base")]
    pub telegram_api_base: String,
    #[serde(default = "default_price_api_base")]
    pub price_api_base: String,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            channel_id: String::new(),
            interval_minutes: default_interval_minutes(),
            state_file: default_state_file(),
            timezone: default_timezone(),
            telegram_api_base: default_telegram_api_base(),
            price_api_base: default_price_api_base(),
        }
    }
}

impl BotSettings {
    /// Validate configuration rules
    pub fn validate(&self) -> Result<(), AppError> {
        // Rule: credentials must be present
        if self.bot_token.trim().is_empty() {
            return Err(AppError::Config(
                "BOT_TOKEN must be set (config file or environment)".to_string(),
            ));
        }

        if self.channel_id.trim().is_empty() {
            return Err(AppError::Config(
                "CHANNEL_ID must be set (config file or environment)".to_string(),
            ));
        }

        // Rule: timezone must be a known IANA name
        self.tz()?;

        Ok(())
    }

    /// Parsed notification timezone
    pub fn tz(&self) -> Result<Tz, AppError> {
        Tz::from_str(&self.timezone).map_err(|_| {
            AppError::Config(format!(
                "Invalid timezone: {} (expected IANA tz like Asia/Shanghai)",
                self.timezone
            ))
        })
    }

    /// Default rotation interval; a zero value falls back to the built-in default
    pub fn interval(&self) -> Duration {
        let minutes = if self.interval_minutes == 0 {
            DEFAULT_INTERVAL_MINUTES
        } else {
            self.interval_minutes
        };
        Duration::from_secs(minutes * 60)
    }
}
