//! Configuration loader for YAML files and environment overrides
//!
//! Settings come from three layers, later ones winning:
//! 1. Built-in defaults
//! 2. Optional YAML file (`config.yaml`)
//! 3. Environment variables (`BOT_TOKEN`, `CHANNEL_ID`, `TIMER_MINUTES`, ...)

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::AppError;

use super::constants::DEFAULT_INTERVAL_MINUTES;
use super::types::BotSettings;

/// Load settings from an optional YAML file, then apply environment overrides
///
/// A missing file is not an error: every field has a default, and the
/// credentials are normally supplied through the environment.
///
/// # Returns
/// * `Ok(BotSettings)` - Loaded and validated settings
/// * `Err(AppError)` - Parse error or validation failure
///
/// # Example
/// ```ignore
/// use std::path::Path;
/// use market_notifier::config::load_settings;
///
/// let settings = load_settings(Path::new("config.yaml"))?;
/// ```
pub fn load_settings(path: &Path) -> Result<BotSettings, AppError> {
    let mut settings = if path.exists() {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).map_err(|e| {
            AppError::Config(format!("YAML parse error in '{}': {}", path.display(), e))
        })?
    } else {
        BotSettings::default()
    };

    apply_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.validate()?;

    Ok(settings)
}

/// Load settings from a YAML string without consulting the environment
/// (useful for testing)
pub fn load_settings_from_str(yaml_content: &str) -> Result<BotSettings, AppError> {
    let settings: BotSettings = if yaml_content.trim().is_empty() {
        BotSettings::default()
    } else {
        serde_yaml::from_str(yaml_content)
            .map_err(|e| AppError::Config(format!("YAML parse error: {}", e)))?
    };

    settings.validate()?;

    Ok(settings)
}

/// Apply overrides from a key lookup (normally the process environment)
pub fn apply_overrides<F>(settings: &mut BotSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup("BOT_TOKEN") {
        settings.bot_token = token;
    }
    if let Some(channel) = lookup("CHANNEL_ID") {
        settings.channel_id = channel;
    }
    if let Some(raw) = lookup("TIMER_MINUTES") {
        settings.interval_minutes = match raw.trim().parse::<u64>() {
            Ok(minutes) if minutes > 0 => minutes,
            _ => {
                warn!(
                    value = %raw,
                    default = DEFAULT_INTERVAL_MINUTES,
                    "Invalid TIMER_MINUTES, using default"
                );
                DEFAULT_INTERVAL_MINUTES
            }
        };
    }
    if let Some(path) = lookup("STATE_FILE") {
        settings.state_file = PathBuf::from(path);
    }
    if let Some(tz) = lookup("TIMEZONE") {
        settings.timezone = tz;
    }
    if let Some(base) = lookup("TELEGRAM_API_BASE") {
        settings.telegram_api_base = base;
    }
    if let Some(base) = lookup("PRICE_API_BASE") {
        settings.price_api_base = base;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID_CONFIG_YAML: &str = r#"
bot_token: "123456:ABCDEF"
channel_id: "@commodities"
interval_minutes: 5
state_file: data/markets.json
timezone: Europe/London
"#;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_settings_from_str_valid() {
        let settings = load_settings_from_str(VALID_CONFIG_YAML).unwrap();
        assert_eq!(settings.channel_id, "@commodities");
        assert_eq!(settings.interval_minutes, 5);
        assert_eq!(settings.state_file, PathBuf::from("data/markets.json"));
        assert_eq!(settings.timezone, "Europe/London");
    }

    #[test]
    fn test_load_settings_from_str_invalid_yaml() {
        let result = load_settings_from_str("invalid: yaml: content: [");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("YAML parse error"));
    }

    #[test]
    fn test_load_settings_from_str_missing_credentials() {
        let result = load_settings_from_str("interval_minutes: 2");
        assert!(result.unwrap_err().to_string().contains("BOT_TOKEN"));
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut settings = load_settings_from_str(VALID_CONFIG_YAML).unwrap();
        apply_overrides(
            &mut settings,
            lookup_from(&[("CHANNEL_ID", "-100200300"), ("TIMER_MINUTES", "7")]),
        );
        assert_eq!(settings.channel_id, "-100200300");
        assert_eq!(settings.interval_minutes, 7);
        assert_eq!(settings.bot_token, "123456:ABCDEF");
    }

    #[test]
    fn test_invalid_timer_override_uses_default() {
        let mut settings = load_settings_from_str(VALID_CONFIG_YAML).unwrap();
        apply_overrides(&mut settings, lookup_from(&[("TIMER_MINUTES", "soon")]));
        assert_eq!(settings.interval_minutes, DEFAULT_INTERVAL_MINUTES);

        apply_overrides(&mut settings, lookup_from(&[("TIMER_MINUTES", "0")]));
        assert_eq!(settings.interval_minutes, DEFAULT_INTERVAL_MINUTES);

        apply_overrides(&mut settings, lookup_from(&[("TIMER_MINUTES", "-4")]));
        assert_eq!(settings.interval_minutes, DEFAULT_INTERVAL_MINUTES);
    }

    #[test]
    #[serial(env)]
    fn test_load_settings_missing_file_uses_env() {
        std::env::set_var("BOT_TOKEN", "999:XYZ");
        std::env::set_var("CHANNEL_ID", "@env_channel");
        std::env::remove_var("TIMER_MINUTES");

        let settings = load_settings(Path::new("/nonexistent/path/config.yaml")).unwrap();
        assert_eq!(settings.bot_token, "999:XYZ");
        assert_eq!(settings.channel_id, "@env_channel");
        assert_eq!(settings.interval_minutes, DEFAULT_INTERVAL_MINUTES);

        std::env::remove_var("BOT_TOKEN");
        std::env::remove_var("CHANNEL_ID");
    }

    #[test]
    #[serial(env)]
    fn test_load_settings_from_file_invalid_yaml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"invalid: [yaml: content").unwrap();
        temp_file.flush().unwrap();

        let result = load_settings(temp_file.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("YAML parse error"));
    }

    #[test]
    #[serial(env)]
    fn test_load_settings_from_file_valid() {
        for key in ["BOT_TOKEN", "CHANNEL_ID", "TIMER_MINUTES", "STATE_FILE", "TIMEZONE"] {
            std::env::remove_var(key);
        }

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(VALID_CONFIG_YAML.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let settings = load_settings(temp_file.path()).unwrap();
        assert_eq!(settings.channel_id, "@commodities");
        assert_eq!(settings.interval_minutes, 5);
    }
}
