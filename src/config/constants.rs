//! Application-wide constants and configuration defaults
//!
//! This module centralizes all hardcoded values to make them configurable
//! and maintainable. Values can be overridden via environment variables.

use std::time::Duration;

/// Rotation interval used when neither the config file nor `TIMER_MINUTES`
/// provide a valid positive value
pub const DEFAULT_INTERVAL_MINUTES: u64 = 3;

/// Persisted registry location relative to the working directory
pub const DEFAULT_STATE_FILE: &str = "markets.json";

/// Timezone used to render notification timestamps
pub const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";

/// Telegram Bot API endpoint
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Yahoo Finance query endpoint
pub const DEFAULT_PRICE_API_BASE: &str = "https://query1.finance.yahoo.com";

// =============================================================================
// Price Source
// =============================================================================

/// Upper bound for a single price fetch (default: 15 seconds)
///
/// Environment variable: `FETCH_TIMEOUT_SECS`
pub fn fetch_timeout() -> Duration {
    let secs = std::env::var("FETCH_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(15);
    Duration::from_secs(secs)
}

/// Deadline for any single HTTP request to the price or chat API
/// (default: 10 seconds). Long polls set their own, longer deadline.
///
/// Environment variable: `HTTP_TIMEOUT_SECS`
pub fn http_timeout() -> Duration {
    let secs = std::env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|s: &u64| *s > 0)
        .unwrap_or(10);
    Duration::from_secs(secs)
}

// =============================================================================
// Command Feed
// =============================================================================

/// Pending command capacity before `submit` waits (default: 100)
///
/// Environment variable: `COMMAND_QUEUE_CAPACITY`
pub fn command_queue_capacity() -> usize {
    std::env::var("COMMAND_QUEUE_CAPACITY")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|c: &usize| *c > 0)
        .unwrap_or(100)
}

/// Long-poll timeout for the inbound command feed (default: 30 seconds)
///
/// Environment variable: `FEED_POLL_TIMEOUT_SECS`
pub fn feed_poll_timeout() -> Duration {
    let secs = std::env::var("FEED_POLL_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);
    Duration::from_secs(secs)
}

/// Pause after a failed inbound poll before retrying (default: 5 seconds)
///
/// Environment variable: `FEED_ERROR_BACKOFF_SECS`
pub fn feed_error_backoff() -> Duration {
    let secs = std::env::var("FEED_ERROR_BACKOFF_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);
    Duration::from_secs(secs)
}

/// Log all configuration values at startup
pub fn log_configuration() {
    tracing::info!("=== Runtime Configuration ===");
    tracing::info!("  - Fetch timeout: {:?}", fetch_timeout());
    tracing::info!("  - HTTP request timeout: {:?}", http_timeout());
    tracing::info!("  - Command queue capacity: {}", command_queue_capacity());
    tracing::info!("  - Feed poll timeout: {:?}", feed_poll_timeout());
    tracing::info!("  - Feed error backoff: {:?}", feed_error_backoff());
    tracing::info!("=============================");
}
