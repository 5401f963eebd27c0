//! Message text for notifications and command replies

use chrono_tz::Tz;

use crate::core::registry::{MarketListing, PriceSnapshot};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const NOT_AVAILABLE: &str = "N/A";

fn price(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{:.2}%", v))
}

/// Escape user-controlled text for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// HTML notification for one successful poll
pub fn format_snapshot(label: &str, snapshot: &PriceSnapshot, tz: Tz) -> String {
    format!(
        "<b>{}</b>\n\
         Timestamp: {}\n\
         Last Close: {}\n\
         Current Price: {}\n\
         Last Price: {}\n\
         Percent Change: {}\n\
         Today Trends: {}",
        escape_html(label),
        snapshot.timestamp.with_timezone(&tz).format(TIMESTAMP_FORMAT),
        price(snapshot.last_close),
        snapshot.current_price,
        price(snapshot.previous_fetch_price),
        percent(snapshot.percent_change),
        percent(snapshot.today_trend),
    )
}

/// Degraded notification for a failed poll; names the market only
pub fn format_fetch_error(label: &str) -> String {
    format!("Error fetching data for {}", escape_html(label))
}

/// Numbered registry listing: `1. GC=F (Gold) - Enabled`
pub fn format_listing(rows: &[MarketListing]) -> String {
    if rows.is_empty() {
        return "No markets configured. Use /add <symbol> to track one.".to_string();
    }

    rows.iter()
        .map(|row| {
            format!(
                "{}. {} ({}) - {}",
                row.index,
                row.symbol,
                row.display_name.as_deref().unwrap_or(NOT_AVAILABLE),
                if row.enabled { "Enabled" } else { "Disabled" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
