//! Data carried across the adapter boundary

use serde::{Deserialize, Serialize};

/// Raw quote returned by a price source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Symbol as reported by the source
    pub symbol: String,
    /// Most recent traded price
    pub current_price: f64,
    /// Previous session close, when the source reports one
    pub last_close: Option<f64>,
    /// Change of `current_price` against `last_close`, in percent
    pub today_change_percent: Option<f64>,
}

impl Quote {
    /// Build a quote, deriving the session change from the previous close
    pub fn new(symbol: impl Into<String>, current_price: f64, last_close: Option<f64>) -> Self {
        let today_change_percent = last_close
            .filter(|close| *close != 0.0)
            .map(|close| (current_price - close) / close * 100.0);

        Self {
            symbol: symbol.into(),
            current_price,
            last_close,
            today_change_percent,
        }
    }
}

/// One line of text received from the chat transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundCommand {
    /// Chat the command came from; replies go back here
    pub chat_id: String,
    pub text: String,
}

impl InboundCommand {
    pub fn new(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
        }
    }
}
