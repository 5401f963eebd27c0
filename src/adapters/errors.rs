//! Adapter error types
//!
//! Price source and notifier failures are wrapped in their own enums so the
//! scheduler can treat a fetch failure as a reportable event rather than a
//! crash.

use thiserror::Error;

/// Price source failures
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, connection reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx HTTP status from the quote API
    #[error("HTTP {status} for {symbol}")]
    HttpStatus { symbol: String, status: u16 },

    /// The quote API answered but not with anything usable
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The quote API does not know the symbol
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The fetch did not complete within the configured bound
    #[error("Fetch timed out after {0}ms")]
    Timeout(u64),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::InvalidResponse(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Notifier / command transport failures
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Transport failure; the request URL (which carries the bot token) is stripped
    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The chat API rejected the call (ok=false or non-2xx)
    #[error("API rejected request: {0}")]
    Api(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Request(err.without_url())
    }
}

/// Result type alias for price source operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for notifier operations
pub type NotifyResult<T> = std::result::Result<T, NotifyError>;
