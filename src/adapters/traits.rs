//! Collaborator traits
//!
//! The rotation scheduler and the command processor only see these traits,
//! so tests can inject in-memory fakes for the network-facing adapters.

use async_trait::async_trait;

use crate::adapters::errors::{FetchResult, NotifyResult};
use crate::adapters::types::{InboundCommand, Quote};

/// Source of price snapshots for a symbol
///
/// # Example Implementation
///
/// ```ignore
/// use async_trait::async_trait;
///
/// struct FixedPrice(f64);
///
/// #[async_trait]
/// impl PriceSource for FixedPrice {
///     async fn fetch_quote(&self, symbol: &str) -> FetchResult<Quote> {
///         Ok(Quote::new(symbol, self.0, None))
///     }
/// }
/// ```
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the latest quote for `symbol`
    ///
    /// Implementations do not need to bound their own latency; the scheduler
    /// wraps every call in a timeout.
    async fn fetch_quote(&self, symbol: &str) -> FetchResult<Quote>;
}

/// Outbound message delivery
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Broadcast a formatted notification to the configured channel
    async fn send(&self, text: &str) -> NotifyResult<()>;

    /// Reply to the chat a command came from
    async fn reply(&self, chat_id: &str, text: &str) -> NotifyResult<()>;
}

/// Inbound command feed
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Wait for the next batch of inbound command lines
    ///
    /// May return an empty batch when a long poll times out.
    async fn next_commands(&self) -> NotifyResult<Vec<InboundCommand>>;
}
