//! External collaborators: price source and chat transport
//!
//! This module provides the traits the core is written against and the
//! default HTTP implementations (Yahoo Finance, Telegram Bot API).

pub mod errors;
pub mod telegram;
pub mod traits;
pub mod types;
pub mod yahoo;

// Re-export commonly used types for convenience
pub use errors::{FetchError, FetchResult, NotifyError, NotifyResult};
pub use telegram::TelegramClient;
pub use traits::{CommandTransport, Notifier, PriceSource};
pub use types::{InboundCommand, Quote};
pub use yahoo::YahooPriceSource;
