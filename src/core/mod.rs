//! Core module - market registry, persistence, rotation scheduler, commands
//!
//! This module uses **explicit re-exports** instead of glob exports (`pub use module::*`)
//! so the public API only changes on purpose.
//!
//! ## Usage
//! Prefer importing from `crate::core`:
//! ```ignore
//! use crate::core::{MarketRegistry, RotationScheduler, SchedulerControl};
//! ```

pub mod channels;
pub mod commands;
pub mod format;
pub mod registry;
pub mod runtime;
pub mod scheduler;
pub mod store;

// Explicit re-exports for registry module
pub use registry::{
    MarketEntry, MarketListing, MarketRegistry, PriceSnapshot, RegistryError, SharedRegistry,
};

// Explicit re-exports for store module
pub use store::{ConfigStore, MarketStatus, PersistedState, StoreError};

// Explicit re-exports for scheduler module
pub use scheduler::{RotationScheduler, SchedulerControl, SchedulerState, TickOutcome};

// Explicit re-exports for commands module
pub use commands::{help_text, parse_command, Command, CommandError, CommandProcessor};

// Explicit re-exports for channels module
pub use channels::{ChannelBundle, CommandQueue, QueueClosed, DEFAULT_CHANNEL_CAPACITY};

// Explicit re-exports for format module
pub use format::{format_fetch_error, format_listing, format_snapshot};

// Explicit re-exports for runtime module
pub use runtime::{command_task, inbound_feed_task};
