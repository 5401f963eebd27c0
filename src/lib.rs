//! Market rotation notifier
//!
//! Tracks a user-curated list of financial instruments and posts one price
//! notification per interval to a chat channel, cycling through the enabled
//! markets. A text command interface mutates the list while the rotation
//! runs:
//! - Market registry with JSON persistence
//! - Round-robin rotation scheduler with idle/running states
//! - Serialized command processing over a queue

pub mod adapters;
pub mod config;
pub mod core;
pub mod error;

pub use error::AppError;
