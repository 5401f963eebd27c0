//! Application-wide error types using thiserror
//!
//! Startup and wiring errors are wrapped in AppError. Runtime failures of the
//! scheduler and command consumer use their own error types and are never
//! fatal to the process.

use thiserror::Error;

use crate::adapters::errors::{FetchError, NotifyError};
use crate::core::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Price source error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Notifier error: {0}")]
    Notify(#[from] NotifyError),

    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
