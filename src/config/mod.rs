//! Configuration module for bot settings and YAML loading
//!
//! This module provides:
//! - Configuration types (`BotSettings`)
//! - YAML loading with environment overrides (`load_settings`)
//! - Logging initialisation (`init_logging`)
//! - Application constants with environment variable overrides

pub mod constants;
mod loader;
pub mod logging;
mod types;

// Re-export types
pub use types::BotSettings;

// Re-export loader functions
pub use loader::{apply_overrides, load_settings, load_settings_from_str};

// Re-export logging functions
pub use logging::{init_logging, SanitizedValue};
