//! # Mouthpiece Common Library
//!
//! Shared code for the Mouthpiece lip-sync tooling including:
//! - Error types
//! - Configuration model and config file resolution
//! - Logging initialization

pub mod config;
pub mod error;
pub mod logging;

pub use config::{AlignerConfig, ConfigSource, LipSyncConfig, LoggingConfig};
pub use error::{Error, Result};
