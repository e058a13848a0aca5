//! Configuration error types.

use std::path::PathBuf;

use chatrelay_core::AddressError;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found at the specified path.
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The file could not be parsed or extracted into the schema.
    ///
    /// A missing `[general]` section surfaces here as a missing-field
    /// extraction error.
    #[error("failed to load configuration: {0}")]
    Extract(#[from] figment::Error),

    /// Invalid configuration value.
    #[error("invalid configuration: {message}")]
    Validation {
        /// What was wrong.
        message: String,
    },

    /// A routing rule contained a malformed address.
    #[error("invalid routing rule: {0}")]
    Route(#[from] AddressError),
}

impl ConfigError {
    /// Creates a validation error with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
