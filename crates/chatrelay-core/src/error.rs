//! Error types shared across the plugin boundary.

use thiserror::Error;

/// Errors from constructing or starting a plugin.
///
/// These are configuration-error-class failures: fatal at the point of
/// construction or `start()`, propagated to the caller, never retried.
#[derive(Error, Debug)]
pub enum PluginError {
    /// The plugin's configuration section could not be interpreted.
    #[error("invalid configuration for plugin '{slug}': {message}")]
    Config {
        /// The plugin slug.
        slug: &'static str,
        /// What was wrong.
        message: String,
    },

    /// A required per-server setting was absent.
    #[error("required setting '{field}' is missing for {slug}.{server}")]
    MissingField {
        /// The plugin slug.
        slug: &'static str,
        /// The server entry the setting belongs to.
        server: String,
        /// The missing field name.
        field: &'static str,
    },

    /// The plugin failed to begin starting its backends.
    #[error("plugin '{slug}' failed to start: {message}")]
    Start {
        /// The plugin slug.
        slug: &'static str,
        /// What went wrong.
        message: String,
    },
}

impl PluginError {
    /// Creates a configuration error for the given slug.
    pub fn config(slug: &'static str, message: impl Into<String>) -> Self {
        Self::Config {
            slug,
            message: message.into(),
        }
    }

    /// Creates a missing-field error for a per-server setting.
    pub fn missing_field(slug: &'static str, server: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            slug,
            server: server.into(),
            field,
        }
    }

    /// Creates a start failure for the given slug.
    pub fn start(slug: &'static str, message: impl Into<String>) -> Self {
        Self::Start {
            slug,
            message: message.into(),
        }
    }
}

/// Result type for plugin construction and startup.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors surfaced by plugin discovery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two plugin implementations registered the same slug. This is a
    /// configuration error surfaced at discovery time, never resolved by
    /// silently picking one.
    #[error("duplicate plugin slug '{0}' registered by more than one implementation")]
    DuplicateSlug(String),
}
