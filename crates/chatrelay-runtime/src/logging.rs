//! Logging setup on `tracing` / `tracing-subscriber`.
//!
//! Components never touch a global mutable logger: the subscriber is
//! installed once from configuration, and every component logs through
//! `tracing` macros with scoped fields (`plugin = %slug`, `server = %name`).

use tracing_subscriber::EnvFilter;

use crate::config::GeneralConfig;

/// Builder for the process-wide tracing subscriber.
///
/// ```rust,ignore
/// LoggingBuilder::new("info")
///     .directive("chatrelay_plugin_irc=debug")
///     .init();
/// ```
pub struct LoggingBuilder {
    filter: String,
    with_target: bool,
}

impl LoggingBuilder {
    /// Creates a builder with the given base level.
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            filter: level.into(),
            with_target: true,
        }
    }

    /// Appends an extra filter directive (e.g. `"chatrelay_runtime=debug"`).
    pub fn directive(mut self, directive: &str) -> Self {
        self.filter.push(',');
        self.filter.push_str(directive);
        self
    }

    /// Controls whether the emitting module path is printed.
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    /// Installs the subscriber.
    ///
    /// Does nothing if a subscriber is already installed, so tests and
    /// embedding callers can initialize their own.
    pub fn init(self) {
        let filter =
            EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(self.with_target)
            .try_init();
    }
}

/// Initializes logging from the `[general]` configuration section.
///
/// The level has already been validated at config load time; an unparsable
/// filter falls back to `warn`.
pub fn init_from_config(general: &GeneralConfig) {
    LoggingBuilder::new(&general.log_level).init();
}
