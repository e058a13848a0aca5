//! Configuration schema definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
///
/// `general` is deliberately not defaulted: a configuration without a
/// `[general]` section is rejected at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Process-wide settings.
    pub general: GeneralConfig,

    /// Relay routing rules.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    /// Per-plugin configuration, keyed by plugin slug. Values are opaque to
    /// the runtime and handed to the owning plugin unchanged.
    #[serde(default)]
    pub plugins: BTreeMap<String, toml::Value>,
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// One relay routing rule: events originating at `from` are delivered to
/// every address in `to`. Both sides use the fully qualified
/// `platform:server:channel` form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Source address of the rule.
    pub from: String,

    /// Destination addresses.
    pub to: Vec<String>,
}
