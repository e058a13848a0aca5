//! Configuration loader using figment.
//!
//! Sources, lowest to highest priority:
//!
//! 1. The TOML file named by the caller (`config.toml` by default)
//! 2. Environment variables (`CHATRELAY_*`, `__` as section separator)
//!
//! # Environment variable mapping
//!
//! - `CHATRELAY_GENERAL__LOG_LEVEL=debug` → `general.log_level = "debug"`
//! - `CHATRELAY_PLUGINS__IRC__LIBERA__NICK=bot` →
//!   `plugins.irc.libera.nick = "bot"`

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use tracing::debug;

use super::error::{ConfigError, ConfigResult};
use super::schema::RelayConfig;
use super::validation;

/// Environment variable prefix for configuration overrides.
const ENV_PREFIX: &str = "CHATRELAY_";

/// Loads and validates a [`RelayConfig`] from a TOML file plus environment
/// overrides.
pub struct ConfigLoader {
    file: PathBuf,
    load_env: bool,
}

impl ConfigLoader {
    /// Creates a loader for the given configuration file.
    pub fn new<P: AsRef<Path>>(file: P) -> Self {
        Self {
            file: file.as_ref().to_path_buf(),
            load_env: true,
        }
    }

    /// Disables environment variable overrides (enabled by default).
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Loads, extracts, and validates the configuration.
    pub fn load(&self) -> ConfigResult<RelayConfig> {
        if !self.file.is_file() {
            return Err(ConfigError::FileNotFound(self.file.clone()));
        }

        let mut figment = Figment::new().merge(Toml::file(&self.file));
        if self.load_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        let config: RelayConfig = figment.extract()?;
        validation::validate_config(&config)?;
        debug!(file = %self.file.display(), "configuration loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_minimal_config() {
        let (_dir, path) = write_config(
            r#"
            [general]
            log_level = "info"

            [plugins.irc.libera]
            host = "irc.libera.chat"
            nick = "relaybot"
            "#,
        );

        let config = ConfigLoader::new(&path).without_env().load().unwrap();
        assert_eq!(config.general.log_level, "info");
        assert!(config.plugins.contains_key("irc"));
        assert!(config.routes.is_empty());
    }

    #[test]
    fn missing_general_section_is_fatal() {
        let (_dir, path) = write_config("[plugins.irc.libera]\nhost = \"h\"\nnick = \"n\"\n");
        let err = ConfigLoader::new(&path).without_env().load().unwrap_err();
        assert!(matches!(err, ConfigError::Extract(_)));
    }

    #[test]
    fn invalid_log_level_is_fatal() {
        let (_dir, path) = write_config("[general]\nlog_level = \"loud\"\n");
        let err = ConfigLoader::new(&path).without_env().load().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = ConfigLoader::new("/nonexistent/chatrelay.toml")
            .without_env()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn log_level_defaults_to_warn() {
        let (_dir, path) = write_config("[general]\n");
        let config = ConfigLoader::new(&path).without_env().load().unwrap();
        assert_eq!(config.general.log_level, "warn");
    }
}
