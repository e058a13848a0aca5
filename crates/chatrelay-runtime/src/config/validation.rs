//! Configuration validation utilities.

use chatrelay_core::TargetAddress;

use super::error::{ConfigError, ConfigResult};
use super::schema::{RelayConfig, RouteConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &RelayConfig) -> ConfigResult<()> {
    validate_log_level(&config.general.log_level)?;
    validate_routes(&config.routes)?;
    Ok(())
}

/// Validates the configured log level.
fn validate_log_level(level: &str) -> ConfigResult<()> {
    let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&level.to_lowercase().as_str()) {
        return Err(ConfigError::validation(format!(
            "invalid log level: {level}. Valid values are: {valid_log_levels:?}"
        )));
    }
    Ok(())
}

/// Validates all routing rules.
fn validate_routes(routes: &[RouteConfig]) -> ConfigResult<()> {
    for route in routes {
        route.from.parse::<TargetAddress>()?;
        if route.to.is_empty() {
            return Err(ConfigError::validation(format!(
                "route from '{}' has no destinations",
                route.from
            )));
        }
        for to in &route.to {
            to.parse::<TargetAddress>()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::GeneralConfig;

    fn base_config() -> RelayConfig {
        RelayConfig {
            general: GeneralConfig::default(),
            routes: Vec::new(),
            plugins: Default::default(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let mut config = base_config();
        config.general.log_level = "verbose".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn malformed_route_source_is_rejected() {
        let mut config = base_config();
        config.routes.push(RouteConfig {
            from: "libera:#chatrelay".to_string(),
            to: vec!["irc:oftc:#chatrelay".to_string()],
        });
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Route(_))
        ));
    }

    #[test]
    fn route_without_destinations_is_rejected() {
        let mut config = base_config();
        config.routes.push(RouteConfig {
            from: "irc:libera:#chatrelay".to_string(),
            to: Vec::new(),
        });
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Validation { .. })
        ));
    }
}
