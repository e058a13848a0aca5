//! Relay configuration: schema, loading, and validation.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{GeneralConfig, RelayConfig, RouteConfig};
pub use validation::validate_config;
