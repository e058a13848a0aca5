//! # Chatrelay Runtime
//!
//! Orchestration layer for the chatrelay relay.
//!
//! This crate provides:
//! - The [`Relay`] orchestrator: plugin lifecycle (start / stop / join) and
//!   the routing of normalized events to destination plugins
//! - Layered configuration loading ([`ConfigLoader`], [`RelayConfig`])
//! - Logging setup ([`LoggingBuilder`])
//!
//! # Lifecycle
//!
//! ```rust,ignore
//! use chatrelay_runtime::{ConfigLoader, Relay, logging};
//!
//! let config = ConfigLoader::new("config.toml").load()?;
//! logging::init_from_config(&config.general);
//!
//! let mut relay = Relay::new(config);
//! relay.run().await?;   // start, wait for Ctrl+C/SIGTERM, stop, join
//! ```
//!
//! `stop()` signals every plugin before `join()` waits on any, so one
//! slow-to-stop plugin cannot delay the stop signal reaching the others.

pub mod config;
pub mod error;
pub mod logging;
pub mod relay;
mod router;

pub use config::{ConfigError, ConfigLoader, ConfigResult, GeneralConfig, RelayConfig, RouteConfig};
pub use error::{RelayError, RelayResult};
pub use logging::LoggingBuilder;
pub use relay::{Relay, RelayState};
