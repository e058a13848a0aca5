//! Runtime error types.

use chatrelay_core::{AddressError, PluginError, RegistryError};
use thiserror::Error;

use crate::relay::RelayState;

/// Errors surfaced by the relay orchestrator.
#[derive(Error, Debug)]
pub enum RelayError {
    /// A lifecycle operation was invoked from the wrong state.
    #[error("operation not valid in relay state {state:?}")]
    InvalidState {
        /// The state the relay was in.
        state: RelayState,
    },

    /// Plugin discovery failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A plugin failed to build or start.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// A routing rule contained a malformed address.
    #[error("invalid routing rule: {0}")]
    Route(#[from] AddressError),
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
