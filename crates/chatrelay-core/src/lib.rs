//! # Chatrelay Core
//!
//! Platform-agnostic contracts for the chatrelay relay.
//!
//! This crate defines the pieces every platform plugin and the runtime agree
//! on:
//!
//! - **Event model**: [`CanonicalEvent`] and [`EventKind`] — the normalized
//!   form every inbound platform message is converted into exactly once.
//! - **Addressing**: [`TargetAddress`] — the `platform:server:channel`
//!   identifier of a relay destination.
//! - **Plugin contract**: the [`Plugin`] trait (start, stop, join, relay)
//!   and the [`EventSink`] plugins use to hand normalized events to the
//!   router.
//! - **Registry**: [`PluginDescriptor`] and [`PluginRegistry`] — static,
//!   slug-keyed plugin registration and configuration-driven selection.
//!
//! ## Event flow
//!
//! ```text
//! ┌─────────────┐     ┌───────────┐     ┌────────┐     ┌─────────────┐
//! │   Backend   │────▶│  Plugin   │────▶│ Router │────▶│ dest Plugin │
//! │ (one server)│     │ normalize │     │        │     │ relay(t, e) │
//! └─────────────┘     └───────────┘     └────────┘     └─────────────┘
//! ```
//!
//! A backend owns one live connection to one server and runs on its own
//! task. Raw protocol callbacks are funneled through the owning plugin's
//! single normalization point, producing a [`CanonicalEvent`] that is
//! submitted through the [`EventSink`]. The runtime's router resolves
//! configured destinations and calls [`Plugin::relay`] on the owning
//! destination plugin.

pub mod error;
pub mod event;
pub mod plugin;
pub mod registry;
pub mod target;

pub use error::{PluginError, PluginResult, RegistryError};
pub use event::{CanonicalEvent, EventKind};
pub use plugin::{BoxedPlugin, DeliveryError, EventSink, Plugin};
pub use registry::{PLUGIN_REGISTRY, PluginContext, PluginDescriptor, PluginRegistry};
pub use target::{AddressError, TargetAddress};

// Re-export linkme so plugin crates can register descriptors without
// depending on it directly.
pub use linkme;
