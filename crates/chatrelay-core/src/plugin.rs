//! The plugin capability contract.
//!
//! A plugin is the process-scoped integration for one chat platform. It owns
//! zero or more backends (one live connection per configured server) and
//! exposes exactly four operations: `start`, `stop`, `join`, and
//! `relay(target, event)`. A type either implements the full set or does not
//! satisfy the contract — there are no runtime "not implemented" stubs.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::PluginResult;
use crate::event::CanonicalEvent;
use crate::target::TargetAddress;

/// A routing miss reported by [`Plugin::relay`].
///
/// These are steady-state delivery failures: the router reports them and
/// drops the event. They never propagate further — only
/// programmer-error-class failures may cross the plugin boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The target names a server this plugin does not own a backend for.
    #[error("unknown server '{server}' for plugin '{plugin}'")]
    UnknownServer {
        /// The plugin slug the delivery was addressed to.
        plugin: String,
        /// The unrecognized server name.
        server: String,
    },

    /// The backend exists but is not a member of the target channel.
    #[error("not a member of channel '{channel}' on server '{server}'")]
    NotJoined {
        /// The destination server name.
        server: String,
        /// The channel the backend has not joined.
        channel: String,
    },
}

/// The capability set every platform implementation exposes.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Stable identifier matching this plugin to its configuration section.
    fn slug(&self) -> &'static str;

    /// Constructs and starts one backend per configured server.
    ///
    /// Returns once all backends have been instructed to begin connecting;
    /// connection establishment continues on each backend's own task. Must
    /// be called at most once.
    async fn start(&self) -> PluginResult<()>;

    /// Signals every owned backend to begin disconnecting.
    ///
    /// Does not wait for disconnection to complete, and absorbs (logs) any
    /// per-backend failure so every backend is signaled.
    async fn stop(&self);

    /// Blocks until every owned backend has fully terminated its task.
    async fn join(&self);

    /// Delivers an already-normalized event to the named destination.
    ///
    /// Validates that `target.server` names an owned backend and that the
    /// backend is a member of `target.channel`; on either miss, takes no
    /// delivery action and returns the specific reason.
    async fn relay(
        &self,
        target: &TargetAddress,
        event: &CanonicalEvent,
    ) -> Result<(), DeliveryError>;
}

/// A shared plugin trait object.
pub type BoxedPlugin = Arc<dyn Plugin>;

/// Handle plugins use to submit normalized events to the relay's router.
///
/// Cloned into every backend at construction; submitting is the only path
/// into the router, which makes the normalization point the single choke
/// point for inbound events.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<CanonicalEvent>,
}

impl EventSink {
    /// Wraps the router's channel sender.
    pub fn new(tx: mpsc::Sender<CanonicalEvent>) -> Self {
        Self { tx }
    }

    /// Submits a normalized event for routing.
    ///
    /// If the router has shut down the event is dropped with a warning;
    /// backends keep running regardless.
    pub async fn submit(&self, event: CanonicalEvent) {
        if self.tx.send(event).await.is_err() {
            warn!("router is gone, dropping normalized event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[tokio::test]
    async fn sink_delivers_to_router_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = EventSink::new(tx);
        let event = CanonicalEvent::new("irc", "libera", "#a", "alice", "hi", EventKind::Message);
        sink.submit(event.clone()).await;
        assert_eq!(rx.recv().await, Some(event));
    }

    #[tokio::test]
    async fn sink_absorbs_closed_router() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sink = EventSink::new(tx);
        let event = CanonicalEvent::new("irc", "libera", "#a", "alice", "hi", EventKind::Message);
        // Must not panic or error.
        sink.submit(event).await;
    }
}
