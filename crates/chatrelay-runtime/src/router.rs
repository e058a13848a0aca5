//! Event routing: from canonical events to destination plugins.
//!
//! The routing table and the destination plugin map are built once at
//! startup and shared immutably afterwards, so dispatch needs no locking
//! even though backends across every plugin submit events concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use chatrelay_core::{AddressError, BoxedPlugin, CanonicalEvent, TargetAddress};

use crate::config::RouteConfig;

/// Immutable map from source address to destination addresses.
pub(crate) struct RoutingTable {
    routes: HashMap<String, Vec<TargetAddress>>,
}

impl RoutingTable {
    /// Builds the table from configured routing rules.
    ///
    /// Rules with the same source accumulate their destinations.
    pub(crate) fn from_config(routes: &[RouteConfig]) -> Result<Self, AddressError> {
        let mut table: HashMap<String, Vec<TargetAddress>> = HashMap::new();
        for rule in routes {
            // Parse the source through TargetAddress to enforce the
            // three-part form, then key on its canonical rendering.
            let from: TargetAddress = rule.from.parse()?;
            let entry = table.entry(from.to_string()).or_default();
            for to in &rule.to {
                entry.push(to.parse()?);
            }
        }
        Ok(Self { routes: table })
    }

    /// Returns the destinations configured for the event's origin.
    pub(crate) fn resolve(&self, event: &CanonicalEvent) -> &[TargetAddress] {
        let key = format!(
            "{}:{}:{}",
            event.platform(),
            event.server(),
            event.channel()
        );
        self.routes.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct sources with at least one destination.
    pub(crate) fn len(&self) -> usize {
        self.routes.len()
    }
}

/// Resolves destinations for canonical events and delivers them to the
/// owning destination plugins.
pub(crate) struct Router {
    table: RoutingTable,
    plugins: HashMap<String, BoxedPlugin>,
}

impl Router {
    pub(crate) fn new(table: RoutingTable, plugins: HashMap<String, BoxedPlugin>) -> Self {
        Self { table, plugins }
    }

    /// Dispatches one event to every configured destination.
    ///
    /// Unresolvable destinations and delivery misses are reported and the
    /// event dropped: no queuing, no retry.
    pub(crate) async fn dispatch(&self, event: &CanonicalEvent) {
        let targets = self.table.resolve(event);
        if targets.is_empty() {
            debug!(event = %event, "no route for event, dropping");
            return;
        }

        for target in targets {
            let Some(plugin) = self.plugins.get(target.platform()) else {
                warn!(target = %target, "dropping event for unknown destination plugin");
                continue;
            };
            if let Err(miss) = plugin.relay(target, event).await {
                warn!(target = %target, reason = %miss, "delivery failed, dropping event");
            }
        }
    }

    /// Spawns the router task consuming the relay's event channel.
    ///
    /// The task runs until the cancellation token fires or every sink is
    /// dropped.
    pub(crate) fn spawn(
        self: Arc<Self>,
        mut events: mpsc::Receiver<CanonicalEvent>,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => self.dispatch(&event).await,
                        None => break,
                    },
                }
            }
            debug!("router stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chatrelay_core::{DeliveryError, EventKind, Plugin, PluginResult};

    use super::*;

    /// Destination plugin double that records targets and can simulate a
    /// backend that owns no servers.
    struct RecordingPlugin {
        slug: &'static str,
        delivered: Mutex<Vec<String>>,
        reject: Option<DeliveryError>,
    }

    impl RecordingPlugin {
        fn accepting(slug: &'static str) -> Arc<Self> {
            Arc::new(Self {
                slug,
                delivered: Mutex::new(Vec::new()),
                reject: None,
            })
        }

        fn rejecting(slug: &'static str, miss: DeliveryError) -> Arc<Self> {
            Arc::new(Self {
                slug,
                delivered: Mutex::new(Vec::new()),
                reject: Some(miss),
            })
        }
    }

    #[async_trait]
    impl Plugin for RecordingPlugin {
        fn slug(&self) -> &'static str {
            self.slug
        }

        async fn start(&self) -> PluginResult<()> {
            Ok(())
        }

        async fn stop(&self) {}

        async fn join(&self) {}

        async fn relay(
            &self,
            target: &TargetAddress,
            _event: &CanonicalEvent,
        ) -> Result<(), DeliveryError> {
            if let Some(miss) = &self.reject {
                return Err(miss.clone());
            }
            self.delivered.lock().unwrap().push(target.to_string());
            Ok(())
        }
    }

    fn routes(rules: &[(&str, &[&str])]) -> RoutingTable {
        let config: Vec<RouteConfig> = rules
            .iter()
            .map(|(from, to)| RouteConfig {
                from: from.to_string(),
                to: to.iter().map(|t| t.to_string()).collect(),
            })
            .collect();
        RoutingTable::from_config(&config).unwrap()
    }

    fn event(server: &str, channel: &str) -> CanonicalEvent {
        CanonicalEvent::new("irc", server, channel, "alice", "hi", EventKind::Message)
    }

    #[tokio::test]
    async fn dispatches_to_configured_destination() {
        let plugin = RecordingPlugin::accepting("irc");
        let table = routes(&[("irc:libera:#src", &["irc:oftc:#dst"])]);
        let router = Router::new(
            table,
            HashMap::from([("irc".to_string(), plugin.clone() as BoxedPlugin)]),
        );

        router.dispatch(&event("libera", "#src")).await;
        assert_eq!(
            *plugin.delivered.lock().unwrap(),
            vec!["irc:oftc:#dst".to_string()]
        );
    }

    #[tokio::test]
    async fn unrouted_event_is_dropped() {
        let plugin = RecordingPlugin::accepting("irc");
        let table = routes(&[("irc:libera:#src", &["irc:oftc:#dst"])]);
        let router = Router::new(
            table,
            HashMap::from([("irc".to_string(), plugin.clone() as BoxedPlugin)]),
        );

        router.dispatch(&event("libera", "#other")).await;
        assert!(plugin.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_destination_plugin_is_dropped_not_fatal() {
        let table = routes(&[("irc:libera:#src", &["matrix:home:#dst"])]);
        let router = Router::new(table, HashMap::new());
        // Must not panic.
        router.dispatch(&event("libera", "#src")).await;
    }

    #[tokio::test]
    async fn delivery_miss_is_absorbed() {
        let plugin = RecordingPlugin::rejecting(
            "irc",
            DeliveryError::UnknownServer {
                plugin: "irc".to_string(),
                server: "oftc".to_string(),
            },
        );
        let table = routes(&[("irc:libera:#src", &["irc:oftc:#dst"])]);
        let router = Router::new(
            table,
            HashMap::from([("irc".to_string(), plugin.clone() as BoxedPlugin)]),
        );

        // The miss is logged and dropped; dispatch itself never fails.
        router.dispatch(&event("libera", "#src")).await;
        assert!(plugin.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rules_with_same_source_accumulate() {
        let table = routes(&[
            ("irc:libera:#src", &["irc:oftc:#a"]),
            ("irc:libera:#src", &["irc:oftc:#b"]),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve(&event("libera", "#src")).len(), 2);
    }
}
