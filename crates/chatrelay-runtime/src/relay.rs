//! The relay orchestrator.
//!
//! The [`Relay`] owns the set of started plugins and drives their lifecycle
//! from a single control path: `start` → `stop` → `join`. Concurrent calls
//! to the lifecycle methods are not supported; what IS concurrent is event
//! flow, which runs entirely over the event channel and the immutable
//! router built at startup.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use chatrelay_core::{
    BoxedPlugin, CanonicalEvent, EventSink, PluginContext, PluginRegistry,
};

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::router::{Router, RoutingTable};

/// Depth of the normalized-event channel feeding the router.
const EVENT_QUEUE_DEPTH: usize = 256;

/// Lifecycle state of the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Constructed, nothing started.
    Idle,
    /// Plugins started (or partially started after a start failure).
    Running,
    /// Every plugin has been signaled to stop.
    Stopping,
    /// Every plugin has fully terminated.
    Stopped,
}

/// Process-wide orchestrator for plugins and event routing.
///
/// ```rust,ignore
/// let config = ConfigLoader::new("config.toml").load()?;
/// let mut relay = Relay::new(config);
/// relay.run().await?;
/// ```
pub struct Relay {
    config: RelayConfig,
    state: RelayState,
    /// Started plugins, in start order. Appended only after a successful
    /// `start()`; iterated in this order by both `stop()` and `join()`.
    plugins: Vec<BoxedPlugin>,
    router: Option<Arc<Router>>,
    router_task: Option<JoinHandle<()>>,
    router_token: CancellationToken,
    events_tx: mpsc::Sender<CanonicalEvent>,
    events_rx: Option<mpsc::Receiver<CanonicalEvent>>,
}

impl Relay {
    /// Creates an idle relay from loaded configuration.
    pub fn new(config: RelayConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        Self {
            config,
            state: RelayState::Idle,
            plugins: Vec::new(),
            router: None,
            router_task: None,
            router_token: CancellationToken::new(),
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Discovers configured plugins, builds them, and starts each in turn.
    ///
    /// Must be called at most once. If one plugin fails to start, the
    /// failure propagates without implicitly stopping the plugins already
    /// started — a caller wanting all-or-nothing startup catches the error
    /// and calls [`stop`](Self::stop) / [`join`](Self::join) itself.
    pub async fn start(&mut self) -> RelayResult<()> {
        let registry = PluginRegistry::discover()?;
        let selected = registry.select(&self.config.plugins);

        let mut built = Vec::with_capacity(selected.len());
        for descriptor in selected {
            // select() only yields slugs present in the config.
            let section = self
                .config
                .plugins
                .get(descriptor.slug)
                .cloned()
                .unwrap_or_else(|| toml::Value::Table(toml::map::Map::new()));
            let context = PluginContext {
                slug: descriptor.slug,
                config: section,
                events: EventSink::new(self.events_tx.clone()),
            };
            built.push((descriptor.build)(context)?);
        }

        self.launch(built).await
    }

    /// Starts an already-built plugin set: spawns the router, then starts
    /// plugins in order, appending each to the instance set only after its
    /// `start()` succeeds.
    pub(crate) async fn launch(&mut self, built: Vec<BoxedPlugin>) -> RelayResult<()> {
        if self.state != RelayState::Idle {
            return Err(RelayError::InvalidState { state: self.state });
        }
        self.state = RelayState::Running;
        debug!("starting relay");

        let table = RoutingTable::from_config(&self.config.routes)?;
        let plugin_map: HashMap<String, BoxedPlugin> = built
            .iter()
            .map(|plugin| (plugin.slug().to_string(), Arc::clone(plugin)))
            .collect();
        let router = Arc::new(Router::new(table, plugin_map));
        if let Some(events_rx) = self.events_rx.take() {
            self.router_task =
                Some(Arc::clone(&router).spawn(events_rx, self.router_token.clone()));
        }
        self.router = Some(router);

        for plugin in built {
            info!(plugin = plugin.slug(), "loading plugin");
            if let Err(cause) = plugin.start().await {
                error!(plugin = plugin.slug(), error = %cause, "plugin failed to start");
                return Err(cause.into());
            }
            self.plugins.push(plugin);
        }

        info!(plugins = self.plugins.len(), "relay started");
        Ok(())
    }

    /// Signals every started plugin to stop, in start order.
    ///
    /// One pass, unconditional: a plugin's teardown trouble never prevents
    /// the stop signal from reaching the rest. Waiting happens separately in
    /// [`join`](Self::join), so a slow-to-stop plugin cannot delay the
    /// signal to the others.
    pub async fn stop(&mut self) {
        if self.state != RelayState::Running {
            warn!(state = ?self.state, "stop ignored");
            return;
        }
        self.state = RelayState::Stopping;

        for plugin in &self.plugins {
            info!(plugin = plugin.slug(), "shutting down plugin");
            plugin.stop().await;
        }
    }

    /// Waits for every plugin to fully terminate, in the same order
    /// [`stop`](Self::stop) signaled them, then retires the router.
    ///
    /// A backend that never completes disconnection blocks here
    /// indefinitely; there is no per-plugin deadline.
    pub async fn join(&mut self) {
        if self.state != RelayState::Stopping {
            warn!(state = ?self.state, "join ignored");
            return;
        }

        for plugin in &self.plugins {
            info!(plugin = plugin.slug(), "waiting for plugin to stop");
            plugin.join().await;
        }

        self.router_token.cancel();
        if let Some(task) = self.router_task.take() {
            let _ = task.await;
        }
        self.state = RelayState::Stopped;
        info!("relay stopped");
    }

    /// Router entry point: resolves configured destinations for an
    /// already-normalized event and delivers to each owning plugin.
    ///
    /// Unresolvable destinations are reported and the event dropped.
    pub async fn relay_event(&self, event: &CanonicalEvent) {
        match &self.router {
            Some(router) => router.dispatch(event).await,
            None => warn!("relay not started, dropping event"),
        }
    }

    /// Runs the relay until a shutdown signal is received.
    pub async fn run(&mut self) -> RelayResult<()> {
        self.start().await?;

        info!("chatrelay is running, press Ctrl+C to stop");
        Self::wait_for_shutdown().await;

        self.stop().await;
        self.join().await;
        Ok(())
    }

    /// Waits for shutdown signals (Ctrl+C or SIGTERM).
    async fn wait_for_shutdown() {
        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");

            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("received Ctrl+C, shutting down");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, shutting down");
                }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await.expect("failed to listen for Ctrl+C");
            info!("received Ctrl+C, shutting down");
        }
    }
}
