//! The IRC plugin: per-server backends behind the platform capability set.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chatrelay_core::linkme::distributed_slice;
use chatrelay_core::{
    BoxedPlugin, CanonicalEvent, DeliveryError, EventKind, EventSink, PLUGIN_REGISTRY, Plugin,
    PluginContext, PluginDescriptor, PluginError, PluginResult, TargetAddress,
};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::backend::IrcBackend;
use crate::config::{RawServerConfig, ServerConfig};
use crate::tcp::TcpTransport;
use crate::transport::{ClientCommand, ClientEvent, IrcTransport};

pub const SLUG: &str = "irc";

#[distributed_slice(PLUGIN_REGISTRY)]
#[linkme(crate = chatrelay_core::linkme)]
static IRC_PLUGIN: PluginDescriptor = PluginDescriptor {
    slug: SLUG,
    build: IrcPlugin::from_context,
};

pub struct IrcPlugin {
    servers: BTreeMap<String, ServerConfig>,
    backends: RwLock<HashMap<String, IrcBackend>>,
    events: EventSink,
    transport: Arc<dyn IrcTransport>,
}

impl std::fmt::Debug for IrcPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrcPlugin")
            .field("servers", &self.servers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl IrcPlugin {
    /// Registry entry point; connects over real TCP/TLS.
    pub fn from_context(context: PluginContext) -> PluginResult<BoxedPlugin> {
        Ok(Arc::new(Self::with_transport(
            context,
            Arc::new(TcpTransport::new()),
        )?))
    }

    /// Builds the plugin with a caller-supplied transport.
    ///
    /// All server sections are resolved here, so configuration mistakes
    /// surface at construction rather than mid-connection.
    pub fn with_transport(
        context: PluginContext,
        transport: Arc<dyn IrcTransport>,
    ) -> PluginResult<Self> {
        let raw: BTreeMap<String, RawServerConfig> = context
            .config
            .try_into()
            .map_err(|error: toml::de::Error| PluginError::config(SLUG, error.to_string()))?;
        let mut servers = BTreeMap::new();
        for (name, section) in raw {
            let resolved = section.resolve(&name)?;
            servers.insert(name, resolved);
        }
        Ok(Self {
            servers,
            backends: RwLock::new(HashMap::new()),
            events: context.events,
            transport,
        })
    }
}

#[async_trait]
impl Plugin for IrcPlugin {
    fn slug(&self) -> &'static str {
        SLUG
    }

    async fn start(&self) -> PluginResult<()> {
        let mut backends = self.backends.write();
        if !backends.is_empty() {
            return Err(PluginError::start(SLUG, "already started"));
        }
        for (name, config) in &self.servers {
            debug!(server = %name, "spawning backend");
            let backend = IrcBackend::spawn(
                name.clone(),
                config.clone(),
                self.events.clone(),
                Arc::clone(&self.transport),
            );
            backends.insert(name.clone(), backend);
        }
        Ok(())
    }

    async fn stop(&self) {
        for (name, backend) in self.backends.read().iter() {
            debug!(server = %name, "disconnect requested");
            backend.stop();
        }
    }

    async fn join(&self) {
        let tasks: Vec<_> = {
            let backends = self.backends.read();
            backends
                .iter()
                .filter_map(|(name, backend)| {
                    backend.take_task().map(|task| (name.clone(), task))
                })
                .collect()
        };
        for (name, task) in tasks {
            if task.await.is_err() {
                warn!(server = %name, "backend task panicked");
            }
        }
    }

    async fn relay(
        &self,
        target: &TargetAddress,
        event: &CanonicalEvent,
    ) -> Result<(), DeliveryError> {
        let commands = {
            let backends = self.backends.read();
            let backend =
                backends
                    .get(target.server())
                    .ok_or_else(|| DeliveryError::UnknownServer {
                        plugin: SLUG.to_string(),
                        server: target.server().to_string(),
                    })?;
            if !backend.is_joined(target.channel()) {
                return Err(DeliveryError::NotJoined {
                    server: target.server().to_string(),
                    channel: target.channel().to_string(),
                });
            }
            backend.commands()
        };
        let outbound = ClientCommand::Privmsg {
            target: target.channel().to_string(),
            text: format_relayed(event),
        };
        if commands.send(outbound).await.is_err() {
            warn!(server = %target.server(), "backend is gone, dropping event");
        }
        Ok(())
    }
}

/// The single normalization point for this platform.
///
/// Every raw protocol event that becomes a [`CanonicalEvent`] passes through
/// here; connection-lifecycle events normalize to `None`.
pub(crate) fn normalize(server: &str, event: &ClientEvent) -> Option<CanonicalEvent> {
    match event {
        ClientEvent::Privmsg { from, target, text } => Some(CanonicalEvent::new(
            SLUG,
            server,
            channel_of(target),
            from.clone(),
            text.clone(),
            EventKind::Message,
        )),
        ClientEvent::Notice { from, target, text } => Some(CanonicalEvent::new(
            SLUG,
            server,
            channel_of(target),
            from.clone(),
            text.clone(),
            EventKind::Notice,
        )),
        ClientEvent::Joined { nick, channel } => Some(CanonicalEvent::new(
            SLUG,
            server,
            channel.clone(),
            nick.clone(),
            "",
            EventKind::Join,
        )),
        ClientEvent::Parted { nick, channel } => Some(CanonicalEvent::new(
            SLUG,
            server,
            channel.clone(),
            nick.clone(),
            "",
            EventKind::Part,
        )),
        ClientEvent::Welcome | ClientEvent::NickInUse | ClientEvent::Disconnected => None,
    }
}

/// Channel targets keep their name; anything else was a direct message.
fn channel_of(target: &str) -> &str {
    if target.starts_with('#') || target.starts_with('&') {
        target
    } else {
        ""
    }
}

/// How a canonical event reads when written into an IRC channel.
fn format_relayed(event: &CanonicalEvent) -> String {
    let nick = crate::proto::nick_of(event.sender());
    match event.kind() {
        EventKind::Message => format!("<{nick}> {}", event.text()),
        EventKind::Notice => format!("-{nick}- {}", event.text()),
        EventKind::Join => format!("*** {nick} joined {}", event.channel()),
        EventKind::Part => format!("*** {nick} left {}", event.channel()),
        _ => event.text().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use crate::transport::{ConnectOptions, Connection, TransportError};

    const WAIT: Duration = Duration::from_secs(2);

    /// Test half of one in-memory connection, keyed by host.
    struct MemoryLink {
        events: mpsc::Sender<ClientEvent>,
        commands: mpsc::Receiver<ClientCommand>,
    }

    #[derive(Default)]
    struct MemoryTransport {
        links: Mutex<HashMap<String, MemoryLink>>,
    }

    #[async_trait]
    impl IrcTransport for MemoryTransport {
        async fn connect(&self, options: ConnectOptions) -> Result<Connection, TransportError> {
            let (event_tx, event_rx) = mpsc::channel(16);
            let (command_tx, command_rx) = mpsc::channel(16);
            self.links.lock().insert(
                options.host.clone(),
                MemoryLink {
                    events: event_tx,
                    commands: command_rx,
                },
            );
            Ok(Connection {
                events: event_rx,
                commands: command_tx,
            })
        }
    }

    impl MemoryTransport {
        async fn take_link(&self, host: &str) -> MemoryLink {
            for _ in 0..100 {
                if let Some(link) = self.links.lock().remove(host) {
                    return link;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            panic!("no connection was opened to {host}");
        }
    }

    fn context(config: &str) -> (PluginContext, mpsc::Receiver<CanonicalEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let context = PluginContext {
            slug: SLUG,
            config: toml::from_str(config).expect("config should parse"),
            events: EventSink::new(tx),
        };
        (context, rx)
    }

    fn libera_config() -> &'static str {
        "[libera]\nhost = \"libera.test\"\nnick = \"bot\"\ntls = false\nchannels = [\"#rust\"]"
    }

    async fn joined_plugin() -> (Arc<IrcPlugin>, Arc<MemoryTransport>, MemoryLink, mpsc::Receiver<CanonicalEvent>) {
        let transport = Arc::new(MemoryTransport::default());
        let (context, sink_rx) = context(libera_config());
        let plugin = Arc::new(
            IrcPlugin::with_transport(context, Arc::clone(&transport) as Arc<dyn IrcTransport>)
                .expect("plugin should build"),
        );
        plugin.start().await.expect("start should succeed");
        let mut link = transport.take_link("libera.test").await;

        link.events.send(ClientEvent::Welcome).await.expect("backend alive");
        let join = timeout(WAIT, link.commands.recv())
            .await
            .expect("command expected")
            .expect("backend alive");
        assert_eq!(
            join,
            ClientCommand::Join {
                channel: "#rust".to_string()
            }
        );
        link.events
            .send(ClientEvent::Joined {
                nick: "bot".to_string(),
                channel: "#rust".to_string(),
            })
            .await
            .expect("backend alive");

        // Membership updates on the backend task; poll until visible.
        let target: TargetAddress = "irc:libera:#rust".parse().expect("address should parse");
        let probe = CanonicalEvent::new("irc", "other", "#src", "alice", "ping", EventKind::Message);
        for _ in 0..100 {
            if plugin.relay(&target, &probe).await.is_ok() {
                // Drain the probe delivery.
                let _ = timeout(WAIT, link.commands.recv()).await;
                return (plugin, transport, link, sink_rx);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("backend never recorded channel membership");
    }

    #[tokio::test]
    async fn missing_host_fails_at_construction() {
        let transport = Arc::new(MemoryTransport::default());
        let (context, _sink_rx) = context("[libera]\nnick = \"bot\"");
        let error = IrcPlugin::with_transport(context, transport)
            .expect_err("construction should fail");
        let message = error.to_string();
        assert!(message.contains("host"), "got: {message}");
        assert!(message.contains("libera"), "got: {message}");
    }

    #[tokio::test]
    async fn relay_delivers_to_joined_channel() {
        let (plugin, _transport, mut link, _sink_rx) = joined_plugin().await;
        let target: TargetAddress = "irc:libera:#rust".parse().expect("address should parse");
        let event = CanonicalEvent::new(
            "matrix",
            "home",
            "#src",
            "alice!ali@example.net",
            "hello rust",
            EventKind::Message,
        );
        plugin.relay(&target, &event).await.expect("delivery should succeed");
        let sent = timeout(WAIT, link.commands.recv())
            .await
            .expect("command expected")
            .expect("backend alive");
        assert_eq!(
            sent,
            ClientCommand::Privmsg {
                target: "#rust".to_string(),
                text: "<alice> hello rust".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn relay_to_unjoined_channel_is_rejected() {
        let (plugin, _transport, _link, _sink_rx) = joined_plugin().await;
        let target: TargetAddress = "irc:libera:#other".parse().expect("address should parse");
        let event = CanonicalEvent::new("irc", "x", "#src", "alice", "hi", EventKind::Message);
        let error = plugin.relay(&target, &event).await.expect_err("delivery should fail");
        assert_eq!(
            error,
            DeliveryError::NotJoined {
                server: "libera".to_string(),
                channel: "#other".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn relay_to_unknown_server_is_rejected() {
        let (plugin, _transport, _link, _sink_rx) = joined_plugin().await;
        let target: TargetAddress = "irc:oftc:#rust".parse().expect("address should parse");
        let event = CanonicalEvent::new("irc", "x", "#src", "alice", "hi", EventKind::Message);
        let error = plugin.relay(&target, &event).await.expect_err("delivery should fail");
        assert_eq!(
            error,
            DeliveryError::UnknownServer {
                plugin: "irc".to_string(),
                server: "oftc".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn inbound_privmsg_normalizes_with_identity_triple() {
        let (_plugin, _transport, link, mut sink_rx) = joined_plugin().await;
        link.events
            .send(ClientEvent::Privmsg {
                from: "alice!ali@example.net".to_string(),
                target: "#rust".to_string(),
                text: "good morning".to_string(),
            })
            .await
            .expect("backend alive");
        let event = timeout(WAIT, sink_rx.recv())
            .await
            .expect("event expected")
            .expect("sink alive");
        assert_eq!(event.platform(), "irc");
        assert_eq!(event.server(), "libera");
        assert_eq!(event.channel(), "#rust");
        assert_eq!(event.sender(), "alice!ali@example.net");
        assert_eq!(event.text(), "good morning");
        assert_eq!(event.kind(), EventKind::Message);
        assert!(!event.is_direct());
    }

    #[tokio::test]
    async fn direct_messages_normalize_with_empty_channel() {
        let (_plugin, _transport, link, mut sink_rx) = joined_plugin().await;
        link.events
            .send(ClientEvent::Privmsg {
                from: "alice!ali@example.net".to_string(),
                target: "bot".to_string(),
                text: "psst".to_string(),
            })
            .await
            .expect("backend alive");
        let event = timeout(WAIT, sink_rx.recv())
            .await
            .expect("event expected")
            .expect("sink alive");
        assert_eq!(event.channel(), "");
        assert!(event.is_direct());
    }

    #[tokio::test]
    async fn nick_collision_retries_with_suffix() {
        let transport = Arc::new(MemoryTransport::default());
        let (context, _sink_rx) = context(libera_config());
        let plugin = IrcPlugin::with_transport(
            context,
            Arc::clone(&transport) as Arc<dyn IrcTransport>,
        )
        .expect("plugin should build");
        plugin.start().await.expect("start should succeed");
        let mut link = transport.take_link("libera.test").await;

        link.events.send(ClientEvent::NickInUse).await.expect("backend alive");
        let retry = timeout(WAIT, link.commands.recv())
            .await
            .expect("command expected")
            .expect("backend alive");
        assert_eq!(
            retry,
            ClientCommand::Nick {
                nick: "bot_".to_string()
            }
        );

        // A second collision appends again.
        link.events.send(ClientEvent::NickInUse).await.expect("backend alive");
        let retry = timeout(WAIT, link.commands.recv())
            .await
            .expect("command expected")
            .expect("backend alive");
        assert_eq!(
            retry,
            ClientCommand::Nick {
                nick: "bot__".to_string()
            }
        );
    }

    #[tokio::test]
    async fn welcome_sets_user_modes_before_joining() {
        let transport = Arc::new(MemoryTransport::default());
        let (context, _sink_rx) = context(
            "[libera]\nhost = \"libera.test\"\nnick = \"bot\"\ntls = false\nuser_modes = \"+iw\"\nchannels = [\"#rust\"]",
        );
        let plugin = IrcPlugin::with_transport(
            context,
            Arc::clone(&transport) as Arc<dyn IrcTransport>,
        )
        .expect("plugin should build");
        plugin.start().await.expect("start should succeed");
        let mut link = transport.take_link("libera.test").await;

        link.events.send(ClientEvent::Welcome).await.expect("backend alive");
        let first = timeout(WAIT, link.commands.recv())
            .await
            .expect("command expected")
            .expect("backend alive");
        assert_eq!(
            first,
            ClientCommand::Mode {
                nick: "bot".to_string(),
                modes: "+iw".to_string(),
            }
        );
        let second = timeout(WAIT, link.commands.recv())
            .await
            .expect("command expected")
            .expect("backend alive");
        assert_eq!(
            second,
            ClientCommand::Join {
                channel: "#rust".to_string()
            }
        );
    }

    #[tokio::test]
    async fn stop_then_join_quits_and_terminates_backends() {
        let (plugin, _transport, mut link, _sink_rx) = joined_plugin().await;
        plugin.stop().await;
        let quit = timeout(WAIT, link.commands.recv())
            .await
            .expect("command expected")
            .expect("backend alive");
        assert!(matches!(quit, ClientCommand::Quit { .. }));
        timeout(WAIT, plugin.join())
            .await
            .expect("join should complete");
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let (plugin, _transport, _link, _sink_rx) = joined_plugin().await;
        assert!(plugin.start().await.is_err());
    }
}
