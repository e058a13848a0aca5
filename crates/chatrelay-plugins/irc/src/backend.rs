//! One backend per configured server: owns the connection task, the channel
//! membership set, and the command queue used for relayed messages.

use std::collections::HashSet;
use std::sync::Arc;

use chatrelay_core::EventSink;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::plugin::normalize;
use crate::transport::{ClientCommand, ClientEvent, IrcTransport};

const COMMAND_QUEUE_DEPTH: usize = 64;
const QUIT_REASON: &str = "relay shutting down";

pub(crate) struct IrcBackend {
    commands: mpsc::Sender<ClientCommand>,
    joined: Arc<RwLock<HashSet<String>>>,
    token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IrcBackend {
    pub(crate) fn spawn(
        server: String,
        config: ServerConfig,
        events: EventSink,
        transport: Arc<dyn IrcTransport>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let joined = Arc::new(RwLock::new(HashSet::new()));
        let token = CancellationToken::new();
        let task = tokio::spawn(run(
            server,
            config,
            events,
            transport,
            command_rx,
            Arc::clone(&joined),
            token.clone(),
        ));
        Self {
            commands: command_tx,
            joined,
            token,
            task: Mutex::new(Some(task)),
        }
    }

    /// Signals the backend to disconnect. Returns immediately.
    pub(crate) fn stop(&self) {
        self.token.cancel();
    }

    /// Hands out the task handle for awaiting. Subsequent calls get `None`.
    pub(crate) fn take_task(&self) -> Option<JoinHandle<()>> {
        self.task.lock().take()
    }

    pub(crate) fn is_joined(&self, channel: &str) -> bool {
        self.joined.read().contains(channel)
    }

    pub(crate) fn commands(&self) -> mpsc::Sender<ClientCommand> {
        self.commands.clone()
    }
}

/// The backend task: connects, drives the post-registration handshake, and
/// shuttles events and relayed commands until told to stop.
async fn run(
    server: String,
    config: ServerConfig,
    events: EventSink,
    transport: Arc<dyn IrcTransport>,
    mut relayed: mpsc::Receiver<ClientCommand>,
    joined: Arc<RwLock<HashSet<String>>>,
    token: CancellationToken,
) {
    info!(server = %server, host = %config.host, port = config.port, tls = config.tls, "connecting");
    let mut connection = tokio::select! {
        _ = token.cancelled() => return,
        result = transport.connect(config.connect_options()) => match result {
            Ok(connection) => connection,
            Err(error) => {
                error!(server = %server, %error, "connection failed");
                return;
            }
        },
    };

    let mut nick = config.nick.clone();
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                let _ = connection
                    .commands
                    .send(ClientCommand::Quit { reason: Some(QUIT_REASON.to_string()) })
                    .await;
                break;
            }
            command = relayed.recv() => {
                let Some(command) = command else { break };
                if connection.commands.send(command).await.is_err() {
                    warn!(server = %server, "connection task is gone");
                    break;
                }
            }
            event = connection.events.recv() => {
                let Some(event) = event else {
                    warn!(server = %server, "connection closed");
                    break;
                };
                match event {
                    ClientEvent::Welcome => {
                        debug!(server = %server, nick = %nick, "registered");
                        if let Some(modes) = &config.user_modes {
                            let _ = connection
                                .commands
                                .send(ClientCommand::Mode { nick: nick.clone(), modes: modes.clone() })
                                .await;
                        }
                        for channel in &config.channels {
                            let _ = connection
                                .commands
                                .send(ClientCommand::Join { channel: channel.clone() })
                                .await;
                        }
                    }
                    ClientEvent::NickInUse => {
                        nick.push('_');
                        info!(server = %server, nick = %nick, "nick in use, retrying with suffix");
                        let _ = connection
                            .commands
                            .send(ClientCommand::Nick { nick: nick.clone() })
                            .await;
                    }
                    ClientEvent::Joined { nick: ref who, ref channel } if *who == nick => {
                        debug!(server = %server, channel = %channel, "joined");
                        joined.write().insert(channel.clone());
                    }
                    ClientEvent::Parted { nick: ref who, ref channel } if *who == nick => {
                        debug!(server = %server, channel = %channel, "parted");
                        joined.write().remove(channel);
                    }
                    ClientEvent::Disconnected => {
                        warn!(server = %server, "disconnected");
                        break;
                    }
                    other => {
                        if let Some(canonical) = normalize(&server, &other) {
                            events.submit(canonical).await;
                        }
                    }
                }
            }
        }
    }
    debug!(server = %server, "backend terminated");
}
