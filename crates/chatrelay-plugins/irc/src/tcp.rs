//! The shipped transport: plain TCP or TLS over TCP.

use std::sync::Arc;

use async_trait::async_trait;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_rustls::TlsConnector;
use tracing::{debug, trace};

use crate::proto::{self, Translated};
use crate::tls;
use crate::transport::{
    ClientCommand, ClientEvent, ConnectOptions, Connection, IrcTransport, TransportError,
};

const SESSION_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Default)]
pub struct TcpTransport;

impl TcpTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IrcTransport for TcpTransport {
    async fn connect(&self, options: ConnectOptions) -> Result<Connection, TransportError> {
        let stream = TcpStream::connect((options.host.as_str(), options.port))
            .await
            .map_err(|source| TransportError::Connect {
                host: options.host.clone(),
                port: options.port,
                source,
            })?;
        match &options.tls {
            Some(tls_options) => {
                let config = tls::client_config(tls_options)?;
                let connector = TlsConnector::from(Arc::new(config));
                let server_name = ServerName::try_from(options.host.clone())
                    .map_err(|_| TransportError::ServerName(options.host.clone()))?;
                let stream = connector.connect(server_name, stream).await.map_err(
                    |source| TransportError::Connect {
                        host: options.host.clone(),
                        port: options.port,
                        source,
                    },
                )?;
                Ok(spawn_session(stream, options))
            }
            None => Ok(spawn_session(stream, options)),
        }
    }
}

fn spawn_session<S>(stream: S, options: ConnectOptions) -> Connection
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(SESSION_QUEUE_DEPTH);
    let (command_tx, command_rx) = mpsc::channel(SESSION_QUEUE_DEPTH);
    tokio::spawn(session(stream, options, event_tx, command_rx));
    Connection {
        events: event_rx,
        commands: command_tx,
    }
}

/// Owns the socket: reads and decodes lines, writes rendered commands,
/// answers PING itself. Ends on socket close, on `Quit`, or when the
/// command sender is dropped.
async fn session<S>(
    stream: S,
    options: ConnectOptions,
    events: mpsc::Sender<ClientEvent>,
    mut commands: mpsc::Receiver<ClientCommand>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();

    let registration = proto::registration(&options);
    if writer.write_all(registration.as_bytes()).await.is_err() {
        let _ = events.send(ClientEvent::Disconnected).await;
        return;
    }
    debug!(host = %options.host, nick = %options.nick, "registration sent");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) | Err(_) => {
                        let _ = events.send(ClientEvent::Disconnected).await;
                        break;
                    }
                };
                trace!(host = %options.host, %line, "received");
                let Some(parsed) = proto::parse(&line) else {
                    continue;
                };
                match proto::translate(&parsed) {
                    Translated::Pong(token) => {
                        let pong = format!("PONG :{token}\r\n");
                        if writer.write_all(pong.as_bytes()).await.is_err() {
                            let _ = events.send(ClientEvent::Disconnected).await;
                            break;
                        }
                    }
                    Translated::Event(event) => {
                        if events.send(event).await.is_err() {
                            break;
                        }
                    }
                    Translated::Ignore => {}
                }
            }
            command = commands.recv() => {
                let Some(command) = command else { break };
                let quitting = matches!(command, ClientCommand::Quit { .. });
                let rendered = proto::render(&command);
                trace!(host = %options.host, line = %rendered.trim_end(), "sent");
                if writer.write_all(rendered.as_bytes()).await.is_err() {
                    let _ = events.send(ClientEvent::Disconnected).await;
                    break;
                }
                if quitting {
                    break;
                }
            }
        }
    }
}
