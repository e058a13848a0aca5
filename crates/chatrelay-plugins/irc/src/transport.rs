//! The capability boundary between the plugin and the wire.
//!
//! A [`IrcTransport`] turns connection parameters into a pair of channels:
//! decoded protocol events flowing in, client commands flowing out. The
//! shipped implementation speaks real TCP/TLS; tests substitute an in-memory
//! one.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Parameters for one server connection.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub nick: String,
    pub username: String,
    pub realname: String,
    /// `None` for a plaintext connection.
    pub tls: Option<TlsOptions>,
}

#[derive(Debug, Clone)]
pub struct TlsOptions {
    /// Whether to verify the server certificate chain.
    pub verify: bool,
    /// PEM bundle replacing the platform trust store.
    pub ca_certificates: Option<PathBuf>,
    /// PEM file holding the client certificate chain and private key.
    pub client_certificate: Option<PathBuf>,
}

/// A decoded protocol event the backend cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Registration completed (RPL_WELCOME).
    Welcome,
    /// The requested nick is taken (ERR_NICKNAMEINUSE).
    NickInUse,
    Privmsg { from: String, target: String, text: String },
    Notice { from: String, target: String, text: String },
    Joined { nick: String, channel: String },
    Parted { nick: String, channel: String },
    /// The connection is gone; no further events will arrive.
    Disconnected,
}

/// A command the backend asks the connection to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Privmsg { target: String, text: String },
    Join { channel: String },
    Nick { nick: String },
    Mode { nick: String, modes: String },
    Quit { reason: Option<String> },
}

/// A live connection: events in, commands out.
///
/// Dropping the event receiver or the command sender tears the session down.
pub struct Connection {
    pub events: mpsc::Receiver<ClientEvent>,
    pub commands: mpsc::Sender<ClientCommand>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection to {host}:{port} failed: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("TLS setup failed: {0}")]
    Tls(#[from] rustls::Error),
    #[error("'{0}' is not a valid TLS server name")]
    ServerName(String),
    #[error("failed to read certificate file {path}: {source}")]
    CertRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no usable key material in {path}: {message}")]
    InvalidPem { path: PathBuf, message: String },
}

/// Opens connections to IRC servers.
#[async_trait]
pub trait IrcTransport: Send + Sync {
    async fn connect(&self, options: ConnectOptions) -> Result<Connection, TransportError>;
}
