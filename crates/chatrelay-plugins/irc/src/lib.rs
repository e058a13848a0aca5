//! # Chatrelay IRC plugin
//!
//! IRC platform support for chatrelay. The plugin owns one backend per
//! configured server; each backend runs a connection on its own task,
//! handles registration (nick collisions, user modes, channel joins) and
//! funnels channel traffic through the plugin's normalization point.
//!
//! Linking this crate registers the plugin under the `irc` slug; it is only
//! built when a `[plugins.irc]` section exists in the configuration.
//!
//! Configuration, one table per server:
//!
//! ```toml
//! [plugins.irc.libera]
//! host = "irc.libera.chat"
//! nick = "relaybot"
//! channels = ["#chatrelay"]
//! ```
//!
//! TLS is on by default (port 6697, certificate verification against the
//! platform trust store); `tls = false` switches to plaintext on port 6667.

mod backend;
pub mod config;
mod plugin;
mod proto;
mod tcp;
mod tls;
pub mod transport;

pub use config::{RawServerConfig, ServerConfig};
pub use plugin::{IrcPlugin, SLUG};
pub use tcp::TcpTransport;
pub use transport::{
    ClientCommand, ClientEvent, ConnectOptions, Connection, IrcTransport, TlsOptions,
    TransportError,
};
