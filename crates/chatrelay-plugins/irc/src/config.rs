//! Per-server configuration for the IRC plugin.

use std::path::PathBuf;

use chatrelay_core::{PluginError, PluginResult};
use serde::Deserialize;

use crate::plugin::SLUG;
use crate::transport::{ConnectOptions, TlsOptions};

pub const DEFAULT_TLS_PORT: u16 = 6697;
pub const DEFAULT_PLAIN_PORT: u16 = 6667;

/// One `[plugins.irc.<server>]` table as written in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawServerConfig {
    pub host: Option<String>,
    pub nick: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<bool>,
    pub tls_verify: Option<bool>,
    pub tls_ca_certificates: Option<PathBuf>,
    pub tls_client_certificate: Option<PathBuf>,
    pub username: Option<String>,
    pub realname: Option<String>,
    pub user_modes: Option<String>,
    #[serde(default)]
    pub channels: Vec<String>,
}

/// A server configuration with all defaults applied.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub nick: String,
    pub port: u16,
    pub tls: bool,
    pub tls_verify: bool,
    pub tls_ca_certificates: Option<PathBuf>,
    pub tls_client_certificate: Option<PathBuf>,
    pub username: String,
    pub realname: String,
    pub user_modes: Option<String>,
    pub channels: Vec<String>,
}

impl RawServerConfig {
    /// Applies defaults and checks required fields.
    ///
    /// TLS is on unless explicitly disabled; the port default follows the
    /// TLS decision. Username and realname fall back to the nick.
    pub fn resolve(self, server: &str) -> PluginResult<ServerConfig> {
        let host = self
            .host
            .filter(|value| !value.is_empty())
            .ok_or_else(|| PluginError::missing_field(SLUG, server, "host"))?;
        let nick = self
            .nick
            .filter(|value| !value.is_empty())
            .ok_or_else(|| PluginError::missing_field(SLUG, server, "nick"))?;
        let tls = self.tls.unwrap_or(true);
        let port = self.port.unwrap_or(if tls {
            DEFAULT_TLS_PORT
        } else {
            DEFAULT_PLAIN_PORT
        });
        let username = self
            .username
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| nick.clone());
        let realname = self
            .realname
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| nick.clone());
        Ok(ServerConfig {
            host,
            nick,
            port,
            tls,
            tls_verify: self.tls_verify.unwrap_or(true),
            tls_ca_certificates: self.tls_ca_certificates,
            tls_client_certificate: self.tls_client_certificate,
            username,
            realname,
            user_modes: self.user_modes,
            channels: self.channels,
        })
    }
}

impl ServerConfig {
    pub(crate) fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            host: self.host.clone(),
            port: self.port,
            nick: self.nick.clone(),
            username: self.username.clone(),
            realname: self.realname.clone(),
            tls: self.tls.then(|| TlsOptions {
                verify: self.tls_verify,
                ca_certificates: self.tls_ca_certificates.clone(),
                client_certificate: self.tls_client_certificate.clone(),
            }),
        }
    }
}
