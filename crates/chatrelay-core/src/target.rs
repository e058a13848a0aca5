//! Relay destination addressing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing a [`TargetAddress`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The separator count did not match the `platform:server:channel` form.
    #[error("invalid target address '{0}': expected platform:server:channel")]
    Format(String),

    /// A component between separators was empty.
    #[error("invalid target address '{address}': empty {component}")]
    EmptyComponent {
        /// The full address string as given.
        address: String,
        /// Which component was empty.
        component: &'static str,
    },
}

/// Platform-agnostic identifier of a relay destination.
///
/// Parsed from the fully qualified `platform:server:channel` form. Parsing
/// only checks the shape; whether the server names a live backend (and
/// whether that backend is a member of the channel) is validated at delivery
/// time by the owning plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetAddress {
    platform: String,
    server: String,
    channel: String,
}

impl TargetAddress {
    /// Slug of the plugin that owns the destination.
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Destination server name within that plugin.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Destination channel on that server.
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl FromStr for TargetAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (Some(platform), Some(server), Some(channel), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AddressError::Format(s.to_string()));
        };

        for (component, value) in [
            ("platform", platform),
            ("server", server),
            ("channel", channel),
        ] {
            if value.is_empty() {
                return Err(AddressError::EmptyComponent {
                    address: s.to_string(),
                    component,
                });
            }
        }

        Ok(Self {
            platform: platform.to_string(),
            server: server.to_string(),
            channel: channel.to_string(),
        })
    }
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.platform, self.server, self.channel)
    }
}

impl TryFrom<String> for TargetAddress {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TargetAddress> for String {
    fn from(addr: TargetAddress) -> Self {
        addr.to_string()
    }
}
