//! The canonical event model.
//!
//! Every inbound platform message is converted into a [`CanonicalEvent`]
//! exactly once, at the owning plugin's normalization point. The event is
//! immutable from then on: the router and destination plugins only ever see
//! `&CanonicalEvent`.

use serde::{Deserialize, Serialize};

/// Classification of a canonical event.
///
/// Marked non-exhaustive so platforms can grow the taxonomy without
/// breaking downstream matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum EventKind {
    /// An ordinary chat message.
    Message,
    /// An out-of-band notice (IRC NOTICE and equivalents).
    Notice,
    /// A user joined a channel.
    Join,
    /// A user left a channel.
    Part,
    /// Anything the plugin normalizes but cannot classify further.
    Other,
}

/// Platform-agnostic representation of one inbound chat message.
///
/// The `(platform, server)` pair identifies the single live backend that
/// produced the event; `channel` is empty for direct messages. `sender` is
/// preserved in its platform-native form and `text` is already decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    platform: String,
    server: String,
    channel: String,
    sender: String,
    text: String,
    kind: EventKind,
}

impl CanonicalEvent {
    /// Creates a new canonical event.
    pub fn new(
        platform: impl Into<String>,
        server: impl Into<String>,
        channel: impl Into<String>,
        sender: impl Into<String>,
        text: impl Into<String>,
        kind: EventKind,
    ) -> Self {
        Self {
            platform: platform.into(),
            server: server.into(),
            channel: channel.into(),
            sender: sender.into(),
            text: text.into(),
            kind,
        }
    }

    /// Slug of the plugin that produced this event.
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Name of the originating server within that plugin.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Originating room or channel; empty for direct messages.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Display identifier of the author, platform-native form preserved.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Decoded message body.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Event classification.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Whether this event originated in a direct message rather than a
    /// channel.
    pub fn is_direct(&self) -> bool {
        self.channel.is_empty()
    }
}

impl std::fmt::Display for CanonicalEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:?}] {}:{}:{} <{}>",
            self.kind, self.platform, self.server, self.channel, self.sender
        )
    }
}
