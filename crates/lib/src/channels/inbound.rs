//! Inbound events produced by the connection and consumed once by the router.

use serde::Deserialize;

/// One item from the event stream. The set is closed; wire types the bridge does not
/// act on arrive as [`InboundEvent::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A websocket session was established. Counter starts at 1 and grows per reconnect.
    Connected { connection_count: u32 },
    Message(MessageEvent),
    /// Transport-level failure; the connection manager reconnects on its own.
    ConnectionError { message: String },
    /// The platform rejected the bot token.
    AuthError,
    Other { kind: String },
}

impl InboundEvent {
    /// Short name for logging.
    pub fn kind(&self) -> &str {
        match self {
            InboundEvent::Connected { .. } => "connected",
            InboundEvent::Message(_) => "message",
            InboundEvent::ConnectionError { .. } => "connection_error",
            InboundEvent::AuthError => "invalid_auth",
            InboundEvent::Other { kind } => kind,
        }
    }
}

/// RTM `message` payload (subset). Missing fields deserialize as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageEvent {
    #[serde(rename = "channel", default)]
    pub channel_id: String,
    #[serde(rename = "user", default)]
    pub user_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "ts", default)]
    pub timestamp: String,
    #[serde(default)]
    pub subtype: Option<String>,
}
