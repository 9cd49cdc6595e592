//! Chat platform message events.
//!
//! A [`ChannelMessage`] is one message seen on a chat platform (a Discord
//! event relayed to the gateway, for instance), before it is mapped onto a
//! pipeline request.

use serde::{Deserialize, Serialize};

/// Unique identifier for a channel instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message received from or sent to a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// The channel this message belongs to
    pub channel_id: ChannelId,

    /// Sender identifier (platform-specific user ID)
    pub sender_id: String,

    /// Human-readable sender name (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,

    /// The text content
    pub content: String,

    /// The chat/group/DM identifier within the channel
    pub chat_id: String,

    /// The platform message ID, used to thread replies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    /// Platform-specific metadata (guild, mentions, bot flag, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ChannelMessage {
    /// Read a string metadata field, ignoring empty values.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}
