use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one live broadcast.
///
/// Stable for the lifetime of the broadcast and used as the registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BroadcastId(String);

impl BroadcastId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id as a single file-name component: colons are dropped and path
    /// separators become `_`.
    pub fn file_stem(&self) -> String {
        self.0
            .chars()
            .filter(|c| *c != ':')
            .map(|c| match c {
                '/' | '\\' | '\0' => '_',
                c => c,
            })
            .collect()
    }
}

impl fmt::Display for BroadcastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BroadcastId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BroadcastId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Metadata describing one broadcast, as reported by live discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastInfo {
    /// Unique broadcast identifier.
    pub id: BroadcastId,
    /// Human-readable broadcast title.
    #[serde(default)]
    pub title: String,
    /// Identifier of the channel hosting the broadcast.
    #[serde(default)]
    pub channel_id: String,
    /// Display name of the channel hosting the broadcast.
    #[serde(default)]
    pub channel_name: String,
    /// Broadcast start time in unix seconds.
    pub start_timestamp: f64,
}

/// A single chat message received during a broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message identifier assigned by the chat source.
    #[serde(default)]
    pub id: String,
    /// Time the message was posted, in unix seconds.
    pub timestamp: f64,
    /// Display name of the author.
    #[serde(default)]
    pub author: String,
    /// Channel id of the author.
    #[serde(default)]
    pub author_channel_id: String,
    /// Message body.
    pub text: String,
}
