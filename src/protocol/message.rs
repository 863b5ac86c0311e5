//! Signaling message types
//!
//! One JSON object per WebSocket frame:
//!
//! ```text
//! {"cmd": "publish-offer", "sdp": "v=0..."}
//! {"cmd": "watch-offer",   "sdp": "v=0...", "stream": "<stream id>"}
//! {"cmd": "answer",        "sdp": "v=0..."}
//! ```
//!
//! Older clients send `publish` and `watch`; both are accepted on input.
//! Any other `cmd` (trickled candidates, keepalives) decodes as
//! [`Command::Unknown`] so the session can skip it.

use serde::{Deserialize, Serialize};

/// Signaling command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    /// Offer to publish the streams it describes
    #[serde(alias = "publish")]
    PublishOffer,
    /// Offer to watch the stream named in `stream`
    #[serde(alias = "watch")]
    WatchOffer,
    /// Server reply to either offer
    Answer,
    /// Command this broker does not handle
    #[serde(other)]
    Unknown,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::PublishOffer => "publish-offer",
            Command::WatchOffer => "watch-offer",
            Command::Answer => "answer",
            Command::Unknown => "unknown",
        }
    }
}

/// A signaling frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalingMessage {
    pub cmd: Command,

    /// Session description text
    #[serde(default)]
    pub sdp: String,

    /// Target stream id (watch requests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
}

impl SignalingMessage {
    /// Create a publish offer
    pub fn publish_offer(sdp: impl Into<String>) -> Self {
        Self {
            cmd: Command::PublishOffer,
            sdp: sdp.into(),
            stream: None,
        }
    }

    /// Create a watch offer for `stream`
    pub fn watch_offer(sdp: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            cmd: Command::WatchOffer,
            sdp: sdp.into(),
            stream: Some(stream.into()),
        }
    }

    /// Create an answer
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            cmd: Command::Answer,
            sdp: sdp.into(),
            stream: None,
        }
    }

    /// Decode a frame
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Encode as a frame
    pub fn to_json(&self) -> String {
        // Plain structs with string fields always serialize
        serde_json::to_string(self).unwrap_or_default()
    }
}
