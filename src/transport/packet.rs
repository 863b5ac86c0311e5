//! Media packets forwarded between streams

use bytes::Bytes;

use crate::sdp::MediaKind;

/// An opaque media packet (typically one RTP packet)
///
/// This is designed to be cheap to clone due to `Bytes` reference counting.
/// Attached outgoing streams share the publisher's allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPacket {
    /// Kind of the track the packet belongs to
    pub kind: MediaKind,
    /// Packet payload (zero-copy via reference counting)
    pub payload: Bytes,
}

impl MediaPacket {
    /// Create an audio packet
    pub fn audio(payload: Bytes) -> Self {
        Self {
            kind: MediaKind::Audio,
            payload,
        }
    }

    /// Create a video packet
    pub fn video(payload: Bytes) -> Self {
        Self {
            kind: MediaKind::Video,
            payload,
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
