//! Server capability set
//!
//! The broker advertises the same capabilities in every answer it builds:
//! which codecs it accepts per media kind, whether RTX is negotiated, and which
//! RTCP feedback mechanisms and header extensions it keeps.

use std::collections::HashMap;

use super::codec::{Codec, Extension, RtcpFeedback};
use super::description::MediaKind;

/// Capabilities for one media kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capability {
    /// Accepted codec names, matched case-insensitively
    pub codecs: Vec<String>,
    /// Negotiate RTX for accepted codecs
    pub rtx: bool,
    pub rtcp_feedback: Vec<RtcpFeedback>,
    /// Header extension URIs
    pub extensions: Vec<String>,
}

impl Capability {
    pub fn new<I, S>(codecs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codecs: codecs.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Enable RTX
    pub fn rtx(mut self) -> Self {
        self.rtx = true;
        self
    }

    pub fn feedback(mut self, feedback: RtcpFeedback) -> Self {
        self.rtcp_feedback.push(feedback);
        self
    }

    pub fn extension(mut self, uri: impl Into<String>) -> Self {
        self.extensions.push(uri.into());
        self
    }

    pub fn supports_codec(&self, codec: &Codec) -> bool {
        self.codecs.iter().any(|c| c.eq_ignore_ascii_case(&codec.name))
    }

    pub fn supports_feedback(&self, feedback: &RtcpFeedback) -> bool {
        self.rtcp_feedback.contains(feedback)
    }

    pub fn supports_extension(&self, extension: &Extension) -> bool {
        self.extensions.iter().any(|uri| *uri == extension.uri)
    }
}

/// Capability table keyed by media kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    by_kind: HashMap<MediaKind, Capability>,
}

impl Capabilities {
    /// Create an empty table (every media section will be rejected)
    pub fn empty() -> Self {
        Self {
            by_kind: HashMap::new(),
        }
    }

    /// Set the capability for a media kind
    pub fn with(mut self, kind: MediaKind, capability: Capability) -> Self {
        self.by_kind.insert(kind, capability);
        self
    }

    pub fn get(&self, kind: &MediaKind) -> Option<&Capability> {
        self.by_kind.get(kind)
    }

    /// Opus audio with H.264 video, for encoders that only emit H.264
    pub fn h264() -> Self {
        Self::empty()
            .with(MediaKind::Audio, Capability::new(["opus"]))
            .with(
                MediaKind::Video,
                Capability::new(["h264"])
                    .rtx()
                    .feedback(RtcpFeedback::new("transport-cc"))
                    .feedback(RtcpFeedback::new("ccm").with_param("fir"))
                    .feedback(RtcpFeedback::new("nack").with_param("pli"))
                    .extension("urn:3gpp:video-orientation")
                    .extension(
                        "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01",
                    )
                    .extension("http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time"),
            )
    }
}

impl Default for Capabilities {
    /// Opus audio with VP8 video
    fn default() -> Self {
        Self::empty()
            .with(MediaKind::Audio, Capability::new(["opus"]))
            .with(
                MediaKind::Video,
                Capability::new(["vp8"])
                    .rtx()
                    .feedback(RtcpFeedback::new("goog-remb"))
                    .feedback(RtcpFeedback::new("transport-cc"))
                    .feedback(RtcpFeedback::new("ccm").with_param("fir"))
                    .feedback(RtcpFeedback::new("nack").with_param("pli"))
                    .extension("urn:3gpp:video-orientation")
                    .extension(
                        "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01",
                    )
                    .extension("http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time")
                    .extension("urn:ietf:params:rtp-hdrext:toffse")
                    .extension("urn:ietf:params:rtp-hdrext:sdes:rtp-stream-id")
                    .extension("urn:ietf:params:rtp-hdrext:sdes:mid"),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let caps = Capabilities::default();

        let audio = caps.get(&MediaKind::Audio).unwrap();
        assert_eq!(audio.codecs, vec!["opus".to_string()]);
        assert!(!audio.rtx);

        let video = caps.get(&MediaKind::Video).unwrap();
        assert!(video.rtx);
        assert_eq!(video.rtcp_feedback.len(), 4);
        assert_eq!(video.extensions.len(), 6);
        assert!(caps.get(&MediaKind::Application).is_none());
    }

    #[test]
    fn test_codec_match_ignores_case() {
        let cap = Capability::new(["vp8"]);
        let codec = Codec::parse_rtpmap("96 VP8/90000").unwrap();
        assert!(cap.supports_codec(&codec));

        let h264 = Codec::parse_rtpmap("102 H264/90000").unwrap();
        assert!(!cap.supports_codec(&h264));
        assert!(Capabilities::h264()
            .get(&MediaKind::Video)
            .unwrap()
            .supports_codec(&h264));
    }
}
