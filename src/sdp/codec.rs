//! RTP codec, feedback and header extension descriptions

use std::fmt;

/// An RTP payload mapping (`a=rtpmap`) with its fmtp and feedback lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codec {
    pub payload_type: u8,
    pub name: String,
    pub clock_rate: u32,
    /// Audio channel count
    pub channels: Option<u16>,
    pub fmtp: Option<String>,
    pub feedback: Vec<RtcpFeedback>,
}

impl Codec {
    /// Parse the value of an `a=rtpmap` line: `<pt> <name>/<clock>[/<channels>]`
    pub fn parse_rtpmap(value: &str) -> Option<Self> {
        let (pt, encoding) = value.split_once(' ')?;
        let mut parts = encoding.trim().split('/');
        let name = parts.next()?.to_string();
        let clock_rate = parts.next()?.parse().ok()?;
        let channels = parts.next().and_then(|c| c.parse().ok());

        Some(Self {
            payload_type: pt.parse().ok()?,
            name,
            clock_rate,
            channels,
            fmtp: None,
            feedback: Vec::new(),
        })
    }

    /// Value for an `a=rtpmap` line
    pub fn rtpmap(&self) -> String {
        match self.channels {
            Some(ch) => format!("{} {}/{}/{}", self.payload_type, self.name, self.clock_rate, ch),
            None => format!("{} {}/{}", self.payload_type, self.name, self.clock_rate),
        }
    }

    /// Whether this is a retransmission codec
    pub fn is_rtx(&self) -> bool {
        self.name.eq_ignore_ascii_case("rtx")
    }

    /// Associated payload type of an RTX codec (`apt=` in fmtp)
    pub fn associated_payload_type(&self) -> Option<u8> {
        self.fmtp
            .as_deref()?
            .split(';')
            .find_map(|p| p.trim().strip_prefix("apt="))
            .and_then(|v| v.parse().ok())
    }
}

/// An RTCP feedback mechanism (`a=rtcp-fb:<pt> <id> [<param>...]`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcpFeedback {
    pub id: String,
    pub params: Vec<String>,
}

impl RtcpFeedback {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Parse the part of an rtcp-fb value after the payload type
    pub fn parse(s: &str) -> Self {
        let mut parts = s.split_whitespace();
        let id = parts.next().unwrap_or_default().to_string();
        Self {
            id,
            params: parts.map(str::to_string).collect(),
        }
    }
}

impl fmt::Display for RtcpFeedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)?;
        for p in &self.params {
            write!(f, " {}", p)?;
        }
        Ok(())
    }
}

/// A header extension mapping (`a=extmap:<id>[/<direction>] <uri>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub id: u16,
    pub uri: String,
}

impl Extension {
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split_whitespace();
        let id = parts.next()?.split('/').next()?.parse().ok()?;
        let uri = parts.next()?.to_string();
        Some(Self { id, uri })
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rtpmap() {
        let codec = Codec::parse_rtpmap("111 opus/48000/2").unwrap();
        assert_eq!(codec.payload_type, 111);
        assert_eq!(codec.name, "opus");
        assert_eq!(codec.clock_rate, 48000);
        assert_eq!(codec.channels, Some(2));
        assert_eq!(codec.rtpmap(), "111 opus/48000/2");

        let codec = Codec::parse_rtpmap("96 VP8/90000").unwrap();
        assert_eq!(codec.channels, None);
        assert_eq!(codec.rtpmap(), "96 VP8/90000");

        assert!(Codec::parse_rtpmap("x VP8/90000").is_none());
        assert!(Codec::parse_rtpmap("96").is_none());
    }

    #[test]
    fn test_rtx_apt() {
        let mut rtx = Codec::parse_rtpmap("97 rtx/90000").unwrap();
        rtx.fmtp = Some("apt=96".into());
        assert!(rtx.is_rtx());
        assert_eq!(rtx.associated_payload_type(), Some(96));
    }

    #[test]
    fn test_feedback_display() {
        assert_eq!(RtcpFeedback::parse("nack pli").to_string(), "nack pli");
        assert_eq!(RtcpFeedback::new("ccm").with_param("fir").to_string(), "ccm fir");
        assert_eq!(RtcpFeedback::parse("transport-cc").params.len(), 0);
    }

    #[test]
    fn test_extension_with_direction() {
        let ext = Extension::parse("3/sendonly urn:ietf:params:rtp-hdrext:sdes:mid").unwrap();
        assert_eq!(ext.id, 3);
        assert_eq!(ext.uri, "urn:ietf:params:rtp-hdrext:sdes:mid");
    }
}
