//! Session description model, parser and serializer
//!
//! Lines are `<type>=<value>`. Everything before the first `m=` line belongs to
//! the session; everything after belongs to the most recent media section.
//!
//! ```text
//! v=0
//! o=- 4215775240449105457 2 IN IP4 127.0.0.1
//! s=-
//! t=0 0
//! a=group:BUNDLE 0 1
//! m=audio 9 UDP/TLS/RTP/SAVPF 111
//! c=IN IP4 0.0.0.0
//! a=mid:0
//! a=rtpmap:111 opus/48000/2
//! ```
//!
//! Line types the broker does not interpret (`i=`, `b=`, `k=`...) are kept in
//! order and written back out unchanged.

use std::fmt;
use std::str::FromStr;

use crate::error::SdpError;

use super::codec::{Codec, Extension, RtcpFeedback};

/// Media section kind (`m=<kind> ...`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
    Application,
    Other(String),
}

impl MediaKind {
    pub fn as_str(&self) -> &str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Application => "application",
            MediaKind::Other(s) => s,
        }
    }
}

impl From<&str> for MediaKind {
    fn from(s: &str) -> Self {
        match s {
            "audio" => MediaKind::Audio,
            "video" => MediaKind::Video,
            "application" => MediaKind::Application,
            other => MediaKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media direction attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    SendRecv,
    SendOnly,
    RecvOnly,
    Inactive,
}

impl Direction {
    const ALL: [Direction; 4] = [
        Direction::SendRecv,
        Direction::SendOnly,
        Direction::RecvOnly,
        Direction::Inactive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::SendRecv => "sendrecv",
            Direction::SendOnly => "sendonly",
            Direction::RecvOnly => "recvonly",
            Direction::Inactive => "inactive",
        }
    }

    /// Direction as seen from the other end
    pub fn reverse(self) -> Self {
        match self {
            Direction::SendOnly => Direction::RecvOnly,
            Direction::RecvOnly => Direction::SendOnly,
            other => other,
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == key)
    }
}

/// A single `a=` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: Option<String>,
}

impl Attribute {
    /// Property attribute (`a=rtcp-mux`)
    pub fn property(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    /// Value attribute (`a=mid:0`)
    pub fn value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    fn parse(s: &str) -> Self {
        match s.split_once(':') {
            Some((key, value)) => Self::value(key, value),
            None => Self::property(s),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}:{}", self.key, value),
            None => f.write_str(&self.key),
        }
    }
}

/// Lookup helpers shared by session-level and media-level attribute lists
pub trait Attributes {
    fn attribute_list(&self) -> &[Attribute];

    /// Value of the first attribute with this key
    fn attribute(&self, key: &str) -> Option<&str> {
        self.attribute_list()
            .iter()
            .find(|a| a.key == key)
            .and_then(|a| a.value.as_deref())
    }

    /// Values of every attribute with this key
    fn attributes_named<'a>(&'a self, key: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        Box::new(
            self.attribute_list()
                .iter()
                .filter(move |a| a.key == key)
                .filter_map(|a| a.value.as_deref()),
        )
    }

    fn has_attribute(&self, key: &str) -> bool {
        self.attribute_list().iter().any(|a| a.key == key)
    }
}

/// `o=` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub username: String,
    pub session_id: u64,
    pub session_version: u64,
    pub network_type: String,
    pub address_type: String,
    pub address: String,
}

impl Default for Origin {
    fn default() -> Self {
        Self {
            username: "-".into(),
            session_id: 0,
            session_version: 2,
            network_type: "IN".into(),
            address_type: "IP4".into(),
            address: "127.0.0.1".into(),
        }
    }
}

impl FromStr for Origin {
    type Err = SdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        if fields.len() < 6 {
            return Err(SdpError::InvalidOrigin(s.to_string()));
        }

        Ok(Self {
            username: fields[0].to_string(),
            session_id: parse_number(fields[1])?,
            session_version: parse_number(fields[2])?,
            network_type: fields[3].to_string(),
            address_type: fields[4].to_string(),
            address: fields[5].to_string(),
        })
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.username,
            self.session_id,
            self.session_version,
            self.network_type,
            self.address_type,
            self.address
        )
    }
}

/// One `m=` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescription {
    pub kind: MediaKind,
    /// Port 0 marks a rejected section
    pub port: u16,
    pub protocol: String,
    /// Payload types (or other format tokens) in preference order
    pub formats: Vec<String>,
    /// `c=` line value
    pub connection: Option<String>,
    /// Uninterpreted lines (`b=`, `i=`, ...) in order
    pub other_lines: Vec<(char, String)>,
    pub attributes: Vec<Attribute>,
}

impl Attributes for MediaDescription {
    fn attribute_list(&self) -> &[Attribute] {
        &self.attributes
    }
}

impl MediaDescription {
    /// Create an empty section
    pub fn new(kind: MediaKind, port: u16, protocol: impl Into<String>) -> Self {
        Self {
            kind,
            port,
            protocol: protocol.into(),
            formats: Vec::new(),
            connection: None,
            other_lines: Vec::new(),
            attributes: Vec::new(),
        }
    }

    fn parse_media_line(value: &str) -> Result<Self, SdpError> {
        let mut fields = value.split_whitespace();
        let (kind, port, protocol) = match (fields.next(), fields.next(), fields.next()) {
            (Some(kind), Some(port), Some(protocol)) => (kind, port, protocol),
            _ => return Err(SdpError::InvalidMediaLine(value.to_string())),
        };

        // Port may carry a count suffix ("9/2")
        let port = port.split('/').next().unwrap_or(port);

        let mut media = Self::new(MediaKind::from(kind), parse_number(port)?, protocol);
        media.formats = fields.map(str::to_string).collect();
        Ok(media)
    }

    pub fn push_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Whether the section was rejected (port 0)
    pub fn is_rejected(&self) -> bool {
        self.port == 0
    }

    pub fn mid(&self) -> Option<&str> {
        self.attribute("mid")
    }

    /// Direction attribute, `sendrecv` when absent
    pub fn direction(&self) -> Direction {
        self.attributes
            .iter()
            .find_map(|a| Direction::from_key(&a.key))
            .unwrap_or(Direction::SendRecv)
    }

    /// Replace any direction attribute with `direction`
    pub fn set_direction(&mut self, direction: Direction) {
        match self
            .attributes
            .iter_mut()
            .find(|a| Direction::from_key(&a.key).is_some())
        {
            Some(attr) => *attr = Attribute::property(direction.as_str()),
            None => self.push_attribute(Attribute::property(direction.as_str())),
        }
    }

    /// Codecs in `m=` line order, with rtpmap, fmtp and rtcp-fb applied
    pub fn codecs(&self) -> Vec<Codec> {
        let mut codecs: Vec<Codec> = self
            .formats
            .iter()
            .filter_map(|fmt| fmt.parse::<u8>().ok())
            .filter_map(|pt| {
                self.attributes_named("rtpmap")
                    .filter_map(|v| Codec::parse_rtpmap(v))
                    .find(|c| c.payload_type == pt)
            })
            .collect();

        for value in self.attributes_named("fmtp") {
            if let Some((pt, params)) = value.split_once(' ') {
                if let Some(codec) = codecs
                    .iter_mut()
                    .find(|c| pt.parse::<u8>().ok() == Some(c.payload_type))
                {
                    codec.fmtp = Some(params.trim().to_string());
                }
            }
        }

        for value in self.attributes_named("rtcp-fb") {
            let Some((pt, feedback)) = value.split_once(' ') else {
                continue;
            };
            let feedback = RtcpFeedback::parse(feedback);
            for codec in codecs.iter_mut() {
                if pt == "*" || pt.parse::<u8>().ok() == Some(codec.payload_type) {
                    codec.feedback.push(feedback.clone());
                }
            }
        }

        codecs
    }

    /// Codec by name, case-insensitive
    pub fn codec(&self, name: &str) -> Option<Codec> {
        self.codecs()
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Header extensions (`a=extmap`)
    pub fn extensions(&self) -> Vec<Extension> {
        self.attributes_named("extmap")
            .filter_map(Extension::parse)
            .collect()
    }

    /// SSRCs mentioned by `a=ssrc` lines, in first-seen order
    pub fn ssrcs(&self) -> Vec<u32> {
        let mut ssrcs = Vec::new();
        for value in self.attributes_named("ssrc") {
            let id = value.split(' ').next().and_then(|s| s.parse::<u32>().ok());
            if let Some(id) = id {
                if !ssrcs.contains(&id) {
                    ssrcs.push(id);
                }
            }
        }
        ssrcs
    }

    fn write_to(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m={} {} {}", self.kind, self.port, self.protocol)?;
        for fmt in &self.formats {
            write!(f, " {}", fmt)?;
        }
        f.write_str("\r\n")?;
        for (kind, value) in self.other_lines.iter().filter(|(k, _)| *k == 'i') {
            write!(f, "{}={}\r\n", kind, value)?;
        }
        if let Some(ref c) = self.connection {
            write!(f, "c={}\r\n", c)?;
        }
        for (kind, value) in self.other_lines.iter().filter(|(k, _)| *k != 'i') {
            write!(f, "{}={}\r\n", kind, value)?;
        }
        for attr in &self.attributes {
            write!(f, "a={}\r\n", attr)?;
        }
        Ok(())
    }
}

/// A complete session description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub version: u32,
    pub origin: Origin,
    pub name: String,
    pub connection: Option<String>,
    /// `t=` line value
    pub timing: String,
    pub other_lines: Vec<(char, String)>,
    pub attributes: Vec<Attribute>,
    pub media: Vec<MediaDescription>,
}

impl Attributes for SessionDescription {
    fn attribute_list(&self) -> &[Attribute] {
        &self.attributes
    }
}

impl Default for SessionDescription {
    fn default() -> Self {
        Self {
            version: 0,
            origin: Origin::default(),
            name: "-".into(),
            connection: None,
            timing: "0 0".into(),
            other_lines: Vec::new(),
            attributes: Vec::new(),
            media: Vec::new(),
        }
    }
}

impl SessionDescription {
    /// Parse SDP text
    pub fn parse(text: &str) -> Result<Self, SdpError> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .enumerate()
            .filter(|(_, l)| !l.is_empty());

        let mut sdp = SessionDescription::default();

        match lines.next() {
            Some((_, first)) => match first.strip_prefix("v=") {
                Some(v) => sdp.version = parse_number(v)?,
                None => return Err(SdpError::MissingVersion),
            },
            None => return Err(SdpError::Empty),
        }

        let mut current: Option<MediaDescription> = None;

        for (index, line) in lines {
            let (kind, value) = split_line(line).ok_or_else(|| SdpError::InvalidLine {
                line: index + 1,
                content: line.to_string(),
            })?;

            if kind == 'm' {
                if let Some(media) = current.take() {
                    sdp.media.push(media);
                }
                current = Some(MediaDescription::parse_media_line(value)?);
                continue;
            }

            match current.as_mut() {
                Some(media) => match kind {
                    'c' => media.connection = Some(value.to_string()),
                    'a' => media.push_attribute(Attribute::parse(value)),
                    _ => media.other_lines.push((kind, value.to_string())),
                },
                None => match kind {
                    'o' => sdp.origin = value.parse()?,
                    's' => sdp.name = value.to_string(),
                    't' => sdp.timing = value.to_string(),
                    'c' => sdp.connection = Some(value.to_string()),
                    'a' => sdp.attributes.push(Attribute::parse(value)),
                    _ => sdp.other_lines.push((kind, value.to_string())),
                },
            }
        }

        if let Some(media) = current {
            sdp.media.push(media);
        }

        Ok(sdp)
    }

    /// First section of the given kind
    pub fn media(&self, kind: &MediaKind) -> Option<&MediaDescription> {
        self.media.iter().find(|m| &m.kind == kind)
    }

    pub fn audio(&self) -> Option<&MediaDescription> {
        self.media(&MediaKind::Audio)
    }

    pub fn video(&self) -> Option<&MediaDescription> {
        self.media(&MediaKind::Video)
    }

    /// Session attribute, falling back to the first media section carrying it
    pub fn attribute_anywhere(&self, key: &str) -> Option<&str> {
        self.attribute(key)
            .or_else(|| self.media.iter().find_map(|m| m.attribute(key)))
    }

    /// Remote ICE ufrag and password
    pub fn ice_credentials(&self) -> Option<(&str, &str)> {
        Some((
            self.attribute_anywhere("ice-ufrag")?,
            self.attribute_anywhere("ice-pwd")?,
        ))
    }

    /// Remote DTLS fingerprint as (hash function, value)
    pub fn fingerprint(&self) -> Option<(&str, &str)> {
        self.attribute_anywhere("fingerprint")
            .and_then(|v| v.split_once(' '))
    }

    /// Media ids of accepted sections
    pub fn accepted_mids(&self) -> Vec<&str> {
        self.media
            .iter()
            .filter(|m| !m.is_rejected())
            .filter_map(|m| m.mid())
            .collect()
    }
}

impl FromStr for SessionDescription {
    type Err = SdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v={}\r\n", self.version)?;
        write!(f, "o={}\r\n", self.origin)?;
        write!(f, "s={}\r\n", self.name)?;
        for (kind, value) in self.other_lines.iter().filter(|(k, _)| "iuep".contains(*k)) {
            write!(f, "{}={}\r\n", kind, value)?;
        }
        if let Some(ref c) = self.connection {
            write!(f, "c={}\r\n", c)?;
        }
        for (kind, value) in self.other_lines.iter().filter(|(k, _)| *k == 'b') {
            write!(f, "{}={}\r\n", kind, value)?;
        }
        write!(f, "t={}\r\n", self.timing)?;
        for (kind, value) in self
            .other_lines
            .iter()
            .filter(|(k, _)| !"iuepb".contains(*k))
        {
            write!(f, "{}={}\r\n", kind, value)?;
        }
        for attr in &self.attributes {
            write!(f, "a={}\r\n", attr)?;
        }
        for media in &self.media {
            media.write_to(f)?;
        }
        Ok(())
    }
}

fn split_line(line: &str) -> Option<(char, &str)> {
    let mut chars = line.chars();
    let kind = chars.next()?;
    if chars.next()? != '=' || !kind.is_ascii_alphabetic() {
        return None;
    }
    Some((kind, &line[2..]))
}

fn parse_number<T: FromStr>(s: &str) -> Result<T, SdpError> {
    s.trim()
        .parse()
        .map_err(|_| SdpError::InvalidNumber(s.to_string()))
}
