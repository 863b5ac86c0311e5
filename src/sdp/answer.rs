//! Answer construction
//!
//! An answer mirrors the offer's media sections one to one. For each section
//! the broker keeps only what both the offer and its capability set allow:
//!
//! - codecs whose name is in the capability list, plus their RTX companions
//!   when RTX is enabled
//! - RTCP feedback present in both
//! - header extensions whose URI is advertised (offered ids are kept)
//!
//! Sections with no capability or no common codec are rejected with port 0.

use std::fmt;

use super::capability::Capabilities;
use super::codec::Codec;
use super::description::{Attribute, Attributes, MediaDescription, Origin, SessionDescription};

/// Port used in every accepted section; real addresses travel in candidates
const DISCARD_PORT: u16 = 9;

/// Local ICE parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceParameters {
    pub ufrag: String,
    pub pwd: String,
    /// Advertise `a=ice-lite`
    pub lite: bool,
}

/// DTLS role (`a=setup`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtlsSetup {
    Active,
    Passive,
    ActPass,
}

impl DtlsSetup {
    pub fn as_str(&self) -> &'static str {
        match self {
            DtlsSetup::Active => "active",
            DtlsSetup::Passive => "passive",
            DtlsSetup::ActPass => "actpass",
        }
    }
}

/// Local DTLS parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtlsParameters {
    /// Hash function name, e.g. `sha-256`
    pub hash: String,
    /// Colon-separated uppercase hex digest
    pub fingerprint: String,
    pub setup: DtlsSetup,
}

/// A host ICE candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    pub foundation: String,
    pub component: u16,
    pub transport: String,
    pub priority: u32,
    pub address: String,
    pub port: u16,
}

impl IceCandidate {
    /// UDP host candidate for RTP (component 1)
    pub fn host(
        foundation: impl Into<String>,
        address: impl Into<String>,
        port: u16,
        priority: u32,
    ) -> Self {
        Self {
            foundation: foundation.into(),
            component: 1,
            transport: "UDP".into(),
            priority,
            address: address.into(),
            port,
        }
    }
}

impl fmt::Display for IceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} typ host",
            self.foundation, self.component, self.transport, self.priority, self.address, self.port
        )
    }
}

impl SessionDescription {
    /// Build an answer to this offer
    pub fn answer(
        &self,
        ice: &IceParameters,
        dtls: &DtlsParameters,
        candidates: &[IceCandidate],
        capabilities: &Capabilities,
    ) -> SessionDescription {
        let mut answer = SessionDescription {
            origin: Origin {
                session_id: u64::from(rand::random::<u32>()),
                ..Origin::default()
            },
            ..SessionDescription::default()
        };

        if ice.lite {
            answer.attributes.push(Attribute::property("ice-lite"));
        }

        answer.media = self
            .media
            .iter()
            .map(|offered| answer_media(offered, ice, dtls, candidates, capabilities))
            .collect();

        let mids = answer.accepted_mids().join(" ");
        if !mids.is_empty() {
            answer
                .attributes
                .push(Attribute::value("group", format!("BUNDLE {}", mids)));
        }
        answer
            .attributes
            .push(Attribute::value("msid-semantic", " WMS"));

        answer
    }
}

fn answer_media(
    offered: &MediaDescription,
    ice: &IceParameters,
    dtls: &DtlsParameters,
    candidates: &[IceCandidate],
    capabilities: &Capabilities,
) -> MediaDescription {
    let Some(capability) = capabilities.get(&offered.kind) else {
        return reject(offered);
    };
    if offered.is_rejected() {
        return reject(offered);
    }

    let offered_codecs = offered.codecs();
    let mut selected: Vec<Codec> = offered_codecs
        .iter()
        .filter(|c| !c.is_rtx() && capability.supports_codec(c))
        .cloned()
        .collect();

    if selected.is_empty() {
        tracing::debug!(kind = %offered.kind, "No common codec, rejecting media section");
        return reject(offered);
    }

    if capability.rtx {
        let rtx: Vec<Codec> = offered_codecs
            .iter()
            .filter(|c| c.is_rtx())
            .filter(|c| {
                c.associated_payload_type()
                    .is_some_and(|apt| selected.iter().any(|s| s.payload_type == apt))
            })
            .cloned()
            .collect();
        selected.extend(rtx);
    }

    let mut media =
        MediaDescription::new(offered.kind.clone(), DISCARD_PORT, offered.protocol.clone());
    media.formats = selected.iter().map(|c| c.payload_type.to_string()).collect();
    media.connection = Some("IN IP4 0.0.0.0".into());

    if let Some(mid) = offered.mid() {
        media.push_attribute(Attribute::value("mid", mid));
    }
    media.push_attribute(Attribute::property(offered.direction().reverse().as_str()));
    media.push_attribute(Attribute::property("rtcp-mux"));
    if offered.has_attribute("rtcp-rsize") {
        media.push_attribute(Attribute::property("rtcp-rsize"));
    }
    media.push_attribute(Attribute::value("ice-ufrag", ice.ufrag.clone()));
    media.push_attribute(Attribute::value("ice-pwd", ice.pwd.clone()));
    media.push_attribute(Attribute::value(
        "fingerprint",
        format!("{} {}", dtls.hash, dtls.fingerprint),
    ));
    media.push_attribute(Attribute::value("setup", dtls.setup.as_str()));

    for ext in offered
        .extensions()
        .iter()
        .filter(|e| capability.supports_extension(e))
    {
        media.push_attribute(Attribute::value("extmap", ext.to_string()));
    }

    for codec in &selected {
        media.push_attribute(Attribute::value("rtpmap", codec.rtpmap()));
        if !codec.is_rtx() {
            for fb in codec
                .feedback
                .iter()
                .filter(|fb| capability.supports_feedback(fb))
            {
                media.push_attribute(Attribute::value(
                    "rtcp-fb",
                    format!("{} {}", codec.payload_type, fb),
                ));
            }
        }
        if let Some(ref fmtp) = codec.fmtp {
            media.push_attribute(Attribute::value(
                "fmtp",
                format!("{} {}", codec.payload_type, fmtp),
            ));
        }
    }

    for candidate in candidates {
        media.push_attribute(Attribute::value("candidate", candidate.to_string()));
    }
    if !candidates.is_empty() {
        media.push_attribute(Attribute::property("end-of-candidates"));
    }

    media
}

fn reject(offered: &MediaDescription) -> MediaDescription {
    let mut media = MediaDescription::new(offered.kind.clone(), 0, offered.protocol.clone());
    media.formats = offered.formats.iter().take(1).cloned().collect();
    if let Some(mid) = offered.mid() {
        media.push_attribute(Attribute::value("mid", mid));
    }
    media.push_attribute(Attribute::property("inactive"));
    media
}
