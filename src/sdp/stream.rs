//! Media stream grouping
//!
//! A stream is a set of tracks sharing one stream id. Browsers announce the
//! grouping in one of three ways, tried in order for each media section:
//!
//! ```text
//! a=msid:<stream> <track>                       (unified plan)
//! a=ssrc:<ssrc> msid:<stream> <track>           (plan B with msid)
//! a=ssrc:<ssrc> mslabel:<stream>                (legacy plan B)
//! a=ssrc:<ssrc> label:<track>
//! ```

use super::description::{Attribute, Attributes, MediaDescription, MediaKind, SessionDescription};

/// Stream id browsers use for tracks that belong to no stream
const NO_STREAM: &str = "-";

/// One track of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub id: String,
    pub kind: MediaKind,
    /// Media section the track was announced in
    pub mid: Option<String>,
    /// Media SSRC first, then any RTX SSRC
    pub ssrcs: Vec<u32>,
}

impl TrackInfo {
    pub fn new(id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            kind,
            mid: None,
            ssrcs: Vec::new(),
        }
    }

    pub fn with_ssrcs(mut self, ssrcs: Vec<u32>) -> Self {
        self.ssrcs = ssrcs;
        self
    }
}

/// A media stream and its tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub id: String,
    pub tracks: Vec<TrackInfo>,
}

impl StreamInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tracks: Vec::new(),
        }
    }

    pub fn with_track(mut self, track: TrackInfo) -> Self {
        self.tracks.push(track);
        self
    }

    /// Track kinds in announcement order
    pub fn kinds(&self) -> Vec<MediaKind> {
        self.tracks.iter().map(|t| t.kind.clone()).collect()
    }

    pub fn tracks_of<'a>(&'a self, kind: &'a MediaKind) -> impl Iterator<Item = &'a TrackInfo> {
        self.tracks.iter().filter(move |t| &t.kind == kind)
    }

    pub fn has_audio(&self) -> bool {
        self.tracks_of(&MediaKind::Audio).next().is_some()
    }

    pub fn has_video(&self) -> bool {
        self.tracks_of(&MediaKind::Video).next().is_some()
    }
}

/// (stream id, track id) announced by a media section
fn announced_ids(media: &MediaDescription) -> Option<(String, String)> {
    if let Some(msid) = media.attribute("msid") {
        let mut parts = msid.split_whitespace();
        let stream = parts.next()?;
        let track = parts.next().unwrap_or(stream);
        return Some((stream.to_string(), track.to_string()));
    }

    let mut stream = None;
    let mut track = None;
    for value in media.attributes_named("ssrc") {
        let Some((_, source_attr)) = value.split_once(' ') else {
            continue;
        };
        if let Some(msid) = source_attr.strip_prefix("msid:") {
            let mut parts = msid.split_whitespace();
            let s = parts.next()?;
            let t = parts.next().unwrap_or(s);
            return Some((s.to_string(), t.to_string()));
        }
        if let Some(label) = source_attr.strip_prefix("mslabel:") {
            stream.get_or_insert_with(|| label.trim().to_string());
        }
        if let Some(label) = source_attr.strip_prefix("label:") {
            track.get_or_insert_with(|| label.trim().to_string());
        }
    }

    let stream = stream?;
    let track = track.unwrap_or_else(|| format!("{}-{}", stream, media.kind));
    Some((stream, track))
}

impl SessionDescription {
    /// Streams announced by accepted media sections, in first-seen order
    pub fn streams(&self) -> Vec<StreamInfo> {
        let mut streams: Vec<StreamInfo> = Vec::new();

        for media in self.media.iter().filter(|m| !m.is_rejected()) {
            let Some((stream_id, track_id)) = announced_ids(media) else {
                continue;
            };
            if stream_id == NO_STREAM {
                continue;
            }

            let track = TrackInfo {
                id: track_id,
                kind: media.kind.clone(),
                mid: media.mid().map(str::to_string),
                ssrcs: media.ssrcs(),
            };

            match streams.iter_mut().find(|s| s.id == stream_id) {
                Some(stream) => stream.tracks.push(track),
                None => streams.push(StreamInfo::new(stream_id).with_track(track)),
            }
        }

        streams
    }

    /// Stream by id
    pub fn stream(&self, id: &str) -> Option<StreamInfo> {
        self.streams().into_iter().find(|s| s.id == id)
    }

    /// Announce a stream in this description
    ///
    /// Each track goes to the first accepted section of its kind that does not
    /// carry a track yet. Tracks with no free section are skipped.
    pub fn add_stream(&mut self, stream: &StreamInfo) {
        for track in &stream.tracks {
            let Some(media) = self
                .media
                .iter_mut()
                .find(|m| m.kind == track.kind && !m.is_rejected() && !m.has_attribute("msid"))
            else {
                tracing::debug!(
                    stream = %stream.id,
                    track = %track.id,
                    kind = %track.kind,
                    "No free media section for track"
                );
                continue;
            };

            media.push_attribute(Attribute::value(
                "msid",
                format!("{} {}", stream.id, track.id),
            ));
            if track.ssrcs.len() > 1 {
                let group: Vec<String> = track.ssrcs.iter().map(u32::to_string).collect();
                media.push_attribute(Attribute::value(
                    "ssrc-group",
                    format!("FID {}", group.join(" ")),
                ));
            }
            for ssrc in &track.ssrcs {
                media.push_attribute(Attribute::value(
                    "ssrc",
                    format!("{} cname:{}", ssrc, stream.id),
                ));
                media.push_attribute(Attribute::value(
                    "ssrc",
                    format!("{} msid:{} {}", ssrc, stream.id, track.id),
                ));
            }
        }

        if let Some(semantic) = self
            .attributes
            .iter_mut()
            .find(|a| a.key == "msid-semantic")
        {
            let value = semantic.value.get_or_insert_with(|| " WMS".to_string());
            value.push(' ');
            value.push_str(&stream.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdp::test_offers;

    #[test]
    fn test_unified_plan_streams() {
        let sdp = SessionDescription::parse(test_offers::PUBLISH).unwrap();
        let streams = sdp.streams();

        assert_eq!(streams.len(), 1);
        let stream = &streams[0];
        assert_eq!(stream.id, "stream-a");
        assert_eq!(stream.kinds(), vec![MediaKind::Audio, MediaKind::Video]);
        assert_eq!(stream.tracks[1].id, "video-track");
        assert_eq!(stream.tracks[1].mid.as_deref(), Some("1"));
        assert_eq!(stream.tracks[1].ssrcs, vec![2222, 2223]);
    }

    #[test]
    fn test_plan_b_labels() {
        let text = "v=0\r\n\
            o=- 1 1 IN IP4 0.0.0.0\r\n\
            s=-\r\n\
            t=0 0\r\n\
            m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
            a=rtpmap:111 opus/48000/2\r\n\
            a=ssrc:42 cname:x\r\n\
            a=ssrc:42 mslabel:legacy\r\n\
            a=ssrc:42 label:mic\r\n";
        let sdp = SessionDescription::parse(text).unwrap();
        let streams = sdp.streams();

        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].id, "legacy");
        assert_eq!(streams[0].tracks[0].id, "mic");
        assert_eq!(streams[0].tracks[0].ssrcs, vec![42]);
    }

    #[test]
    fn test_watch_offer_has_no_streams() {
        let sdp = SessionDescription::parse(test_offers::WATCH).unwrap();
        assert!(sdp.streams().is_empty());
    }

    #[test]
    fn test_add_stream_assigns_sections_by_kind() {
        let mut sdp = SessionDescription::parse(test_offers::WATCH).unwrap();
        sdp.attributes.push(Attribute::value("msid-semantic", " WMS"));

        let stream = StreamInfo::new("s1")
            .with_track(TrackInfo::new("v", MediaKind::Video).with_ssrcs(vec![10, 11]))
            .with_track(TrackInfo::new("a", MediaKind::Audio).with_ssrcs(vec![20]));
        sdp.add_stream(&stream);

        assert_eq!(sdp.audio().unwrap().attribute("msid"), Some("s1 a"));
        assert_eq!(sdp.video().unwrap().attribute("msid"), Some("s1 v"));
        assert_eq!(sdp.video().unwrap().attribute("ssrc-group"), Some("FID 10 11"));
        assert_eq!(sdp.attribute("msid-semantic"), Some(" WMS s1"));

        let parsed = sdp.stream("s1").unwrap();
        assert_eq!(parsed.kinds(), vec![MediaKind::Audio, MediaKind::Video]);
        assert_eq!(parsed.tracks[1].ssrcs, vec![10, 11]);
    }
}
