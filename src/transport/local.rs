//! In-process media endpoint
//!
//! Performs the bookkeeping a real media engine would (credentials,
//! negotiated media, stream handles) without opening sockets. Packets pushed
//! into an incoming stream reach every attached outgoing stream.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::NegotiationError;
use crate::sdp::{
    DtlsParameters, DtlsSetup, IceCandidate, IceParameters, MediaDescription, MediaKind,
    SessionDescription, StreamInfo, TrackInfo,
};

use super::stream::{IncomingStream, OutgoingStream};
use super::{Endpoint, MediaTransport};

/// Priority of a host candidate for component 1
const HOST_PRIORITY: u32 = 2_130_706_431;

/// Local endpoint configuration
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Address advertised in host candidates
    pub public_host: String,

    /// Media port advertised in host candidates
    pub media_port: u16,

    /// Advertise ICE lite
    pub ice_lite: bool,

    /// Packets buffered per incoming stream before slow receivers lag
    pub stream_capacity: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            public_host: "127.0.0.1".into(),
            media_port: 40000,
            ice_lite: true,
            stream_capacity: 1024,
        }
    }
}

impl EndpointConfig {
    /// Create a config advertising the given host
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            public_host: host.into(),
            ..Default::default()
        }
    }

    /// Set the advertised media port
    pub fn media_port(mut self, port: u16) -> Self {
        self.media_port = port;
        self
    }

    /// Set per-stream packet capacity
    pub fn stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity.max(1);
        self
    }
}

/// In-process endpoint
#[derive(Debug, Clone, Default)]
pub struct LocalEndpoint {
    config: EndpointConfig,
}

impl LocalEndpoint {
    pub fn new(config: EndpointConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }
}

impl Endpoint for LocalEndpoint {
    type Transport = LocalTransport;

    fn create_transport(
        &self,
        offer: &SessionDescription,
    ) -> Result<LocalTransport, NegotiationError> {
        let (ufrag, pwd) = offer
            .ice_credentials()
            .ok_or(NegotiationError::MissingIceCredentials)?;
        let (hash, fingerprint) = offer
            .fingerprint()
            .ok_or(NegotiationError::MissingFingerprint)?;

        let transport = LocalTransport {
            id: random_string(12),
            remote_ice: IceParameters {
                ufrag: ufrag.to_string(),
                pwd: pwd.to_string(),
                lite: false,
            },
            remote_dtls: DtlsParameters {
                hash: hash.to_string(),
                fingerprint: fingerprint.to_string(),
                setup: DtlsSetup::Active,
            },
            local_ice: IceParameters {
                ufrag: random_string(8),
                pwd: random_string(24),
                lite: self.config.ice_lite,
            },
            local_dtls: DtlsParameters {
                hash: "sha-256".into(),
                fingerprint: random_fingerprint(),
                setup: DtlsSetup::Passive,
            },
            stream_capacity: self.config.stream_capacity,
            state: Mutex::new(TransportState::default()),
        };

        tracing::debug!(
            transport = %transport.id,
            remote_ufrag = %transport.remote_ice.ufrag,
            "Transport created"
        );

        Ok(transport)
    }

    fn local_candidates(&self) -> Vec<IceCandidate> {
        vec![IceCandidate::host(
            "1",
            self.config.public_host.clone(),
            self.config.media_port,
            HOST_PRIORITY,
        )]
    }
}

#[derive(Debug, Default)]
struct TransportState {
    remote_audio: Option<MediaDescription>,
    remote_video: Option<MediaDescription>,
    local_audio: Option<MediaDescription>,
    local_video: Option<MediaDescription>,
    remote_set: bool,
    local_set: bool,
    incoming: Vec<Arc<IncomingStream>>,
    outgoing: Vec<Arc<OutgoingStream>>,
    stopped: bool,
}

impl TransportState {
    fn remote_has(&self, kind: &MediaKind) -> bool {
        match kind {
            MediaKind::Audio => self.remote_audio.is_some(),
            MediaKind::Video => self.remote_video.is_some(),
            _ => false,
        }
    }

    fn local_has(&self, kind: &MediaKind) -> bool {
        match kind {
            MediaKind::Audio => self.local_audio.is_some(),
            MediaKind::Video => self.local_video.is_some(),
            _ => false,
        }
    }
}

/// Transport created by [`LocalEndpoint`]
#[derive(Debug)]
pub struct LocalTransport {
    id: String,
    remote_ice: IceParameters,
    remote_dtls: DtlsParameters,
    local_ice: IceParameters,
    local_dtls: DtlsParameters,
    stream_capacity: usize,
    state: Mutex<TransportState>,
}

impl LocalTransport {
    fn state(&self) -> MutexGuard<'_, TransportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_running(&self) -> Result<MutexGuard<'_, TransportState>, NegotiationError> {
        let state = self.state();
        if state.stopped {
            return Err(NegotiationError::TransportStopped);
        }
        Ok(state)
    }

    /// ICE parameters taken from the offer
    pub fn remote_ice(&self) -> &IceParameters {
        &self.remote_ice
    }

    /// DTLS parameters taken from the offer
    pub fn remote_dtls(&self) -> &DtlsParameters {
        &self.remote_dtls
    }

    pub fn is_stopped(&self) -> bool {
        self.state().stopped
    }

    pub fn incoming_count(&self) -> usize {
        self.state().incoming.len()
    }

    pub fn outgoing_count(&self) -> usize {
        self.state().outgoing.len()
    }
}

impl MediaTransport for LocalTransport {
    fn id(&self) -> &str {
        &self.id
    }

    fn local_ice(&self) -> IceParameters {
        self.local_ice.clone()
    }

    fn local_dtls(&self) -> DtlsParameters {
        self.local_dtls.clone()
    }

    fn set_remote_properties(
        &self,
        audio: Option<&MediaDescription>,
        video: Option<&MediaDescription>,
    ) -> Result<(), NegotiationError> {
        let mut state = self.check_running()?;
        state.remote_audio = audio.filter(|m| !m.is_rejected()).cloned();
        state.remote_video = video.filter(|m| !m.is_rejected()).cloned();
        state.remote_set = true;
        Ok(())
    }

    fn set_local_properties(
        &self,
        audio: Option<&MediaDescription>,
        video: Option<&MediaDescription>,
    ) -> Result<(), NegotiationError> {
        let mut state = self.check_running()?;
        state.local_audio = audio.filter(|m| !m.is_rejected()).cloned();
        state.local_video = video.filter(|m| !m.is_rejected()).cloned();
        state.local_set = true;
        Ok(())
    }

    fn create_incoming_stream(
        &self,
        info: &StreamInfo,
    ) -> Result<Arc<IncomingStream>, NegotiationError> {
        let mut state = self.check_running()?;
        if !state.remote_set {
            return Err(NegotiationError::RemotePropertiesNotSet);
        }
        if let Some(track) = info.tracks.iter().find(|t| !state.remote_has(&t.kind)) {
            return Err(NegotiationError::UnsupportedMedia(track.kind.to_string()));
        }

        let stream = Arc::new(IncomingStream::new(info.clone(), self.stream_capacity));
        state.incoming.push(Arc::clone(&stream));

        tracing::debug!(
            transport = %self.id,
            stream = %info.id,
            tracks = info.tracks.len(),
            "Incoming stream created"
        );

        Ok(stream)
    }

    fn create_outgoing_stream(
        &self,
        info: &StreamInfo,
    ) -> Result<Arc<OutgoingStream>, NegotiationError> {
        let mut state = self.check_running()?;
        if !state.local_set {
            return Err(NegotiationError::LocalPropertiesNotSet);
        }

        let mut outgoing = StreamInfo::new(info.id.clone());
        for track in &info.tracks {
            if !state.local_has(&track.kind) {
                tracing::debug!(
                    transport = %self.id,
                    stream = %info.id,
                    kind = %track.kind,
                    "Skipping track with no negotiated media"
                );
                continue;
            }
            outgoing.tracks.push(TrackInfo {
                id: track.id.clone(),
                kind: track.kind.clone(),
                mid: None,
                ssrcs: fresh_ssrcs(track.ssrcs.len().max(1)),
            });
        }

        let stream = Arc::new(OutgoingStream::new(outgoing));
        state.outgoing.push(Arc::clone(&stream));
        Ok(stream)
    }

    fn create_outgoing_stream_with_id(
        &self,
        id: &str,
        audio: bool,
        video: bool,
    ) -> Result<Arc<OutgoingStream>, NegotiationError> {
        let mut info = StreamInfo::new(id);
        if audio {
            info = info.with_track(
                TrackInfo::new(format!("{}-audio", id), MediaKind::Audio).with_ssrcs(vec![0]),
            );
        }
        if video {
            info = info.with_track(
                TrackInfo::new(format!("{}-video", id), MediaKind::Video).with_ssrcs(vec![0, 0]),
            );
        }
        self.create_outgoing_stream(&info)
    }

    fn stop(&self) {
        let mut state = self.state();
        if state.stopped {
            return;
        }
        state.stopped = true;

        for stream in state.outgoing.drain(..) {
            stream.stop();
        }
        for stream in state.incoming.drain(..) {
            stream.stop();
        }

        tracing::debug!(transport = %self.id, "Transport stopped");
    }
}

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn random_fingerprint() -> String {
    let bytes: [u8; 32] = rand::random();
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

fn fresh_ssrcs(count: usize) -> Vec<u32> {
    let mut rng = rand::thread_rng();
    let mut ssrcs = Vec::with_capacity(count);
    while ssrcs.len() < count {
        let ssrc: u32 = rng.gen_range(1..u32::MAX);
        if !ssrcs.contains(&ssrc) {
            ssrcs.push(ssrc);
        }
    }
    ssrcs
}
