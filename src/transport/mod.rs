//! Media transport adapter
//!
//! The broker does not establish ICE, DTLS or SRTP itself. It drives a media
//! engine through two traits:
//!
//! - [`Endpoint`]: shared factory creating one transport per negotiation
//! - [`MediaTransport`]: one negotiated peer connection
//!
//! All calls are synchronous and fail with [`NegotiationError`], which ends
//! the calling session. [`LocalEndpoint`] is an in-process implementation
//! that forwards packets between attached streams.

pub mod local;
pub mod packet;
pub mod stream;

use std::sync::Arc;

use crate::error::NegotiationError;
use crate::sdp::{
    DtlsParameters, IceCandidate, IceParameters, MediaDescription, SessionDescription, StreamInfo,
};

pub use local::{EndpointConfig, LocalEndpoint, LocalTransport};
pub use packet::MediaPacket;
pub use stream::{IncomingStream, OutgoingStream};

/// Factory for media transports
pub trait Endpoint: Send + Sync + 'static {
    type Transport: MediaTransport;

    /// Create a transport for the remote peer described by `offer`
    fn create_transport(
        &self,
        offer: &SessionDescription,
    ) -> Result<Self::Transport, NegotiationError>;

    /// Candidates advertised in every answer
    fn local_candidates(&self) -> Vec<IceCandidate>;
}

/// One negotiated peer connection
pub trait MediaTransport: Send + Sync + 'static {
    /// Transport identifier (for logging)
    fn id(&self) -> &str;

    fn local_ice(&self) -> IceParameters;

    fn local_dtls(&self) -> DtlsParameters;

    /// Apply the remote peer's negotiated media sections
    fn set_remote_properties(
        &self,
        audio: Option<&MediaDescription>,
        video: Option<&MediaDescription>,
    ) -> Result<(), NegotiationError>;

    /// Apply our own negotiated media sections
    fn set_local_properties(
        &self,
        audio: Option<&MediaDescription>,
        video: Option<&MediaDescription>,
    ) -> Result<(), NegotiationError>;

    /// Create a handle for media the remote peer sends
    fn create_incoming_stream(
        &self,
        info: &StreamInfo,
    ) -> Result<Arc<IncomingStream>, NegotiationError>;

    /// Create a handle for media sent to the remote peer, cloned from an
    /// existing stream's description
    fn create_outgoing_stream(
        &self,
        info: &StreamInfo,
    ) -> Result<Arc<OutgoingStream>, NegotiationError>;

    /// Create a fresh outgoing stream with one track per enabled kind
    fn create_outgoing_stream_with_id(
        &self,
        id: &str,
        audio: bool,
        video: bool,
    ) -> Result<Arc<OutgoingStream>, NegotiationError>;

    /// Release the transport and every stream created on it
    fn stop(&self);
}
