//! Error types
//!
//! Every error here is scoped to one signaling session. Nothing in the
//! broker turns a session failure into a process failure.

use std::fmt;
use std::io;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Offer could not be parsed as SDP
    MalformedOffer(SdpError),
    /// Transport creation or property application failed
    Negotiation(NegotiationError),
    /// Message channel closed or delivered a bad frame
    Channel(ChannelError),
    /// Socket-level failure
    Io(io::Error),
    /// WebSocket upgrade failed
    Handshake(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedOffer(e) => write!(f, "Malformed offer: {}", e),
            Error::Negotiation(e) => write!(f, "Negotiation failed: {}", e),
            Error::Channel(e) => write!(f, "Channel error: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Handshake(msg) => write!(f, "WebSocket handshake failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MalformedOffer(e) => Some(e),
            Error::Negotiation(e) => Some(e),
            Error::Channel(e) => Some(e),
            Error::Io(e) => Some(e),
            Error::Handshake(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<SdpError> for Error {
    fn from(e: SdpError) -> Self {
        Error::MalformedOffer(e)
    }
}

impl From<NegotiationError> for Error {
    fn from(e: NegotiationError) -> Self {
        Error::Negotiation(e)
    }
}

impl From<ChannelError> for Error {
    fn from(e: ChannelError) -> Self {
        Error::Channel(e)
    }
}

/// SDP parse errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdpError {
    /// Input contained no lines
    Empty,
    /// First line was not a `v=` line
    MissingVersion,
    /// Line is not of the form `<type>=<value>`
    InvalidLine { line: usize, content: String },
    /// `m=` line has too few fields
    InvalidMediaLine(String),
    /// `o=` line has too few fields
    InvalidOrigin(String),
    /// Numeric field failed to parse
    InvalidNumber(String),
}

impl fmt::Display for SdpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdpError::Empty => write!(f, "empty session description"),
            SdpError::MissingVersion => write!(f, "session description must start with v="),
            SdpError::InvalidLine { line, content } => {
                write!(f, "invalid line {}: {:?}", line, content)
            }
            SdpError::InvalidMediaLine(s) => write!(f, "invalid media line: {:?}", s),
            SdpError::InvalidOrigin(s) => write!(f, "invalid origin line: {:?}", s),
            SdpError::InvalidNumber(s) => write!(f, "invalid number: {:?}", s),
        }
    }
}

impl std::error::Error for SdpError {}

/// Media transport negotiation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    /// Offer carried no ICE ufrag/pwd
    MissingIceCredentials,
    /// Offer carried no DTLS fingerprint
    MissingFingerprint,
    /// Stream creation attempted before remote properties were applied
    RemotePropertiesNotSet,
    /// Stream creation attempted before local properties were applied
    LocalPropertiesNotSet,
    /// Track kind has no negotiated media section
    UnsupportedMedia(String),
    /// Transport has been stopped
    TransportStopped,
    /// Stream has been stopped
    StreamStopped(String),
}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationError::MissingIceCredentials => write!(f, "offer has no ICE credentials"),
            NegotiationError::MissingFingerprint => write!(f, "offer has no DTLS fingerprint"),
            NegotiationError::RemotePropertiesNotSet => write!(f, "remote properties not set"),
            NegotiationError::LocalPropertiesNotSet => write!(f, "local properties not set"),
            NegotiationError::UnsupportedMedia(kind) => {
                write!(f, "no negotiated media for kind {}", kind)
            }
            NegotiationError::TransportStopped => write!(f, "transport stopped"),
            NegotiationError::StreamStopped(id) => write!(f, "stream stopped: {}", id),
        }
    }
}

impl std::error::Error for NegotiationError {}

/// Message channel errors
///
/// All variants end the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Peer closed the connection
    Closed,
    /// Frame was not a valid signaling message
    Malformed(String),
    /// Underlying transport failed
    Transport(String),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Closed => write!(f, "channel closed"),
            ChannelError::Malformed(msg) => write!(f, "malformed frame: {}", msg),
            ChannelError::Transport(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

impl std::error::Error for ChannelError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        let err: Error = SdpError::Empty.into();
        assert!(matches!(err, Error::MalformedOffer(SdpError::Empty)));

        let err: Error = NegotiationError::MissingFingerprint.into();
        assert!(matches!(err, Error::Negotiation(_)));

        let err: Error = ChannelError::Closed.into();
        assert!(matches!(err, Error::Channel(ChannelError::Closed)));
    }

    #[test]
    fn test_display() {
        let err = Error::MalformedOffer(SdpError::MissingVersion);
        assert_eq!(
            err.to_string(),
            "Malformed offer: session description must start with v="
        );
        assert_eq!(
            NegotiationError::StreamStopped("s1".into()).to_string(),
            "stream stopped: s1"
        );
    }
}
