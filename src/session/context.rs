//! Session context
//!
//! Identity of a signaling session, carried into log lines and registry
//! ownership checks.

use std::fmt;
use std::net::SocketAddr;

/// Connection-level information for one session
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Unique session ID
    pub session_id: u64,

    /// Remote peer address, when the channel has one
    pub peer_addr: Option<SocketAddr>,
}

impl SessionContext {
    /// Create a new context
    pub fn new(session_id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            session_id,
            peer_addr: Some(peer_addr),
        }
    }

    /// Context for a channel with no socket behind it
    pub fn detached(session_id: u64) -> Self {
        Self {
            session_id,
            peer_addr: None,
        }
    }

    /// Peer address for log fields
    pub fn peer(&self) -> PeerDisplay<'_> {
        PeerDisplay(&self.peer_addr)
    }
}

/// Displays the peer address or `-`
pub struct PeerDisplay<'a>(&'a Option<SocketAddr>);

impl fmt::Display for PeerDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(addr) => write!(f, "{}", addr),
            None => f.write_str("-"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_display() {
        let ctx = SessionContext::new(7, "10.0.0.1:5000".parse().unwrap());
        assert_eq!(ctx.peer().to_string(), "10.0.0.1:5000");

        let ctx = SessionContext::detached(8);
        assert_eq!(ctx.session_id, 8);
        assert_eq!(ctx.peer().to_string(), "-");
    }
}
