//! Session state machine
//!
//! Tracks a signaling session from connection accept to close.
//!
//! ```text
//! Idle ──offer──► Negotiating ──answer sent──► Active
//!   │                  │                         │
//!   └──────────────────┴──────── close ──────────┴──► Closed
//! ```

use std::time::Instant;

use super::stream::{StreamBinding, StreamMode};
use crate::registry::StreamId;
use crate::stats::SessionStats;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the first offer
    Idle,
    /// Offer received, negotiation in progress
    Negotiating,
    /// Answer sent, transport live
    Active,
    /// Session closed
    Closed,
}

/// Negotiation role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    Unset,
    Publisher,
    Watcher,
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Unique session ID
    pub id: u64,

    /// Current phase
    pub phase: SessionPhase,

    /// Current role
    pub role: SessionRole,

    /// Session start time
    pub connected_at: Instant,

    /// Time when the answer was sent
    pub negotiated_at: Option<Instant>,

    /// Streams published or watched by this session
    pub streams: Vec<StreamBinding>,

    /// Counters
    pub stats: SessionStats,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: u64) -> Self {
        Self {
            id,
            phase: SessionPhase::Idle,
            role: SessionRole::Unset,
            connected_at: Instant::now(),
            negotiated_at: None,
            streams: Vec::new(),
            stats: SessionStats::new(),
        }
    }

    /// Start negotiating in the given role
    ///
    /// Returns false unless the session is idle.
    pub fn begin_negotiation(&mut self, role: SessionRole) -> bool {
        if self.phase != SessionPhase::Idle {
            return false;
        }
        self.phase = SessionPhase::Negotiating;
        self.role = role;
        true
    }

    /// Answer sent
    pub fn complete_negotiation(&mut self) {
        if self.phase == SessionPhase::Negotiating {
            self.phase = SessionPhase::Active;
            self.negotiated_at = Some(Instant::now());
        }
    }

    /// Record a stream published by this session
    pub fn add_published(&mut self, id: StreamId) {
        self.stats.streams_published += 1;
        self.streams.push(StreamBinding::new(id, StreamMode::Publishing));
    }

    /// Record a stream this session attached to
    pub fn add_watched(&mut self, id: StreamId) {
        self.stats.streams_attached += 1;
        self.streams.push(StreamBinding::new(id, StreamMode::Watching));
    }

    /// Ids of streams published by this session
    pub fn published(&self) -> impl Iterator<Item = &StreamId> {
        self.streams
            .iter()
            .filter(|s| s.is_publishing())
            .map(|s| &s.stream_id)
    }

    /// Check if session is active
    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }

    /// Get session duration
    pub fn duration(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }

    /// Move to closed
    ///
    /// Returns true only for the first call.
    pub fn close(&mut self) -> bool {
        if self.phase == SessionPhase::Closed {
            return false;
        }
        self.phase = SessionPhase::Closed;
        self.stats.duration = self.duration();
        for stream in &mut self.streams {
            stream.stop();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut state = SessionState::new(1);

        assert_eq!(state.phase, SessionPhase::Idle);
        assert_eq!(state.role, SessionRole::Unset);

        assert!(state.begin_negotiation(SessionRole::Publisher));
        assert_eq!(state.phase, SessionPhase::Negotiating);
        assert_eq!(state.role, SessionRole::Publisher);

        state.complete_negotiation();
        assert!(state.is_active());
        assert!(state.negotiated_at.is_some());

        // No renegotiation once active
        assert!(!state.begin_negotiation(SessionRole::Watcher));
        assert_eq!(state.role, SessionRole::Publisher);

        assert!(state.close());
        assert!(!state.close());
        assert!(state.is_closed());
    }

    #[test]
    fn test_stream_tracking() {
        let mut state = SessionState::new(1);

        state.add_published(StreamId::from("a"));
        state.add_published(StreamId::from("b"));
        state.add_watched(StreamId::from("c"));

        let published: Vec<&str> = state.published().map(StreamId::as_str).collect();
        assert_eq!(published, vec!["a", "b"]);
        assert_eq!(state.stats.streams_published, 2);
        assert_eq!(state.stats.streams_attached, 1);

        state.close();
        assert!(state.streams.iter().all(|s| !s.is_live()));
        assert_eq!(state.published().count(), 2);
    }
}
