//! Per-stream bindings
//!
//! A session either publishes streams into the registry or watches
//! one published stream. Each binding records which, and when it ended.

use std::time::{Duration, Instant};

use crate::registry::StreamId;

/// Binding mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Session owns the incoming stream
    Publishing,
    /// Session forwards a published stream to its peer
    Watching,
}

/// A stream this session publishes or watches
#[derive(Debug, Clone)]
pub struct StreamBinding {
    /// Registry id of the stream
    pub stream_id: StreamId,

    /// Publish or watch
    pub mode: StreamMode,

    /// When the binding was created
    pub started_at: Instant,

    /// When the binding was stopped
    pub stopped_at: Option<Instant>,
}

impl StreamBinding {
    pub fn new(stream_id: StreamId, mode: StreamMode) -> Self {
        Self {
            stream_id,
            mode,
            started_at: Instant::now(),
            stopped_at: None,
        }
    }

    pub fn is_publishing(&self) -> bool {
        self.mode == StreamMode::Publishing
    }

    pub fn is_watching(&self) -> bool {
        self.mode == StreamMode::Watching
    }

    /// Still running
    pub fn is_live(&self) -> bool {
        self.stopped_at.is_none()
    }

    /// Mark stopped; later calls keep the first stop time
    pub fn stop(&mut self) {
        if self.stopped_at.is_none() {
            self.stopped_at = Some(Instant::now());
        }
    }

    /// Time the binding was live
    pub fn duration(&self) -> Duration {
        match self.stopped_at {
            Some(stopped) => stopped.duration_since(self.started_at),
            None => self.started_at.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_modes() {
        let publish = StreamBinding::new(StreamId::from("cam"), StreamMode::Publishing);
        assert!(publish.is_publishing());
        assert!(!publish.is_watching());
        assert!(publish.is_live());

        let watch = StreamBinding::new(StreamId::from("cam"), StreamMode::Watching);
        assert!(watch.is_watching());
        assert_eq!(watch.stream_id.as_str(), "cam");
    }

    #[test]
    fn test_stop_keeps_first_time() {
        let mut binding = StreamBinding::new(StreamId::from("cam"), StreamMode::Publishing);
        binding.stop();
        let first = binding.stopped_at;
        assert!(first.is_some());
        assert!(!binding.is_live());

        binding.stop();
        assert_eq!(binding.stopped_at, first);
        assert_eq!(binding.duration(), binding.duration());
    }
}
