//! Published stream entry
//!
//! This module defines the per-stream state stored in the registry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::transport::IncomingStream;

use super::key::StreamId;

/// Entry for a single published stream
#[derive(Debug)]
pub struct PublishedStream {
    /// Registry key
    pub id: StreamId,

    /// Session that published the stream
    pub owner: u64,

    /// Incoming media handle on the publisher's transport
    pub incoming: Arc<IncomingStream>,

    /// When the stream was published
    pub published_at: Instant,
}

impl PublishedStream {
    /// Create a new entry
    pub fn new(id: StreamId, owner: u64, incoming: Arc<IncomingStream>) -> Self {
        Self {
            id,
            owner,
            incoming,
            published_at: Instant::now(),
        }
    }

    /// Number of attached watchers
    pub fn watcher_count(&self) -> usize {
        self.incoming.subscriber_count()
    }

    /// Time since the stream was published
    pub fn age(&self) -> Duration {
        self.published_at.elapsed()
    }

    /// Snapshot for reporting
    pub fn stats(&self) -> StreamStats {
        StreamStats {
            id: self.id.clone(),
            owner: self.owner,
            watcher_count: self.watcher_count(),
            packets_received: self.incoming.packets_received(),
            age: self.age(),
        }
    }
}

/// Statistics for a published stream
#[derive(Debug, Clone)]
pub struct StreamStats {
    pub id: StreamId,
    /// Publishing session
    pub owner: u64,
    /// Number of attached watchers
    pub watcher_count: usize,
    /// Packets pushed by the publisher
    pub packets_received: u64,
    /// Time since publish
    pub age: Duration,
}
