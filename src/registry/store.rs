//! Stream registry implementation
//!
//! The directory of live published streams shared by every signaling session.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::entry::{PublishedStream, StreamStats};
use super::key::StreamId;

/// Central registry for all published streams
///
/// Thread-safe via `RwLock`. Lookups from watching sessions take the read
/// lock and run concurrently; publishes and removals take the write lock.
/// Every operation is a single critical section, so a lookup observes either
/// a complete entry or none, and sees every publish that finished before it.
pub struct StreamRegistry {
    /// Map of stream id to published stream
    streams: RwLock<HashMap<StreamId, Arc<PublishedStream>>>,
}

impl StreamRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace the entry for `id`
    ///
    /// Last writer wins: a stale entry with the same id is overwritten. The
    /// returned handle identifies this entry for [`remove_if_current`].
    ///
    /// [`remove_if_current`]: StreamRegistry::remove_if_current
    pub async fn publish(&self, id: StreamId, stream: PublishedStream) -> Arc<PublishedStream> {
        let owner = stream.owner;
        let stream = Arc::new(stream);
        let previous = self
            .streams
            .write()
            .await
            .insert(id.clone(), Arc::clone(&stream));

        match previous {
            Some(prev) => tracing::info!(
                stream = %id,
                session_id = owner,
                replaced_session_id = prev.owner,
                "Stream published (replaced existing entry)"
            ),
            None => tracing::info!(stream = %id, session_id = owner, "Stream published"),
        }

        stream
    }

    /// Look up a published stream
    ///
    /// `None` is the normal "no such stream" result.
    pub async fn lookup(&self, id: &str) -> Option<Arc<PublishedStream>> {
        self.streams.read().await.get(id).cloned()
    }

    /// Remove the entry for `id`; removing an absent id is a no-op
    pub async fn remove(&self, id: &str) -> Option<Arc<PublishedStream>> {
        let removed = self.streams.write().await.remove(id);
        if removed.is_some() {
            tracing::info!(stream = %id, "Stream removed");
        }
        removed
    }

    /// Remove `stream` only if it is still the entry registered under its id
    ///
    /// Entries are matched by identity, not by session id, so sessions from
    /// different servers sharing this registry never remove each other's
    /// entries. Returns whether an entry was removed.
    pub async fn remove_if_current(&self, stream: &Arc<PublishedStream>) -> bool {
        let mut streams = self.streams.write().await;

        match streams.get(&stream.id) {
            Some(entry) if Arc::ptr_eq(entry, stream) => {
                streams.remove(&stream.id);
                tracing::info!(
                    stream = %stream.id,
                    session_id = stream.owner,
                    "Stream unpublished"
                );
                true
            }
            Some(entry) => {
                tracing::debug!(
                    stream = %stream.id,
                    session_id = stream.owner,
                    owner = entry.owner,
                    "Stream replaced by another publisher, leaving entry"
                );
                false
            }
            None => false,
        }
    }

    /// Check if a stream is published
    pub async fn contains(&self, id: &str) -> bool {
        self.streams.read().await.contains_key(id)
    }

    /// Get total number of streams
    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Ids of all published streams, sorted
    pub async fn stream_ids(&self) -> Vec<StreamId> {
        let mut ids: Vec<StreamId> = self.streams.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Get stream statistics
    pub async fn get_stream_stats(&self, id: &str) -> Option<StreamStats> {
        self.streams.read().await.get(id).map(|s| s.stats())
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}
