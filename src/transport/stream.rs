//! Incoming and outgoing stream handles
//!
//! ```text
//!   publisher transport                       watcher transports
//!  ┌──────────────────┐                     ┌──────────────────┐
//!  │ IncomingStream   │  broadcast::Sender  │ OutgoingStream   │
//!  │   push(packet) ──┼──────────┬─────────►│   subscribe()    │
//!  └──────────────────┘          │          └──────────────────┘
//!                                │          ┌──────────────────┐
//!                                └─────────►│ OutgoingStream   │
//!                                           └──────────────────┘
//! ```
//!
//! Forwarding is pure fan-out: packets are never transcoded. Stopping an
//! incoming stream drops its sender, which ends every attached flow.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;

use crate::error::NegotiationError;
use crate::sdp::StreamInfo;

use super::packet::MediaPacket;

/// Media flowing into the broker from a publisher
#[derive(Debug)]
pub struct IncomingStream {
    info: StreamInfo,
    /// Taken on stop so receivers observe the end of the flow
    tx: RwLock<Option<broadcast::Sender<MediaPacket>>>,
    packets_received: AtomicU64,
}

impl IncomingStream {
    pub(crate) fn new(info: StreamInfo, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            info,
            tx: RwLock::new(Some(tx)),
            packets_received: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    /// Stream description as offered by the publisher
    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    /// Deliver a packet to every attached outgoing stream
    ///
    /// Returns the number of receivers, 0 if none are attached or the stream
    /// has been stopped.
    pub fn push(&self, packet: MediaPacket) -> usize {
        let tx = self.tx.read().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => {
                self.packets_received.fetch_add(1, Ordering::Relaxed);
                tx.send(packet).unwrap_or(0)
            }
            None => 0,
        }
    }

    pub(crate) fn subscribe(&self) -> Result<broadcast::Receiver<MediaPacket>, NegotiationError> {
        self.tx
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(broadcast::Sender::subscribe)
            .ok_or_else(|| NegotiationError::StreamStopped(self.info.id.clone()))
    }

    /// Number of live receivers
    pub fn subscriber_count(&self) -> usize {
        self.tx
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }

    pub fn packets_received(&self) -> u64 {
        self.packets_received.load(Ordering::Relaxed)
    }

    pub fn is_stopped(&self) -> bool {
        self.tx
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Stop the stream; idempotent
    pub fn stop(&self) {
        let previous = self
            .tx
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            tracing::debug!(stream = %self.info.id, "Incoming stream stopped");
        }
    }
}

/// Media flowing out of the broker to a watcher
#[derive(Debug)]
pub struct OutgoingStream {
    info: StreamInfo,
    source: RwLock<Option<Arc<IncomingStream>>>,
    stopped: AtomicBool,
}

impl OutgoingStream {
    pub(crate) fn new(info: StreamInfo) -> Self {
        Self {
            info,
            source: RwLock::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    /// Stream description as announced to the watcher
    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    /// Link this stream to an incoming stream's media flow
    ///
    /// Replaces any previous attachment.
    pub fn attach_to(&self, incoming: &Arc<IncomingStream>) -> Result<(), NegotiationError> {
        if self.is_stopped() {
            return Err(NegotiationError::StreamStopped(self.info.id.clone()));
        }
        if incoming.is_stopped() {
            return Err(NegotiationError::StreamStopped(incoming.id().to_string()));
        }

        *self.source.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(incoming));

        tracing::debug!(
            outgoing = %self.info.id,
            incoming = %incoming.id(),
            "Outgoing stream attached"
        );
        Ok(())
    }

    /// Remove the attachment, if any
    pub fn detach(&self) {
        self.source
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Id of the incoming stream this one forwards, if attached
    pub fn attached_to(&self) -> Option<String> {
        self.source
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.id().to_string())
    }

    /// Receive forwarded packets
    ///
    /// The receiver yields `RecvError::Closed` once the source stops.
    pub fn subscribe(&self) -> Result<broadcast::Receiver<MediaPacket>, NegotiationError> {
        if self.is_stopped() {
            return Err(NegotiationError::StreamStopped(self.info.id.clone()));
        }
        let source = self.source.read().unwrap_or_else(PoisonError::into_inner);
        match source.as_ref() {
            Some(incoming) => incoming.subscribe(),
            None => Err(NegotiationError::StreamStopped(self.info.id.clone())),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Stop and detach; idempotent
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.detach();
            tracing::debug!(stream = %self.info.id, "Outgoing stream stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tokio::sync::broadcast::error::RecvError;

    use super::*;
    use crate::sdp::{MediaKind, TrackInfo};

    fn info(id: &str) -> StreamInfo {
        StreamInfo::new(id).with_track(TrackInfo::new("v", MediaKind::Video).with_ssrcs(vec![1]))
    }

    #[tokio::test]
    async fn test_forwarding_to_attached_streams() {
        let incoming = Arc::new(IncomingStream::new(info("pub"), 16));
        let first = OutgoingStream::new(info("pub"));
        let second = OutgoingStream::new(info("pub"));

        first.attach_to(&incoming).unwrap();
        second.attach_to(&incoming).unwrap();
        let mut rx1 = first.subscribe().unwrap();
        let mut rx2 = second.subscribe().unwrap();

        let delivered = incoming.push(MediaPacket::video(Bytes::from_static(&[0x80, 0x60])));
        assert_eq!(delivered, 2);
        assert_eq!(incoming.packets_received(), 1);

        let p1 = rx1.recv().await.unwrap();
        let p2 = rx2.recv().await.unwrap();
        assert_eq!(p1, p2);
        assert_eq!(p1.kind, MediaKind::Video);
        assert_eq!(first.attached_to().as_deref(), Some("pub"));
    }

    #[tokio::test]
    async fn test_stop_incoming_ends_flow() {
        let incoming = Arc::new(IncomingStream::new(info("pub"), 16));
        let outgoing = OutgoingStream::new(info("pub"));
        outgoing.attach_to(&incoming).unwrap();
        let mut rx = outgoing.subscribe().unwrap();

        incoming.stop();
        incoming.stop();

        assert!(matches!(rx.recv().await, Err(RecvError::Closed)));
        assert_eq!(incoming.push(MediaPacket::audio(Bytes::new())), 0);
        assert!(outgoing.subscribe().is_err());

        let late = OutgoingStream::new(info("pub"));
        assert_eq!(
            late.attach_to(&incoming),
            Err(NegotiationError::StreamStopped("pub".into()))
        );
    }

    #[test]
    fn test_stop_outgoing_detaches() {
        let incoming = Arc::new(IncomingStream::new(info("pub"), 16));
        let outgoing = OutgoingStream::new(info("pub"));
        outgoing.attach_to(&incoming).unwrap();

        outgoing.stop();

        assert!(outgoing.is_stopped());
        assert!(outgoing.attached_to().is_none());
        assert!(outgoing.attach_to(&incoming).is_err());
        assert_eq!(incoming.subscriber_count(), 0);
    }

    #[test]
    fn test_unattached_subscribe_fails() {
        let outgoing = OutgoingStream::new(info("lonely"));
        assert!(outgoing.subscribe().is_err());
    }
}
