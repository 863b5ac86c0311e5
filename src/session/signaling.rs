//! Signaling session
//!
//! Drives one client connection: reads offers from a [`MessageChannel`],
//! negotiates a media transport, publishes into or attaches from the shared
//! [`StreamRegistry`] and replies with an answer.
//!
//! ```text
//!  channel                SignalingSession                   registry
//!     │  publish-offer  ──►  parse, create transport,
//!     │                      answer, incoming streams  ──publish──►
//!     │  ◄── answer
//!     │  watch-offer    ──►  parse, create transport,
//!     │                      answer                    ◄──lookup──
//!     │                      outgoing.attach_to(incoming)
//!     │  ◄── answer (+ stream)
//!     ╳  closed         ──►  stop streams, stop transport ──remove_if_current──►
//! ```

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{ChannelError, Error, NegotiationError, Result};
use crate::protocol::{Command, MessageChannel, SignalingMessage};
use crate::registry::{PublishedStream, StreamId, StreamRegistry};
use crate::sdp::{Capabilities, SessionDescription};
use crate::transport::{Endpoint, IncomingStream, MediaTransport, OutgoingStream};

use super::context::SessionContext;
use super::state::{SessionRole, SessionState};

/// Why a session loop ended
#[derive(Debug)]
pub enum CloseReason {
    /// Peer went away or sent a frame that could not be decoded
    ChannelClosed(ChannelError),
    /// Server shutdown
    Cancelled,
    /// Session-fatal negotiation or parse failure
    Error(Error),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::ChannelClosed(e) => write!(f, "{}", e),
            CloseReason::Cancelled => write!(f, "cancelled"),
            CloseReason::Error(e) => write!(f, "{}", e),
        }
    }
}

/// One signaling connection
pub struct SignalingSession<E: Endpoint> {
    ctx: SessionContext,
    state: SessionState,
    endpoint: Arc<E>,
    registry: Arc<StreamRegistry>,
    capabilities: Arc<Capabilities>,

    /// Created by the first offer
    transport: Option<E::Transport>,

    incoming: Vec<Arc<IncomingStream>>,
    outgoing: Vec<Arc<OutgoingStream>>,

    /// Registry entries this session inserted
    published: Vec<Arc<PublishedStream>>,
}

impl<E: Endpoint> SignalingSession<E> {
    /// Create a new session
    pub fn new(
        ctx: SessionContext,
        endpoint: Arc<E>,
        registry: Arc<StreamRegistry>,
        capabilities: Arc<Capabilities>,
    ) -> Self {
        let state = SessionState::new(ctx.session_id);
        Self {
            ctx,
            state,
            endpoint,
            registry,
            capabilities,
            transport: None,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            published: Vec::new(),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Negotiated transport, until the session closes
    pub fn transport(&self) -> Option<&E::Transport> {
        self.transport.as_ref()
    }

    /// Streams this session receives from its peer
    pub fn incoming_streams(&self) -> &[Arc<IncomingStream>] {
        &self.incoming
    }

    /// Streams this session forwards to its peer
    pub fn outgoing_streams(&self) -> &[Arc<OutgoingStream>] {
        &self.outgoing
    }

    /// Run the message loop until the channel fails or `cancel` fires
    ///
    /// The session is closed before this returns.
    pub async fn run<C: MessageChannel>(
        &mut self,
        channel: &mut C,
        cancel: CancellationToken,
    ) -> CloseReason {
        tracing::info!(
            session_id = self.ctx.session_id,
            peer = %self.ctx.peer(),
            "Session started"
        );

        let reason = loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = channel.recv() => Some(result),
            };

            let message = match received {
                None => break CloseReason::Cancelled,
                Some(Err(e)) => break CloseReason::ChannelClosed(e),
                Some(Ok(message)) => message,
            };
            self.state.stats.messages_received += 1;

            match self.handle_message(message).await {
                Ok(Some(reply)) => {
                    if let Err(e) = channel.send(&reply).await {
                        break CloseReason::ChannelClosed(e);
                    }
                    self.state.stats.messages_sent += 1;
                    self.state.complete_negotiation();
                }
                Ok(None) => {}
                Err(e) => break CloseReason::Error(e),
            }
        };

        channel.close().await;
        self.close().await;

        match &reason {
            CloseReason::Error(e) => tracing::warn!(
                session_id = self.ctx.session_id,
                peer = %self.ctx.peer(),
                error = %e,
                "Session failed"
            ),
            reason => tracing::info!(
                session_id = self.ctx.session_id,
                peer = %self.ctx.peer(),
                reason = %reason,
                "Session ended"
            ),
        }

        reason
    }

    /// Handle one message; returns the reply to send, if any
    pub async fn handle_message(
        &mut self,
        message: SignalingMessage,
    ) -> Result<Option<SignalingMessage>> {
        let role = match message.cmd {
            Command::PublishOffer => SessionRole::Publisher,
            Command::WatchOffer => SessionRole::Watcher,
            Command::Answer => {
                self.ignore(&message, "Unexpected answer from client");
                return Ok(None);
            }
            Command::Unknown => {
                self.ignore(&message, "Unknown command");
                return Ok(None);
            }
        };

        if !self.state.begin_negotiation(role) {
            self.ignore(&message, "Offer after negotiation, renegotiation not supported");
            return Ok(None);
        }

        tracing::debug!(
            session_id = self.ctx.session_id,
            cmd = ?message.cmd,
            sdp_len = message.sdp.len(),
            "Offer received"
        );

        let answer = match role {
            SessionRole::Publisher => self.publish(&message.sdp).await?,
            _ => {
                let stream = message.stream.as_deref().filter(|s| !s.is_empty());
                self.watch(&message.sdp, stream).await?
            }
        };

        Ok(Some(SignalingMessage::answer(answer.to_string())))
    }

    fn ignore(&mut self, message: &SignalingMessage, why: &str) {
        self.state.stats.messages_ignored += 1;
        tracing::warn!(
            session_id = self.ctx.session_id,
            cmd = ?message.cmd,
            phase = ?self.state.phase,
            "{}",
            why
        );
    }

    /// Negotiate a publish offer and register every stream it carries
    async fn publish(&mut self, sdp: &str) -> Result<SessionDescription> {
        let (offer, answer) = self.negotiate(sdp)?;

        let streams = offer.streams();
        if streams.is_empty() {
            tracing::warn!(session_id = self.ctx.session_id, "Publish offer carries no streams");
        }

        for info in streams {
            let incoming = self.active_transport()?.create_incoming_stream(&info)?;
            let id = StreamId::from(info.id.as_str());

            let published = self
                .registry
                .publish(
                    id.clone(),
                    PublishedStream::new(id.clone(), self.ctx.session_id, Arc::clone(&incoming)),
                )
                .await;

            self.published.push(published);
            self.incoming.push(incoming);
            self.state.add_published(id);
        }

        Ok(answer)
    }

    /// Negotiate a watch offer and attach to the requested stream if published
    async fn watch(&mut self, sdp: &str, stream: Option<&str>) -> Result<SessionDescription> {
        let (_, mut answer) = self.negotiate(sdp)?;

        let Some(id) = stream else {
            tracing::info!(session_id = self.ctx.session_id, "Watch offer names no stream");
            return Ok(answer);
        };

        let Some(published) = self.registry.lookup(id).await else {
            tracing::info!(session_id = self.ctx.session_id, stream = %id, "Stream not found");
            return Ok(answer);
        };

        let outgoing = self
            .active_transport()?
            .create_outgoing_stream(published.incoming.info())?;
        self.outgoing.push(Arc::clone(&outgoing));

        match outgoing.attach_to(&published.incoming) {
            Ok(()) => {
                answer.add_stream(outgoing.info());
                self.state.add_watched(StreamId::from(id));
                tracing::info!(
                    session_id = self.ctx.session_id,
                    stream = %id,
                    publisher = published.owner,
                    "Watching stream"
                );
            }
            Err(e) => {
                // Publisher closed between lookup and attach
                outgoing.stop();
                tracing::info!(
                    session_id = self.ctx.session_id,
                    stream = %id,
                    error = %e,
                    "Stream ended before attach"
                );
            }
        }

        Ok(answer)
    }

    /// Parse the offer, create the transport and build the answer
    fn negotiate(&mut self, sdp: &str) -> Result<(SessionDescription, SessionDescription)> {
        let offer = SessionDescription::parse(sdp)?;

        let transport = self.endpoint.create_transport(&offer)?;
        let transport = self.transport.insert(transport);
        transport.set_remote_properties(offer.audio(), offer.video())?;

        let answer = offer.answer(
            &transport.local_ice(),
            &transport.local_dtls(),
            &self.endpoint.local_candidates(),
            &self.capabilities,
        );
        transport.set_local_properties(answer.audio(), answer.video())?;

        tracing::debug!(
            session_id = self.ctx.session_id,
            transport = %transport.id(),
            "Transport negotiated"
        );

        Ok((offer, answer))
    }

    fn active_transport(&self) -> std::result::Result<&E::Transport, NegotiationError> {
        self.transport
            .as_ref()
            .ok_or(NegotiationError::TransportStopped)
    }

    /// Release everything this session holds
    ///
    /// Runs once; later calls return false. Registry entries are removed
    /// only while they are still the ones this session inserted.
    pub async fn close(&mut self) -> bool {
        let Some(published) = self.release() else {
            return false;
        };

        for entry in &published {
            self.registry.remove_if_current(entry).await;
        }

        tracing::info!(
            session_id = self.ctx.session_id,
            duration_ms = self.state.stats.duration.as_millis() as u64,
            messages_received = self.state.stats.messages_received,
            streams_published = self.state.stats.streams_published,
            streams_attached = self.state.stats.streams_attached,
            "Session closed"
        );
        true
    }

    /// Stop streams and transport; returns the published entries on first call
    fn release(&mut self) -> Option<Vec<Arc<PublishedStream>>> {
        if self.state.is_closed() {
            return None;
        }
        self.state.close();
        let published = std::mem::take(&mut self.published);

        for stream in self.outgoing.drain(..) {
            stream.stop();
        }
        for stream in self.incoming.drain(..) {
            stream.stop();
        }
        if let Some(transport) = self.transport.take() {
            transport.stop();
        }

        Some(published)
    }
}

impl<E: Endpoint> Drop for SignalingSession<E> {
    fn drop(&mut self) {
        let Some(published) = self.release() else {
            return;
        };
        if published.is_empty() {
            return;
        }

        let registry = Arc::clone(&self.registry);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    for entry in &published {
                        registry.remove_if_current(entry).await;
                    }
                });
            }
            Err(_) => tracing::warn!(
                session_id = self.ctx.session_id,
                streams = published.len(),
                "Session dropped outside a runtime, registry entries left in place"
            ),
        }
    }
}
