//! Message channels
//!
//! A channel delivers one [`SignalingMessage`] per `recv` and accepts one per
//! `send`. Any receive failure (peer gone, bad frame, socket error) ends the
//! session loop.

use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;

use crate::error::ChannelError;

use super::message::SignalingMessage;

/// Duplex signaling channel
pub trait MessageChannel: Send {
    /// Receive the next message
    fn recv(&mut self) -> impl Future<Output = Result<SignalingMessage, ChannelError>> + Send;

    /// Send a message
    fn send(
        &mut self,
        message: &SignalingMessage,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Close the channel; errors are ignored
    fn close(&mut self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

fn decode(text: &str) -> Result<SignalingMessage, ChannelError> {
    SignalingMessage::from_json(text).map_err(|e| ChannelError::Malformed(e.to_string()))
}

/// Channel over an upgraded WebSocket connection
pub struct WsChannel<S> {
    ws: WebSocketStream<S>,
}

impl<S> WsChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(ws: WebSocketStream<S>) -> Self {
        Self { ws }
    }

    pub fn into_inner(self) -> WebSocketStream<S> {
        self.ws
    }
}

impl<S> MessageChannel for WsChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> Result<SignalingMessage, ChannelError> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return decode(&text),
                Some(Ok(Message::Binary(data))) => {
                    let text = std::str::from_utf8(&data)
                        .map_err(|e| ChannelError::Malformed(e.to_string()))?;
                    return decode(text);
                }
                Some(Ok(Message::Close(_))) | None => return Err(ChannelError::Closed),
                // Ping/pong are answered by tungstenite on the next read
                Some(Ok(_)) => continue,
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    return Err(ChannelError::Closed)
                }
                Some(Err(e)) => return Err(ChannelError::Transport(e.to_string())),
            }
        }
    }

    async fn send(&mut self, message: &SignalingMessage) -> Result<(), ChannelError> {
        self.ws
            .send(Message::Text(message.to_json()))
            .await
            .map_err(|e| match e {
                WsError::ConnectionClosed | WsError::AlreadyClosed => ChannelError::Closed,
                e => ChannelError::Transport(e.to_string()),
            })
    }

    async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}

/// In-memory channel carrying JSON text frames
///
/// Created in connected pairs. Useful for embedding the broker behind a
/// different transport and for driving sessions in tests.
pub struct MemoryChannel {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl MemoryChannel {
    /// Create two connected ends
    pub fn pair() -> (MemoryChannel, MemoryChannel) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            MemoryChannel { tx: a_tx, rx: a_rx },
            MemoryChannel { tx: b_tx, rx: b_rx },
        )
    }

    /// Send a raw text frame to the other end
    pub fn send_raw(&self, frame: impl Into<String>) -> Result<(), ChannelError> {
        self.tx.send(frame.into()).map_err(|_| ChannelError::Closed)
    }
}

impl MessageChannel for MemoryChannel {
    async fn recv(&mut self) -> Result<SignalingMessage, ChannelError> {
        match self.rx.recv().await {
            Some(frame) => decode(&frame),
            None => Err(ChannelError::Closed),
        }
    }

    async fn send(&mut self, message: &SignalingMessage) -> Result<(), ChannelError> {
        self.send_raw(message.to_json())
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}
