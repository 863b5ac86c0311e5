//! Signaling client
//!
//! Connects to a broker's channel endpoint, sends one offer and waits for
//! the answer.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio_tungstenite::MaybeTlsStream;

use crate::error::{ChannelError, Error, Result};
use crate::protocol::{Command, MessageChannel, SignalingMessage, WsChannel};

/// Default time to wait for an answer
pub const DEFAULT_ANSWER_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket signaling client
///
/// # Example
/// ```no_run
/// use webrtc_broker::client::SignalingClient;
///
/// # async fn example(offer: &str) -> webrtc_broker::error::Result<()> {
/// let mut client = SignalingClient::connect("ws://localhost:8000/channel").await?;
/// let answer = client.publish(offer).await?;
/// println!("{}", answer);
/// # Ok(())
/// # }
/// ```
pub struct SignalingClient {
    channel: WsChannel<MaybeTlsStream<TcpStream>>,
    answer_timeout: Duration,
}

impl SignalingClient {
    /// Connect to the channel URL (`ws://host:port/channel`)
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| Error::Handshake(e.to_string()))?;

        tracing::debug!(url = %url, "Signaling channel connected");

        Ok(Self {
            channel: WsChannel::new(ws),
            answer_timeout: DEFAULT_ANSWER_TIMEOUT,
        })
    }

    /// Set how long to wait for an answer
    pub fn answer_timeout(mut self, timeout: Duration) -> Self {
        self.answer_timeout = timeout;
        self
    }

    /// Send a publish offer; returns the answer SDP
    pub async fn publish(&mut self, sdp: &str) -> Result<String> {
        self.exchange(SignalingMessage::publish_offer(sdp)).await
    }

    /// Send a watch offer for `stream`; returns the answer SDP
    pub async fn watch(&mut self, sdp: &str, stream: &str) -> Result<String> {
        self.exchange(SignalingMessage::watch_offer(sdp, stream)).await
    }

    /// Send any message without waiting for a reply
    pub async fn send(&mut self, message: &SignalingMessage) -> Result<()> {
        self.channel.send(message).await.map_err(Error::from)
    }

    /// Receive the next message
    pub async fn recv(&mut self) -> Result<SignalingMessage> {
        match tokio::time::timeout(self.answer_timeout, self.channel.recv()).await {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(Error::Channel(ChannelError::Transport(
                "timed out waiting for answer".into(),
            ))),
        }
    }

    async fn exchange(&mut self, offer: SignalingMessage) -> Result<String> {
        self.send(&offer).await?;

        let reply = self.recv().await?;
        if reply.cmd != Command::Answer {
            return Err(Error::Channel(ChannelError::Malformed(format!(
                "expected answer, got {}",
                reply.cmd.as_str()
            ))));
        }
        Ok(reply.sdp)
    }

    /// Close the channel
    pub async fn close(mut self) {
        self.channel.close().await;
    }
}
