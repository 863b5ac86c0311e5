//! WebRTC signaling broker
//!
//! Browsers publish media streams and watch streams published by others.
//! Each client opens a WebSocket on `/channel` and sends one SDP offer; the
//! broker negotiates a media transport, answers, and links watchers to
//! publishers through a shared [`StreamRegistry`].
//!
//! ```text
//!   publisher ──publish-offer──►  SignalingSession ──publish──►  StreamRegistry
//!             ◄────answer──────                                       │
//!                                                                     │ lookup
//!   watcher   ──watch-offer───►  SignalingSession ◄──────────────────┘
//!             ◄─answer+stream─   outgoing.attach_to(incoming)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use webrtc_broker::{LocalEndpoint, ServerConfig, SignalServer};
//!
//! # async fn example() -> webrtc_broker::error::Result<()> {
//! let server = SignalServer::new(ServerConfig::from_env(), LocalEndpoint::default());
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod sdp;
pub mod server;
pub mod session;
pub mod stats;
pub mod transport;

pub use client::SignalingClient;
pub use error::{Error, Result};
pub use protocol::{Command, MemoryChannel, MessageChannel, SignalingMessage, WsChannel};
pub use registry::{PublishedStream, StreamId, StreamRegistry};
pub use sdp::{Capabilities, SessionDescription, StreamInfo};
pub use server::{ServerConfig, SignalServer};
pub use session::{CloseReason, SessionContext, SignalingSession};
pub use stats::ServerStats;
pub use transport::{
    Endpoint, EndpointConfig, IncomingStream, LocalEndpoint, MediaTransport, OutgoingStream,
};
