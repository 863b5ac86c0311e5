//! Signaling wire protocol
//!
//! - JSON message types exchanged over the `/channel` WebSocket
//! - The [`MessageChannel`] abstraction sessions read from and write to

pub mod channel;
pub mod message;

pub use channel::{MemoryChannel, MessageChannel, WsChannel};
pub use message::{Command, SignalingMessage};
