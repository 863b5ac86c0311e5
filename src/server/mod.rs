//! Signaling server
//!
//! TCP accept loop, WebSocket upgrade on the channel path and one session
//! task per connection.

pub mod config;
pub mod listener;

pub use config::ServerConfig;
pub use listener::SignalServer;
