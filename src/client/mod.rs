//! Signaling client implementation
//!
//! Client side of the channel protocol, for:
//! - Driving a broker from tests and tools
//! - Relaying offers from another signaling front end

pub mod signaling;

pub use signaling::SignalingClient;
