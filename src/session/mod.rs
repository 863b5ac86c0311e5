//! Signaling session management
//!
//! One [`SignalingSession`] per client connection:
//!
//! - [`SessionState`]: phase, role and counters
//! - [`StreamBinding`]: streams published or watched by the session
//! - [`SessionContext`]: session id and peer address

pub mod context;
pub mod signaling;
pub mod state;
pub mod stream;

pub use context::SessionContext;
pub use signaling::{CloseReason, SignalingSession};
pub use state::{SessionPhase, SessionRole, SessionState};
pub use stream::{StreamBinding, StreamMode};
