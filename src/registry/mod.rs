//! Stream registry for publish/watch routing
//!
//! The registry is the only state shared between signaling sessions. A
//! publishing session inserts one entry per stream in its offer; watching
//! sessions look entries up and attach outgoing streams to them.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<StreamRegistry>
//!                     ┌─────────────────────────┐
//!                     │ streams: HashMap<Id,    │
//!                     │   PublishedStream {     │
//!                     │     owner,              │
//!                     │     incoming,           │
//!                     │   }                     │
//!                     │ >                       │
//!                     └───────────┬─────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Publisher]              [Watcher]               [Watcher]
//!    publish()                lookup()                lookup()
//!         │                       │                       │
//!         └─── incoming ──────► attach_to() ◄─────────────┘
//! ```
//!
//! Entries are removed by the owning session when it closes. A session only
//! removes the exact entries it inserted, so a newer publisher of the same id
//! is never evicted by an older one disconnecting.

pub mod entry;
pub mod key;
pub mod store;

pub use entry::{PublishedStream, StreamStats};
pub use key::StreamId;
pub use store::StreamRegistry;
