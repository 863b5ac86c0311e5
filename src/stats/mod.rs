//! Session and server statistics

pub mod metrics;

pub use metrics::{ServerCounters, ServerStats, SessionStats};
