//! Network Module
//!
//! Blocking TCP transport shared by the socket-based backends.
//!
//! ## Model
//! - One connection per client instance
//! - Buffered reader/writer halves over a cloned stream
//! - Timeouts fixed at connect time; no retries

mod connection;

pub use connection::Connection;
