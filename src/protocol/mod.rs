//! Protocol Module
//!
//! Native wire protocols spoken by the socket-based backends.
//!
//! - [`rpc`]: length-prefixed binary request/response protocol
//! - [`text`]: memcached-style ASCII line protocol
//!
//! The HTTP backend needs no module here; it is expressed directly as
//! requests on a `reqwest` client.

pub mod rpc;
pub mod text;
