//! # cachecon
//!
//! A command-line client for a key-value cache that speaks three protocols:
//! - Binary RPC (request/response frames with status codes)
//! - HTTP/REST (one resource per entry, entity tags as versions)
//! - Text lines (memcached ASCII protocol)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Console / CLI binary                        │
//! │        (command parsing, codec selection, output)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  CacheClient
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Client (chosen from Config)                  │
//! └──────┬───────────────────┬──────────────────────┬───────────┘
//!        │                   │                      │
//!        ▼                   ▼                      ▼
//!  ┌───────────┐      ┌─────────────┐        ┌────────────┐
//!  │ RpcClient │      │ HttpClient  │        │ TextClient │
//!  └─────┬─────┘      │  (reqwest)  │        └─────┬──────┘
//!        │            └─────────────┘              │
//!        ▼                                         ▼
//!  ┌─────────────┐                          ┌─────────────┐
//!  │ RemoteCache │──── codec (keys)         │ TextSession │
//!  └─────┬───────┘                          └──────┬──────┘
//!        └──────────────┐          ┌───────────────┘
//!                       ▼          ▼
//!                  ┌────────────────────┐
//!                  │ network::Connection│
//!                  └────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod network;
pub mod protocol;
pub mod client;
pub mod console;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use client::{CacheClient, Client, Entry, Outcome, PutOptions, VersionToken};
pub use codec::Codec;
pub use config::{ClientKind, Config};
pub use console::Console;
pub use error::{CacheError, Result};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of cachecon
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
