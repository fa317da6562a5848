//! Client Module
//!
//! One operation set over three wire protocols.
//!
//! ## Responsibilities
//! - Define the [`CacheClient`] contract (put/get/version/exists/delete/clear)
//! - Map each backend's native results onto [`CacheError`]
//! - Pick the backend once, from [`Config`], in [`Client::connect`]
//!
//! Version tokens are opaque strings here. Each backend parses them into
//! its own representation and rejects what it cannot represent.

mod outcome;

pub mod http;
pub mod rpc;
pub mod text;

use std::fmt;

use crate::config::{ClientKind, Config};
use crate::error::{CacheError, Result};

pub use http::HttpClient;
pub use outcome::Outcome;
pub use rpc::RpcClient;
pub use text::TextClient;

// =============================================================================
// Shared Types
// =============================================================================

/// Opaque, backend-specific entry version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as a numeric counter for backends that only have those
    pub(crate) fn parse_numeric<T: std::str::FromStr>(&self, backend: &str) -> Result<T> {
        self.0.trim().parse().map_err(|_| {
            CacheError::Validation(format!(
                "{} client only accepts numeric versions, got: {}",
                backend, self.0
            ))
        })
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for VersionToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for VersionToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// A value read from the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub value: Vec<u8>,

    /// Only filled when requested
    pub version: Option<VersionToken>,
}

/// Preconditions and expiry for a put
///
/// `None` (or `0`) for a TTL field means no expiry in that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// Store only if the current version matches
    pub version: Option<VersionToken>,

    /// Seconds until expiry
    pub lifespan: Option<u32>,

    /// Seconds of inactivity until expiry
    pub max_idle: Option<u32>,

    /// Store only if no entry exists
    pub put_if_absent: bool,
}

/// How a put is conditioned, after precedence is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode<'a> {
    Unconditional,
    IfAbsent,
    Versioned(&'a VersionToken),
}

impl PutOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: impl Into<VersionToken>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn lifespan(mut self, seconds: u32) -> Self {
        self.lifespan = Some(seconds);
        self
    }

    pub fn max_idle(mut self, seconds: u32) -> Self {
        self.max_idle = Some(seconds);
        self
    }

    pub fn put_if_absent(mut self, enabled: bool) -> Self {
        self.put_if_absent = enabled;
        self
    }

    /// A version precondition wins over `put_if_absent`
    pub fn write_mode(&self) -> WriteMode<'_> {
        match &self.version {
            Some(version) => WriteMode::Versioned(version),
            None if self.put_if_absent => WriteMode::IfAbsent,
            None => WriteMode::Unconditional,
        }
    }
}

// =============================================================================
// Contract
// =============================================================================

/// Operations every backend provides
///
/// Calls block until the server answers. `&mut self` keeps one request in
/// flight per client.
pub trait CacheClient {
    /// Store `value` under `key`, honouring the preconditions in `options`
    ///
    /// Fails with `Conflict` when a precondition does not hold and with
    /// `NotFound` when a version precondition names a missing key.
    fn put(&mut self, key: &[u8], value: &[u8], options: &PutOptions) -> Result<()>;

    /// Read the value under `key`, and its version if `want_version`
    fn get(&mut self, key: &[u8], want_version: bool) -> Result<Entry>;

    /// Current version of the entry under `key`
    fn version(&mut self, key: &[u8]) -> Result<VersionToken> {
        self.get(key, true)?
            .version
            .ok_or_else(|| CacheError::Transport("server returned no version".to_string()))
    }

    /// Succeeds if `key` is present, otherwise `NotFound`
    fn exists(&mut self, key: &[u8]) -> Result<()> {
        self.get(key, false).map(|_| ())
    }

    /// Remove `key`, optionally only if its version matches
    fn delete(&mut self, key: &[u8], version: Option<&VersionToken>) -> Result<()>;

    /// Remove every entry of the configured cache
    fn clear(&mut self) -> Result<()>;
}

// =============================================================================
// Factory
// =============================================================================

/// The backend selected for a configuration
pub enum Client {
    Rpc(RpcClient),
    Http(HttpClient),
    Text(TextClient),
}

impl Client {
    /// Build the backend named by `config.client_type`
    ///
    /// Socket backends connect immediately; the HTTP backend connects on
    /// first use.
    pub fn connect(config: &Config) -> Result<Self> {
        tracing::debug!(
            "Creating {} client for {}:{}",
            config.client_type,
            config.host,
            config.port
        );
        match config.client_type {
            ClientKind::Rpc => RpcClient::connect(config).map(Client::Rpc),
            ClientKind::Http => HttpClient::connect(config).map(Client::Http),
            ClientKind::Text => TextClient::connect(config).map(Client::Text),
        }
    }

    pub fn kind(&self) -> ClientKind {
        match self {
            Client::Rpc(_) => ClientKind::Rpc,
            Client::Http(_) => ClientKind::Http,
            Client::Text(_) => ClientKind::Text,
        }
    }
}

impl CacheClient for Client {
    fn put(&mut self, key: &[u8], value: &[u8], options: &PutOptions) -> Result<()> {
        match self {
            Client::Rpc(c) => c.put(key, value, options),
            Client::Http(c) => c.put(key, value, options),
            Client::Text(c) => c.put(key, value, options),
        }
    }

    fn get(&mut self, key: &[u8], want_version: bool) -> Result<Entry> {
        match self {
            Client::Rpc(c) => c.get(key, want_version),
            Client::Http(c) => c.get(key, want_version),
            Client::Text(c) => c.get(key, want_version),
        }
    }

    fn version(&mut self, key: &[u8]) -> Result<VersionToken> {
        match self {
            Client::Rpc(c) => c.version(key),
            Client::Http(c) => c.version(key),
            Client::Text(c) => c.version(key),
        }
    }

    fn exists(&mut self, key: &[u8]) -> Result<()> {
        match self {
            Client::Rpc(c) => c.exists(key),
            Client::Http(c) => c.exists(key),
            Client::Text(c) => c.exists(key),
        }
    }

    fn delete(&mut self, key: &[u8], version: Option<&VersionToken>) -> Result<()> {
        match self {
            Client::Rpc(c) => c.delete(key, version),
            Client::Http(c) => c.delete(key, version),
            Client::Text(c) => c.delete(key, version),
        }
    }

    fn clear(&mut self) -> Result<()> {
        match self {
            Client::Rpc(c) => c.clear(),
            Client::Http(c) => c.clear(),
            Client::Text(c) => c.clear(),
        }
    }
}
