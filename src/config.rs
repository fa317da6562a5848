//! Configuration for cachecon
//!
//! A flat key/value record with sensible defaults. The console edits it one
//! key at a time through [`Config::set`]; library callers use the builder.

use std::fmt;
use std::str::FromStr;

use crate::codec::Codec;
use crate::error::{CacheError, Result};

/// Which wire protocol the client speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    /// Binary RPC protocol
    Rpc,
    /// HTTP/REST protocol
    Http,
    /// Text line protocol (memcached ASCII)
    Text,
}

impl FromStr for ClientKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rpc" | "hotrod" => Ok(ClientKind::Rpc),
            "http" | "rest" => Ok(ClientKind::Http),
            "text" | "memcached" => Ok(ClientKind::Text),
            other => Err(CacheError::Config(format!("unknown client type: {}", other))),
        }
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClientKind::Rpc => "rpc",
            ClientKind::Http => "http",
            ClientKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// Main configuration for a cachecon session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Connection Configuration
    // -------------------------------------------------------------------------
    /// Backend protocol
    pub client_type: ClientKind,

    /// Server host name or address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Cache name, empty string means the server's default cache
    pub cache_name: String,

    /// Socket / HTTP timeout in milliseconds (0 disables it)
    pub timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Console Configuration
    // -------------------------------------------------------------------------
    /// Stop at the first failed command
    pub exit_on_error: bool,

    /// Codec applied to put/get values when a command names none
    pub default_codec: Codec,

    // -------------------------------------------------------------------------
    // Backend-specific Configuration
    // -------------------------------------------------------------------------
    /// Base path of the REST endpoint
    pub rest_server_url: String,

    /// Content-Type sent with REST requests
    pub rest_content_type: String,

    /// Encode RPC keys with the string framing codec
    pub rpc_encode_keys: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_type: ClientKind::Rpc,
            host: "localhost".to_string(),
            port: 11222,
            cache_name: String::new(),
            timeout_ms: 5000,
            exit_on_error: false,
            default_codec: Codec::None,
            rest_server_url: "/rest".to_string(),
            rest_content_type: "text/plain".to_string(),
            rpc_encode_keys: true,
        }
    }
}

impl Config {
    pub const CLIENT_TYPE: &'static str = "client_type";
    pub const HOST: &'static str = "host";
    pub const PORT: &'static str = "port";
    pub const CACHE: &'static str = "cache";
    pub const TIMEOUT_MS: &'static str = "timeout_ms";
    pub const EXIT_ON_ERROR: &'static str = "exit_on_error";
    pub const DEFAULT_CODEC: &'static str = "default_codec";
    pub const REST_SERVER_URL: &'static str = "rest.server_url";
    pub const REST_CONTENT_TYPE: &'static str = "rest.content_type";
    pub const RPC_ENCODE_KEYS: &'static str = "rpc.encode_keys";

    /// Every key accepted by [`Config::set`], sorted
    pub const KNOWN_KEYS: [&'static str; 10] = [
        Self::CACHE,
        Self::CLIENT_TYPE,
        Self::DEFAULT_CODEC,
        Self::EXIT_ON_ERROR,
        Self::HOST,
        Self::PORT,
        Self::REST_CONTENT_TYPE,
        Self::REST_SERVER_URL,
        Self::RPC_ENCODE_KEYS,
        Self::TIMEOUT_MS,
    ];

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Set a single value by its flat key name
    ///
    /// Unknown keys and unparseable values are rejected and leave the
    /// record untouched.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            Self::CLIENT_TYPE => self.client_type = value.parse()?,
            Self::HOST => self.host = value.to_string(),
            Self::PORT => {
                self.port = value
                    .parse()
                    .map_err(|_| CacheError::Config(format!("invalid port: {}", value)))?
            }
            Self::CACHE => self.cache_name = value.to_string(),
            Self::TIMEOUT_MS => {
                self.timeout_ms = value
                    .parse()
                    .map_err(|_| CacheError::Config(format!("invalid timeout: {}", value)))?
            }
            Self::EXIT_ON_ERROR => self.exit_on_error = parse_bool(key, value)?,
            Self::DEFAULT_CODEC => {
                self.default_codec = value
                    .parse()
                    .map_err(|_| CacheError::Config(format!("unknown codec: {}", value)))?
            }
            Self::REST_SERVER_URL => self.rest_server_url = value.to_string(),
            Self::REST_CONTENT_TYPE => self.rest_content_type = value.to_string(),
            Self::RPC_ENCODE_KEYS => self.rpc_encode_keys = parse_bool(key, value)?,
            _ => return Err(CacheError::Config(format!("unknown config key: {}", key))),
        }
        Ok(())
    }

    /// Read a single value by its flat key name
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            Self::CLIENT_TYPE => self.client_type.to_string(),
            Self::HOST => self.host.clone(),
            Self::PORT => self.port.to_string(),
            Self::CACHE => self.cache_name.clone(),
            Self::TIMEOUT_MS => self.timeout_ms.to_string(),
            Self::EXIT_ON_ERROR => self.exit_on_error.to_string(),
            Self::DEFAULT_CODEC => self.default_codec.to_string(),
            Self::REST_SERVER_URL => self.rest_server_url.clone(),
            Self::REST_CONTENT_TYPE => self.rest_content_type.clone(),
            Self::RPC_ENCODE_KEYS => self.rpc_encode_keys.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// `host:port` pair, with IPv6 literals bracketed
    pub fn server_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in Self::KNOWN_KEYS {
            if let Some(value) = self.get(key) {
                writeln!(f, "{} = {}", key, value)?;
            }
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(CacheError::Config(format!(
            "{} expects a boolean, got: {}",
            key, value
        ))),
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the backend protocol
    pub fn client_type(mut self, kind: ClientKind) -> Self {
        self.config.client_type = kind;
        self
    }

    /// Set the server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the cache name (empty for the default cache)
    pub fn cache_name(mut self, name: impl Into<String>) -> Self {
        self.config.cache_name = name.into();
        self
    }

    /// Set the socket / HTTP timeout (in milliseconds)
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    pub fn exit_on_error(mut self, enabled: bool) -> Self {
        self.config.exit_on_error = enabled;
        self
    }

    /// Set the codec used for values when a command names none
    pub fn default_codec(mut self, codec: Codec) -> Self {
        self.config.default_codec = codec;
        self
    }

    /// Set the REST base path
    pub fn rest_server_url(mut self, url: impl Into<String>) -> Self {
        self.config.rest_server_url = url.into();
        self
    }

    /// Set the REST content type
    pub fn rest_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.config.rest_content_type = content_type.into();
        self
    }

    /// Toggle key encoding for the RPC backend
    pub fn rpc_encode_keys(mut self, enabled: bool) -> Self {
        self.config.rpc_encode_keys = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
