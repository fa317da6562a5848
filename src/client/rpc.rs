//! RPC backend
//!
//! Maps the client contract onto [`RemoteCache`]. Versions are signed
//! 64-bit counters; keys may be framed with the string codec first.

use std::borrow::Cow;

use super::{CacheClient, Entry, PutOptions, VersionToken, WriteMode};
use crate::codec::encode_string;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::protocol::rpc::{RemoteCache, VersionedWrite};

pub struct RpcClient {
    remote: RemoteCache,

    /// Frame keys with the string codec before sending
    encode_keys: bool,
}

impl RpcClient {
    pub fn connect(config: &Config) -> Result<Self> {
        let remote =
            RemoteCache::connect(&config.server_addr(), &config.cache_name, config.timeout_ms)?;
        Ok(Self::new(remote, config.rpc_encode_keys))
    }

    pub fn new(remote: RemoteCache, encode_keys: bool) -> Self {
        Self { remote, encode_keys }
    }

    /// Key as sent on the wire
    fn wire_key<'a>(&self, key: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        if !self.encode_keys {
            return Ok(Cow::Borrowed(key));
        }
        let text = std::str::from_utf8(key).map_err(|_| {
            CacheError::Validation("key encoding requires a UTF-8 key".to_string())
        })?;
        Ok(Cow::Owned(encode_string(text)))
    }
}

fn parse_version(token: &VersionToken) -> Result<i64> {
    token.parse_numeric("rpc")
}

fn versioned_outcome(result: VersionedWrite) -> Result<()> {
    match result {
        VersionedWrite::Applied => Ok(()),
        VersionedWrite::KeyMissing => Err(CacheError::NotFound),
        VersionedWrite::VersionMismatch => Err(CacheError::Conflict),
    }
}

impl CacheClient for RpcClient {
    fn put(&mut self, key: &[u8], value: &[u8], options: &PutOptions) -> Result<()> {
        let lifespan = options.lifespan.unwrap_or(0);
        let max_idle = options.max_idle.unwrap_or(0);

        match options.write_mode() {
            WriteMode::Versioned(token) => {
                // Validate before touching the network
                let version = parse_version(token)?;
                let key = self.wire_key(key)?;
                let result =
                    self.remote
                        .replace_with_version(&key, value, version, lifespan, max_idle)?;
                versioned_outcome(result)
            }
            WriteMode::IfAbsent => {
                let key = self.wire_key(key)?;
                if self.remote.put_if_absent(&key, value, lifespan, max_idle)? {
                    Ok(())
                } else {
                    Err(CacheError::Conflict)
                }
            }
            WriteMode::Unconditional => {
                let key = self.wire_key(key)?;
                self.remote.put(&key, value, lifespan, max_idle)
            }
        }
    }

    fn get(&mut self, key: &[u8], want_version: bool) -> Result<Entry> {
        let key = self.wire_key(key)?;
        if want_version {
            let (version, value) = self.remote.get_versioned(&key)?.ok_or(CacheError::NotFound)?;
            Ok(Entry {
                value,
                version: Some(VersionToken::new(version.to_string())),
            })
        } else {
            let value = self.remote.get(&key)?.ok_or(CacheError::NotFound)?;
            Ok(Entry {
                value,
                version: None,
            })
        }
    }

    fn exists(&mut self, key: &[u8]) -> Result<()> {
        let key = self.wire_key(key)?;
        if self.remote.contains_key(&key)? {
            Ok(())
        } else {
            Err(CacheError::NotFound)
        }
    }

    fn delete(&mut self, key: &[u8], version: Option<&VersionToken>) -> Result<()> {
        match version {
            Some(token) => {
                let version = parse_version(token)?;
                let key = self.wire_key(key)?;
                versioned_outcome(self.remote.remove_with_version(&key, version)?)
            }
            None => {
                let key = self.wire_key(key)?;
                if self.remote.remove(&key)? {
                    Ok(())
                } else {
                    Err(CacheError::NotFound)
                }
            }
        }
    }

    fn clear(&mut self) -> Result<()> {
        self.remote.clear()
    }
}
