//! Text protocol backend
//!
//! Maps the client contract onto [`TextSession`]. Versions are the
//! protocol's numeric check values. Only one expiry dimension exists, so
//! `max_idle` is rejected, and versioned deletes have no native form.

use super::{CacheClient, Entry, PutOptions, VersionToken, WriteMode};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::protocol::text::{
    unexpected, validate_key, Reply, StoreVerb, TextSession, MAX_EXPTIME_SECONDS,
};

pub struct TextClient {
    session: TextSession,
}

impl TextClient {
    pub fn connect(config: &Config) -> Result<Self> {
        if !config.cache_name.is_empty() {
            tracing::warn!(
                "text protocol has no named caches; ignoring cache '{}' and using the default",
                config.cache_name
            );
        }
        let session = TextSession::connect(&config.server_addr(), config.timeout_ms)?;
        Ok(Self::new(session))
    }

    pub fn new(session: TextSession) -> Self {
        Self { session }
    }
}

/// Expiration time for the store command, validated against the protocol
fn exptime(options: &PutOptions) -> Result<u32> {
    if let Some(max_idle) = options.max_idle {
        if max_idle > 0 {
            return Err(CacheError::Validation(
                "text client doesn't support max idle time".to_string(),
            ));
        }
    }

    match options.lifespan {
        Some(lifespan) if lifespan > MAX_EXPTIME_SECONDS => Err(CacheError::Validation(format!(
            "text client supports lifespan values only up to {} seconds (30 days)",
            MAX_EXPTIME_SECONDS
        ))),
        Some(lifespan) => Ok(lifespan),
        None => Ok(0),
    }
}

impl CacheClient for TextClient {
    fn put(&mut self, key: &[u8], value: &[u8], options: &PutOptions) -> Result<()> {
        validate_key(key)?;
        let exptime = exptime(options)?;

        match options.write_mode() {
            WriteMode::Versioned(token) => {
                let cas: u64 = token.parse_numeric("text")?;
                match self.session.store(StoreVerb::Cas, key, value, exptime, Some(cas))? {
                    Reply::Stored => Ok(()),
                    Reply::Exists => Err(CacheError::Conflict),
                    Reply::NotFound => Err(CacheError::NotFound),
                    // Cannot tell a mismatch from a missing key here
                    Reply::NotStored => {
                        tracing::debug!("cas answered NOT_STORED, reporting not found");
                        Err(CacheError::NotFound)
                    }
                    other => Err(unexpected(other)),
                }
            }
            WriteMode::IfAbsent => {
                match self.session.store(StoreVerb::Add, key, value, exptime, None)? {
                    Reply::Stored => Ok(()),
                    Reply::NotStored | Reply::Exists => Err(CacheError::Conflict),
                    other => Err(unexpected(other)),
                }
            }
            WriteMode::Unconditional => {
                match self.session.store(StoreVerb::Set, key, value, exptime, None)? {
                    Reply::Stored => Ok(()),
                    Reply::NotStored => Err(CacheError::Transport(
                        "server did not store the item".to_string(),
                    )),
                    other => Err(unexpected(other)),
                }
            }
        }
    }

    fn get(&mut self, key: &[u8], want_version: bool) -> Result<Entry> {
        validate_key(key)?;
        let item = self
            .session
            .retrieve(key, want_version)?
            .ok_or(CacheError::NotFound)?;

        let version = if want_version {
            let cas = item.cas.ok_or_else(|| {
                CacheError::Transport("couldn't obtain version info from the server".to_string())
            })?;
            Some(VersionToken::new(cas.to_string()))
        } else {
            None
        };

        Ok(Entry {
            value: item.data,
            version,
        })
    }

    fn delete(&mut self, key: &[u8], version: Option<&VersionToken>) -> Result<()> {
        if version.is_some() {
            return Err(CacheError::Validation(
                "versioned delete is not available for the text client".to_string(),
            ));
        }
        validate_key(key)?;

        if self.session.delete(key)? {
            Ok(())
        } else {
            Err(CacheError::NotFound)
        }
    }

    fn clear(&mut self) -> Result<()> {
        self.session.flush_all()
    }
}
