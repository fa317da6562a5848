//! Command formatting
//!
//! Builds request lines for the text protocol.

use crate::error::{CacheError, Result};

/// Longest key the protocol accepts
pub const MAX_KEY_LEN: usize = 250;

/// Largest relative expiration time (30 days); beyond it servers read the
/// value as an absolute unix timestamp
pub const MAX_EXPTIME_SECONDS: u32 = 60 * 60 * 24 * 30;

/// Storage verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreVerb {
    /// Unconditional store
    Set,
    /// Store only if absent
    Add,
    /// Store only if the check value matches
    Cas,
}

impl StoreVerb {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreVerb::Set => "set",
            StoreVerb::Add => "add",
            StoreVerb::Cas => "cas",
        }
    }
}

/// A single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextCommand {
    Store {
        verb: StoreVerb,
        key: Vec<u8>,
        flags: u32,
        exptime: u32,
        value: Vec<u8>,
        /// Check value, only sent with `cas`
        cas: Option<u64>,
    },

    /// Plain read
    Get { key: Vec<u8> },

    /// Read including the check value
    Gets { key: Vec<u8> },

    Delete { key: Vec<u8> },

    FlushAll,
}

impl TextCommand {
    /// Encode the command line (and data block) to bytes
    pub fn encode(&self) -> Vec<u8> {
        match self {
            TextCommand::Store {
                verb,
                key,
                flags,
                exptime,
                value,
                cas,
            } => {
                let mut out = Vec::with_capacity(key.len() + value.len() + 48);
                out.extend_from_slice(verb.as_str().as_bytes());
                out.push(b' ');
                out.extend_from_slice(key);
                out.extend_from_slice(format!(" {} {} {}", flags, exptime, value.len()).as_bytes());
                if let Some(cas) = cas {
                    out.extend_from_slice(format!(" {}", cas).as_bytes());
                }
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(value);
                out.extend_from_slice(b"\r\n");
                out
            }
            TextCommand::Get { key } => keyed_line("get", key),
            TextCommand::Gets { key } => keyed_line("gets", key),
            TextCommand::Delete { key } => keyed_line("delete", key),
            TextCommand::FlushAll => b"flush_all\r\n".to_vec(),
        }
    }
}

fn keyed_line(verb: &str, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(verb.len() + key.len() + 3);
    out.extend_from_slice(verb.as_bytes());
    out.push(b' ');
    out.extend_from_slice(key);
    out.extend_from_slice(b"\r\n");
    out
}

/// Reject keys the line format cannot carry
pub fn validate_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::Validation("key must not be empty".to_string()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(CacheError::Validation(format!(
            "key is {} bytes, the text protocol allows at most {}",
            key.len(),
            MAX_KEY_LEN
        )));
    }
    if key.iter().any(|b| b.is_ascii_whitespace() || b.is_ascii_control()) {
        return Err(CacheError::Validation(
            "key must not contain whitespace or control characters".to_string(),
        ));
    }
    Ok(())
}
