//! Codec Module
//!
//! Binary framing for single string / byte-array values, compatible with an
//! external marshalling format. Used by the RPC backend for keys and by the
//! console for values on request.
//!
//! ## Wire Format
//! ```text
//! ┌───────────┬─────────┬──────────────┬───────────────┬──────────────┐
//! │ Ver (1)   │ Tag (1) │ Len (0/1/2/4)│ Elem (1)*     │   Payload    │
//! └───────────┴─────────┴──────────────┴───────────────┴──────────────┘
//!                                        * byte arrays only
//! ```
//!
//! ### Size Classes
//! - empty:  no length field
//! - small:  1 byte,  0 means 256
//! - medium: 2 bytes big-endian, 0 means 65536
//! - large:  4 bytes big-endian

mod framing;

use std::fmt;
use std::str::FromStr;

use crate::error::{CacheError, Result};

pub use framing::{
    decode_bytes, decode_string, encode_bytes, encode_string, SizeClass, FORMAT_VERSION,
};

/// Selects how a value is framed before it is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    /// Pass bytes through untouched
    #[default]
    None,
    /// Framed UTF-8 string
    String,
    /// Framed byte array
    ByteArray,
}

impl Codec {
    /// Encode a raw value according to this codec
    pub fn encode(&self, value: &[u8]) -> Result<Vec<u8>> {
        match self {
            Codec::None => Ok(value.to_vec()),
            Codec::String => {
                let text = std::str::from_utf8(value).map_err(|_| {
                    CacheError::Format("string codec requires UTF-8 input".to_string())
                })?;
                Ok(encode_string(text))
            }
            Codec::ByteArray => Ok(encode_bytes(value)),
        }
    }

    /// Decode a framed value according to this codec
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        match self {
            Codec::None => Ok(bytes.to_vec()),
            Codec::String => decode_string(bytes).map(String::into_bytes),
            Codec::ByteArray => decode_bytes(bytes),
        }
    }
}

impl FromStr for Codec {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "raw" => Ok(Codec::None),
            "string" | "str" => Ok(Codec::String),
            "bytes" | "bytearray" | "byte-array" => Ok(Codec::ByteArray),
            other => Err(CacheError::Validation(format!("unknown codec: {}", other))),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Codec::None => "none",
            Codec::String => "string",
            Codec::ByteArray => "bytes",
        };
        f.write_str(name)
    }
}
