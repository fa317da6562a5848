//! Framing encode/decode
//!
//! Pure functions over byte slices. Both kinds share the header layout and
//! size-class rules; byte arrays add an element-type byte before the payload.

use crate::error::{CacheError, Result};

/// Leading format-version marker
pub const FORMAT_VERSION: u8 = 0x03;

const TAG_STRING_EMPTY: u8 = 0x3d;
const TAG_STRING_SMALL: u8 = 0x3e;
const TAG_STRING_MEDIUM: u8 = 0x3f;
const TAG_STRING_LARGE: u8 = 0x40;

const TAG_ARRAY_EMPTY: u8 = 0x41;
const TAG_ARRAY_SMALL: u8 = 0x42;
const TAG_ARRAY_MEDIUM: u8 = 0x43;
const TAG_ARRAY_LARGE: u8 = 0x44;

/// Element type of a byte array (primitive byte)
const ELEMENT_BYTE: u8 = 0x21;

const SMALL_MAX: usize = 0x100;
const MEDIUM_MAX: usize = 0x10000;

/// Length bucket that decides the width of the length field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    Empty,
    Small,
    Medium,
    Large,
}

impl SizeClass {
    /// Pick the size class for a payload length
    pub fn for_len(len: usize) -> Self {
        match len {
            0 => SizeClass::Empty,
            1..=SMALL_MAX => SizeClass::Small,
            n if n <= MEDIUM_MAX => SizeClass::Medium,
            _ => SizeClass::Large,
        }
    }
}

/// The two value kinds the format distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    String,
    ByteArray,
}

impl Kind {
    fn tag(self, class: SizeClass) -> u8 {
        match (self, class) {
            (Kind::String, SizeClass::Empty) => TAG_STRING_EMPTY,
            (Kind::String, SizeClass::Small) => TAG_STRING_SMALL,
            (Kind::String, SizeClass::Medium) => TAG_STRING_MEDIUM,
            (Kind::String, SizeClass::Large) => TAG_STRING_LARGE,
            (Kind::ByteArray, SizeClass::Empty) => TAG_ARRAY_EMPTY,
            (Kind::ByteArray, SizeClass::Small) => TAG_ARRAY_SMALL,
            (Kind::ByteArray, SizeClass::Medium) => TAG_ARRAY_MEDIUM,
            (Kind::ByteArray, SizeClass::Large) => TAG_ARRAY_LARGE,
        }
    }

    fn class_of(self, tag: u8) -> Option<SizeClass> {
        match (self, tag) {
            (Kind::String, TAG_STRING_EMPTY) | (Kind::ByteArray, TAG_ARRAY_EMPTY) => {
                Some(SizeClass::Empty)
            }
            (Kind::String, TAG_STRING_SMALL) | (Kind::ByteArray, TAG_ARRAY_SMALL) => {
                Some(SizeClass::Small)
            }
            (Kind::String, TAG_STRING_MEDIUM) | (Kind::ByteArray, TAG_ARRAY_MEDIUM) => {
                Some(SizeClass::Medium)
            }
            (Kind::String, TAG_STRING_LARGE) | (Kind::ByteArray, TAG_ARRAY_LARGE) => {
                Some(SizeClass::Large)
            }
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::ByteArray => "byte array",
        }
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a UTF-8 string
pub fn encode_string(value: &str) -> Vec<u8> {
    encode(Kind::String, value.as_bytes())
}

/// Encode a byte array
pub fn encode_bytes(value: &[u8]) -> Vec<u8> {
    encode(Kind::ByteArray, value)
}

fn encode(kind: Kind, payload: &[u8]) -> Vec<u8> {
    let len = payload.len();
    let class = SizeClass::for_len(len);

    // version + tag + widest length field + element byte
    let mut out = Vec::with_capacity(2 + 4 + 1 + len);
    out.push(FORMAT_VERSION);
    out.push(kind.tag(class));

    match class {
        SizeClass::Empty => {}
        // 256 wraps to 0 in one byte, 65536 wraps to 0 in two
        SizeClass::Small => out.push(len as u8),
        SizeClass::Medium => out.extend_from_slice(&(len as u16).to_be_bytes()),
        SizeClass::Large => out.extend_from_slice(&(len as u32).to_be_bytes()),
    }

    if kind == Kind::ByteArray {
        out.push(ELEMENT_BYTE);
    }
    out.extend_from_slice(payload);
    out
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a framed string
pub fn decode_string(bytes: &[u8]) -> Result<String> {
    let payload = decode(Kind::String, bytes)?;
    String::from_utf8(payload.to_vec())
        .map_err(|_| CacheError::Format("string payload is not valid UTF-8".to_string()))
}

/// Decode a framed byte array
pub fn decode_bytes(bytes: &[u8]) -> Result<Vec<u8>> {
    decode(Kind::ByteArray, bytes).map(<[u8]>::to_vec)
}

fn decode(kind: Kind, bytes: &[u8]) -> Result<&[u8]> {
    if bytes.len() < 2 {
        return Err(CacheError::Format(format!(
            "Incomplete header: expected 2 bytes, got {}",
            bytes.len()
        )));
    }

    if bytes[0] != FORMAT_VERSION {
        return Err(CacheError::Format(format!(
            "Unknown format version: 0x{:02x}",
            bytes[0]
        )));
    }

    let tag = bytes[1];
    let class = kind.class_of(tag).ok_or_else(|| {
        CacheError::Format(format!("Invalid {} tag: 0x{:02x}", kind.name(), tag))
    })?;

    let rest = &bytes[2..];
    let (len, rest) = match class {
        SizeClass::Empty => (0, rest),
        SizeClass::Small => {
            let field = take(rest, 1)?;
            let len = match field[0] {
                0 => SMALL_MAX,
                n => n as usize,
            };
            (len, &rest[1..])
        }
        SizeClass::Medium => {
            let field = take(rest, 2)?;
            let len = match u16::from_be_bytes([field[0], field[1]]) {
                0 => MEDIUM_MAX,
                n => n as usize,
            };
            (len, &rest[2..])
        }
        SizeClass::Large => {
            let field = take(rest, 4)?;
            let len = i32::from_be_bytes([field[0], field[1], field[2], field[3]]);
            if len < 0 {
                return Err(CacheError::Format(format!("Negative length: {}", len)));
            }
            (len as usize, &rest[4..])
        }
    };

    let rest = if kind == Kind::ByteArray {
        let element = take(rest, 1)?;
        if element[0] != ELEMENT_BYTE {
            return Err(CacheError::Format(format!(
                "Invalid byte array element type: 0x{:02x}",
                element[0]
            )));
        }
        &rest[1..]
    } else {
        rest
    };

    let payload = take(rest, len)?;
    if rest.len() > len {
        return Err(CacheError::Format(format!(
            "Trailing data: {} bytes after payload",
            rest.len() - len
        )));
    }

    Ok(payload)
}

/// Borrow exactly `n` leading bytes or fail as truncated input
fn take(bytes: &[u8], n: usize) -> Result<&[u8]> {
    if bytes.len() < n {
        return Err(CacheError::Format(format!(
            "Truncated input: expected {} bytes, got {}",
            n,
            bytes.len()
        )));
    }
    Ok(&bytes[..n])
}
