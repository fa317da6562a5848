//! Protocol codec
//!
//! Encoding and decoding functions for the binary RPC wire protocol.
//! Frames are built with `BytesMut` and parsed from any `Read`, so the same
//! functions serve both byte slices and live sockets.

use std::io::Read;

use bytes::{BufMut, BytesMut};

use super::{Command, Opcode, Request, Response, ResponseBody, Status, ERROR_OPCODE};
use crate::error::{CacheError, Result};

/// First byte of every request
pub const REQUEST_MAGIC: u8 = 0xA0;

/// First byte of every response
pub const RESPONSE_MAGIC: u8 = 0xA1;

/// Protocol version sent in the request header
pub const PROTOCOL_VERSION: u8 = 10;

/// Largest byte array accepted from the wire (64 MB)
pub const MAX_ARRAY_LEN: usize = 64 * 1024 * 1024;

/// Basic client intelligence: no topology updates requested
const CLIENT_INTELLIGENCE_BASIC: u8 = 0x01;

const NO_TRANSACTION: u8 = 0x00;

fn protocol_error(msg: String) -> CacheError {
    CacheError::Transport(format!("Protocol error: {}", msg))
}

// =============================================================================
// Primitive Writers
// =============================================================================

fn put_vint(buf: &mut BytesMut, mut value: u32) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

fn put_vlong(buf: &mut BytesMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

fn put_array(buf: &mut BytesMut, bytes: &[u8]) {
    put_vint(buf, bytes.len() as u32);
    buf.put_slice(bytes);
}

// =============================================================================
// Primitive Readers
// =============================================================================

fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    Ok(byte[0])
}

fn read_vint<R: Read>(reader: &mut R) -> Result<u32> {
    let mut value = 0u32;
    for shift in (0..35).step_by(7) {
        let byte = read_u8(reader)?;
        value |= ((byte & 0x7f) as u32) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(protocol_error("vint longer than 5 bytes".to_string()))
}

fn read_vlong<R: Read>(reader: &mut R) -> Result<u64> {
    let mut value = 0u64;
    for shift in (0..70).step_by(7) {
        let byte = read_u8(reader)?;
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(protocol_error("vlong longer than 10 bytes".to_string()))
}

fn read_i64<R: Read>(reader: &mut R) -> Result<i64> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(i64::from_be_bytes(bytes))
}

fn read_array<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let len = read_vint(reader)? as usize;

    // Validate array length
    if len > MAX_ARRAY_LEN {
        return Err(protocol_error(format!(
            "Array too large: {} bytes (max {})",
            len, MAX_ARRAY_LEN
        )));
    }

    let mut bytes = vec![0u8; len];
    if len > 0 {
        reader.read_exact(&mut bytes)?;
    }
    Ok(bytes)
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to bytes
pub fn encode_request(request: &Request) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(32 + request.cache_name.len());

    // Header
    buf.put_u8(REQUEST_MAGIC);
    put_vlong(&mut buf, request.message_id);
    buf.put_u8(PROTOCOL_VERSION);
    buf.put_u8(request.command.opcode() as u8);
    put_array(&mut buf, &request.cache_name);
    put_vint(&mut buf, 0); // flags
    buf.put_u8(CLIENT_INTELLIGENCE_BASIC);
    put_vint(&mut buf, 0); // topology id
    buf.put_u8(NO_TRANSACTION);

    // Body
    match &request.command {
        Command::Put {
            key,
            value,
            lifespan,
            max_idle,
        }
        | Command::PutIfAbsent {
            key,
            value,
            lifespan,
            max_idle,
        } => {
            put_array(&mut buf, key);
            put_vint(&mut buf, *lifespan);
            put_vint(&mut buf, *max_idle);
            put_array(&mut buf, value);
        }
        Command::ReplaceIfUnmodified {
            key,
            value,
            version,
            lifespan,
            max_idle,
        } => {
            put_array(&mut buf, key);
            put_vint(&mut buf, *lifespan);
            put_vint(&mut buf, *max_idle);
            buf.put_i64(*version);
            put_array(&mut buf, value);
        }
        Command::Get { key }
        | Command::GetWithVersion { key }
        | Command::ContainsKey { key }
        | Command::Remove { key } => {
            put_array(&mut buf, key);
        }
        Command::RemoveIfUnmodified { key, version } => {
            put_array(&mut buf, key);
            buf.put_i64(*version);
        }
        Command::Clear | Command::Ping => {}
    }

    buf.to_vec()
}

/// Read a complete request from a stream
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    let magic = read_u8(reader)?;
    if magic != REQUEST_MAGIC {
        return Err(protocol_error(format!("Invalid request magic: 0x{:02x}", magic)));
    }

    let message_id = read_vlong(reader)?;

    let version = read_u8(reader)?;
    if version != PROTOCOL_VERSION {
        return Err(protocol_error(format!("Unknown protocol version: {}", version)));
    }

    let opcode_byte = read_u8(reader)?;
    let opcode = Opcode::from_u8(opcode_byte)
        .ok_or_else(|| protocol_error(format!("Unknown opcode: 0x{:02x}", opcode_byte)))?;

    let cache_name = read_array(reader)?;
    let _flags = read_vint(reader)?;
    let _intelligence = read_u8(reader)?;
    let _topology_id = read_vint(reader)?;

    let tx_type = read_u8(reader)?;
    if tx_type != NO_TRANSACTION {
        return Err(protocol_error(format!("Unsupported transaction type: {}", tx_type)));
    }

    let command = match opcode {
        Opcode::Put | Opcode::PutIfAbsent => {
            let key = read_array(reader)?;
            let lifespan = read_vint(reader)?;
            let max_idle = read_vint(reader)?;
            let value = read_array(reader)?;
            if opcode == Opcode::Put {
                Command::Put {
                    key,
                    value,
                    lifespan,
                    max_idle,
                }
            } else {
                Command::PutIfAbsent {
                    key,
                    value,
                    lifespan,
                    max_idle,
                }
            }
        }
        Opcode::ReplaceIfUnmodified => {
            let key = read_array(reader)?;
            let lifespan = read_vint(reader)?;
            let max_idle = read_vint(reader)?;
            let version = read_i64(reader)?;
            let value = read_array(reader)?;
            Command::ReplaceIfUnmodified {
                key,
                value,
                version,
                lifespan,
                max_idle,
            }
        }
        Opcode::Get => Command::Get {
            key: read_array(reader)?,
        },
        Opcode::GetWithVersion => Command::GetWithVersion {
            key: read_array(reader)?,
        },
        Opcode::ContainsKey => Command::ContainsKey {
            key: read_array(reader)?,
        },
        Opcode::Remove => Command::Remove {
            key: read_array(reader)?,
        },
        Opcode::RemoveIfUnmodified => {
            let key = read_array(reader)?;
            let version = read_i64(reader)?;
            Command::RemoveIfUnmodified { key, version }
        }
        Opcode::Clear => Command::Clear,
        Opcode::Ping => Command::Ping,
    };

    Ok(Request {
        message_id,
        cache_name,
        command,
    })
}

/// Decode a request from bytes
///
/// The slice must hold exactly one request.
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    let mut cursor = bytes;
    let request = read_request(&mut cursor)?;
    if !cursor.is_empty() {
        return Err(protocol_error(format!(
            "{} trailing bytes after request",
            cursor.len()
        )));
    }
    Ok(request)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(16);

    buf.put_u8(RESPONSE_MAGIC);
    put_vlong(&mut buf, response.message_id);
    buf.put_u8(response.opcode);
    buf.put_u8(response.status as u8);
    buf.put_u8(0); // no topology change

    match &response.body {
        ResponseBody::Empty => {}
        ResponseBody::Value(value) => put_array(&mut buf, value),
        ResponseBody::Versioned { version, value } => {
            buf.put_i64(*version);
            put_array(&mut buf, value);
        }
        ResponseBody::Error(message) => put_array(&mut buf, message.as_bytes()),
    }

    buf.to_vec()
}

/// Read a complete response from a stream
///
/// Blocks until a complete response is received or an error occurs
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let magic = read_u8(reader)?;
    if magic != RESPONSE_MAGIC {
        return Err(protocol_error(format!("Invalid response magic: 0x{:02x}", magic)));
    }

    let message_id = read_vlong(reader)?;
    let opcode = read_u8(reader)?;

    let status_byte = read_u8(reader)?;
    let status = Status::from_u8(status_byte).ok_or_else(|| {
        protocol_error(format!("Unknown response status: 0x{:02x}", status_byte))
    })?;

    let topology_marker = read_u8(reader)?;
    if topology_marker != 0 {
        return Err(protocol_error(
            "Unexpected topology change for basic client".to_string(),
        ));
    }

    let body = if opcode == ERROR_OPCODE {
        let message = read_array(reader)?;
        ResponseBody::Error(String::from_utf8_lossy(&message).into_owned())
    } else if status != Status::Success {
        ResponseBody::Empty
    } else if opcode == Opcode::Get.response_code() {
        ResponseBody::Value(read_array(reader)?)
    } else if opcode == Opcode::GetWithVersion.response_code() {
        let version = read_i64(reader)?;
        let value = read_array(reader)?;
        ResponseBody::Versioned { version, value }
    } else {
        ResponseBody::Empty
    };

    Ok(Response {
        message_id,
        opcode,
        status,
        body,
    })
}

/// Decode a response from bytes
///
/// The slice must hold exactly one response.
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let mut cursor = bytes;
    let response = read_response(&mut cursor)?;
    if !cursor.is_empty() {
        return Err(protocol_error(format!(
            "{} trailing bytes after response",
            cursor.len()
        )));
    }
    Ok(response)
}
