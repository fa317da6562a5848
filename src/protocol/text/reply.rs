//! Reply parsing
//!
//! Reads one reply from the server. Error lines are turned into transport
//! errors here; everything else is returned as a [`Reply`].

use std::io::{BufRead, Read};

use super::command::MAX_KEY_LEN;
use crate::error::{CacheError, Result};

/// Longest status / header line we accept
const MAX_LINE_LEN: usize = MAX_KEY_LEN + 128;

/// Largest data block we accept (64 MB)
const MAX_DATA_LEN: usize = 64 * 1024 * 1024;

/// One retrieved item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: Vec<u8>,
    pub flags: u32,
    pub data: Vec<u8>,
    /// Present for `gets`
    pub cas: Option<u64>,
}

/// Server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Stored,
    NotStored,
    Exists,
    NotFound,
    Deleted,
    Ok,
    /// `END` without any item
    Miss,
    Value(Item),
}

fn protocol_error(msg: String) -> CacheError {
    CacheError::Transport(format!("Protocol error: {}", msg))
}

/// Read one CRLF-terminated line, without the terminator
fn read_line<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    let read = reader
        .by_ref()
        .take(MAX_LINE_LEN as u64 + 2)
        .read_until(b'\n', &mut line)?;

    if read == 0 {
        return Err(CacheError::Transport("connection closed by server".to_string()));
    }
    if !line.ends_with(b"\r\n") {
        return Err(protocol_error("reply line not terminated by CRLF".to_string()));
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

fn parse_number<T: std::str::FromStr>(field: Option<&str>, what: &str) -> Result<T> {
    field
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| protocol_error(format!("invalid {} in VALUE line", what)))
}

/// Read a complete reply from a stream
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply> {
    let line = read_line(reader)?;
    let text = String::from_utf8_lossy(&line);

    let reply = match &*text {
        "STORED" => Reply::Stored,
        "NOT_STORED" => Reply::NotStored,
        "EXISTS" => Reply::Exists,
        "NOT_FOUND" => Reply::NotFound,
        "DELETED" => Reply::Deleted,
        "OK" => Reply::Ok,
        "END" => Reply::Miss,
        "ERROR" => {
            return Err(CacheError::Transport("server rejected the command".to_string()))
        }
        other if other.starts_with("CLIENT_ERROR") || other.starts_with("SERVER_ERROR") => {
            return Err(CacheError::Transport(other.to_string()))
        }
        other if other.starts_with("VALUE ") => {
            let item = read_item(reader, other)?;
            let end = read_line(reader)?;
            if end != b"END" {
                return Err(protocol_error("expected END after single item".to_string()));
            }
            Reply::Value(item)
        }
        other => return Err(protocol_error(format!("unexpected reply: {}", other))),
    };

    Ok(reply)
}

fn read_item<R: BufRead>(reader: &mut R, header: &str) -> Result<Item> {
    let mut fields = header.split(' ').skip(1);

    let key = fields
        .next()
        .ok_or_else(|| protocol_error("missing key in VALUE line".to_string()))?
        .as_bytes()
        .to_vec();
    let flags: u32 = parse_number(fields.next(), "flags")?;
    let len: usize = parse_number(fields.next(), "length")?;
    let cas = match fields.next() {
        Some(field) => Some(parse_number(Some(field), "cas")?),
        None => None,
    };

    if len > MAX_DATA_LEN {
        return Err(protocol_error(format!(
            "Data block too large: {} bytes (max {})",
            len, MAX_DATA_LEN
        )));
    }

    // Data block plus its CRLF
    let mut data = vec![0u8; len + 2];
    reader.read_exact(&mut data)?;
    if !data.ends_with(b"\r\n") {
        return Err(protocol_error("data block not terminated by CRLF".to_string()));
    }
    data.truncate(len);

    Ok(Item {
        key,
        flags,
        data,
        cas,
    })
}
