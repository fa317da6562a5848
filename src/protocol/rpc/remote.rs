//! Remote cache handle
//!
//! Issues RPC requests over one connection and reports native results:
//! booleans for plain conditional operations and [`VersionedWrite`] codes
//! for version-conditioned ones. Mapping these onto the client error
//! vocabulary is the adapter's job.

use super::{
    encode_request, read_response, Command, Request, Response, ResponseBody, Status,
    ERROR_OPCODE,
};
use crate::error::{CacheError, Result};
use crate::network::Connection;

/// Native result of a version-conditioned replace or remove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum VersionedWrite {
    Applied = 1,
    KeyMissing = 0,
    VersionMismatch = -1,
}

impl VersionedWrite {
    /// Numeric return code (1, 0 or -1)
    pub fn code(self) -> i8 {
        self as i8
    }
}

/// Handle to one named cache on one server
pub struct RemoteCache {
    conn: Connection,
    cache_name: Vec<u8>,
    next_message_id: u64,
}

impl RemoteCache {
    /// Connect to `addr` and address `cache_name` (empty for the default cache)
    pub fn connect(addr: &str, cache_name: &str, timeout_ms: u64) -> Result<Self> {
        let conn = Connection::connect(addr, timeout_ms)?;
        Ok(Self::new(conn, cache_name))
    }

    /// Wrap an existing connection
    pub fn new(conn: Connection, cache_name: &str) -> Self {
        Self {
            conn,
            cache_name: cache_name.as_bytes().to_vec(),
            next_message_id: 1,
        }
    }

    /// Send one command and read its response
    ///
    /// Error responses and mismatched headers become transport errors.
    fn execute(&mut self, command: Command) -> Result<Response> {
        let message_id = self.next_message_id;
        self.next_message_id = self.next_message_id.wrapping_add(1);

        let opcode = command.opcode();
        let request = Request {
            message_id,
            cache_name: self.cache_name.clone(),
            command,
        };

        tracing::debug!("RPC {:?} (message {}) to {}", opcode, message_id, self.conn.peer_addr());
        // A reply for another message means the stream is out of step
        let response = self.conn.exchange(&encode_request(&request), |reader| {
            let response = read_response(reader)?;
            if response.message_id != message_id {
                return Err(CacheError::Transport(format!(
                    "Protocol error: response for message {} while waiting for {}",
                    response.message_id, message_id
                )));
            }
            Ok(response)
        })?;
        tracing::trace!("RPC response: {:?}", response.status);

        if response.opcode == ERROR_OPCODE || response.status.is_error() {
            let message = match &response.body {
                ResponseBody::Error(message) => message.as_str(),
                _ => "no message",
            };
            return Err(CacheError::Transport(format!(
                "server error {:?} (0x{:02x}): {}",
                response.status, response.status as u8, message
            )));
        }

        if response.opcode != opcode.response_code() {
            return Err(CacheError::Transport(format!(
                "Protocol error: response opcode 0x{:02x} for request {:?}",
                response.opcode, opcode
            )));
        }

        Ok(response)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub fn put(&mut self, key: &[u8], value: &[u8], lifespan: u32, max_idle: u32) -> Result<()> {
        self.execute(Command::Put {
            key: key.to_vec(),
            value: value.to_vec(),
            lifespan,
            max_idle,
        })?;
        Ok(())
    }

    /// Returns whether the entry was stored
    pub fn put_if_absent(
        &mut self,
        key: &[u8],
        value: &[u8],
        lifespan: u32,
        max_idle: u32,
    ) -> Result<bool> {
        let response = self.execute(Command::PutIfAbsent {
            key: key.to_vec(),
            value: value.to_vec(),
            lifespan,
            max_idle,
        })?;
        Ok(response.status == Status::Success)
    }

    pub fn replace_with_version(
        &mut self,
        key: &[u8],
        value: &[u8],
        version: i64,
        lifespan: u32,
        max_idle: u32,
    ) -> Result<VersionedWrite> {
        let response = self.execute(Command::ReplaceIfUnmodified {
            key: key.to_vec(),
            value: value.to_vec(),
            version,
            lifespan,
            max_idle,
        })?;
        versioned_result(response.status)
    }

    /// Returns whether an entry was removed
    pub fn remove(&mut self, key: &[u8]) -> Result<bool> {
        let response = self.execute(Command::Remove { key: key.to_vec() })?;
        Ok(response.status == Status::Success)
    }

    pub fn remove_with_version(&mut self, key: &[u8], version: i64) -> Result<VersionedWrite> {
        let response = self.execute(Command::RemoveIfUnmodified {
            key: key.to_vec(),
            version,
        })?;
        versioned_result(response.status)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.execute(Command::Clear)?;
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let response = self.execute(Command::Get { key: key.to_vec() })?;
        match response.body {
            ResponseBody::Value(value) => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    /// Value together with its numeric entry version
    pub fn get_versioned(&mut self, key: &[u8]) -> Result<Option<(i64, Vec<u8>)>> {
        let response = self.execute(Command::GetWithVersion { key: key.to_vec() })?;
        match response.body {
            ResponseBody::Versioned { version, value } => Ok(Some((version, value))),
            _ => Ok(None),
        }
    }

    pub fn contains_key(&mut self, key: &[u8]) -> Result<bool> {
        let response = self.execute(Command::ContainsKey { key: key.to_vec() })?;
        Ok(response.status == Status::Success)
    }

    /// Round-trip a ping to check the connection
    pub fn ping(&mut self) -> Result<()> {
        self.execute(Command::Ping)?;
        Ok(())
    }
}

fn versioned_result(status: Status) -> Result<VersionedWrite> {
    match status {
        Status::Success => Ok(VersionedWrite::Applied),
        Status::KeyDoesNotExist => Ok(VersionedWrite::KeyMissing),
        Status::NotExecuted => Ok(VersionedWrite::VersionMismatch),
        other => Err(CacheError::Transport(format!(
            "unexpected status for versioned operation: {:?}",
            other
        ))),
    }
}
