//! Text protocol session
//!
//! One request/reply exchange at a time over a single connection.

use super::{read_reply, Item, Reply, StoreVerb, TextCommand};
use crate::error::{CacheError, Result};
use crate::network::Connection;

pub struct TextSession {
    conn: Connection,
}

impl TextSession {
    pub fn connect(addr: &str, timeout_ms: u64) -> Result<Self> {
        Ok(Self::new(Connection::connect(addr, timeout_ms)?))
    }

    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Send a command and read its reply
    pub fn execute(&mut self, command: &TextCommand) -> Result<Reply> {
        tracing::debug!("Text command {} to {}", verb_of(command), self.conn.peer_addr());
        let reply = self.conn.exchange(&command.encode(), read_reply)?;
        tracing::trace!("Text reply: {:?}", reply);
        Ok(reply)
    }

    /// Issue `set`, `add` or `cas`
    pub fn store(
        &mut self,
        verb: StoreVerb,
        key: &[u8],
        value: &[u8],
        exptime: u32,
        cas: Option<u64>,
    ) -> Result<Reply> {
        self.execute(&TextCommand::Store {
            verb,
            key: key.to_vec(),
            flags: 0,
            exptime,
            value: value.to_vec(),
            cas,
        })
    }

    /// Read an item; `with_cas` uses `gets` to obtain the check value
    pub fn retrieve(&mut self, key: &[u8], with_cas: bool) -> Result<Option<Item>> {
        let command = if with_cas {
            TextCommand::Gets { key: key.to_vec() }
        } else {
            TextCommand::Get { key: key.to_vec() }
        };

        match self.execute(&command)? {
            Reply::Value(item) => {
                if item.key != key {
                    return Err(CacheError::Transport(
                        "Protocol error: reply for a different key".to_string(),
                    ));
                }
                Ok(Some(item))
            }
            Reply::Miss => Ok(None),
            other => Err(unexpected(other)),
        }
    }

    /// Returns whether an item was deleted
    pub fn delete(&mut self, key: &[u8]) -> Result<bool> {
        match self.execute(&TextCommand::Delete { key: key.to_vec() })? {
            Reply::Deleted => Ok(true),
            Reply::NotFound => Ok(false),
            other => Err(unexpected(other)),
        }
    }

    pub fn flush_all(&mut self) -> Result<()> {
        match self.execute(&TextCommand::FlushAll)? {
            Reply::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

fn verb_of(command: &TextCommand) -> &'static str {
    match command {
        TextCommand::Store { verb, .. } => verb.as_str(),
        TextCommand::Get { .. } => "get",
        TextCommand::Gets { .. } => "gets",
        TextCommand::Delete { .. } => "delete",
        TextCommand::FlushAll => "flush_all",
    }
}

/// Error for a reply that is well-formed but wrong for the command
pub(crate) fn unexpected(reply: Reply) -> CacheError {
    CacheError::Transport(format!("unexpected reply: {:?}", reply))
}
