//! Request definitions
//!
//! Represents operations sent to the server.

/// Request opcodes; the matching response opcode is `opcode + 1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Put = 0x01,
    Get = 0x03,
    PutIfAbsent = 0x05,
    ReplaceIfUnmodified = 0x09,
    Remove = 0x0B,
    RemoveIfUnmodified = 0x0D,
    ContainsKey = 0x0F,
    GetWithVersion = 0x11,
    Clear = 0x13,
    Ping = 0x17,
}

impl Opcode {
    pub fn from_u8(byte: u8) -> Option<Self> {
        let opcode = match byte {
            0x01 => Opcode::Put,
            0x03 => Opcode::Get,
            0x05 => Opcode::PutIfAbsent,
            0x09 => Opcode::ReplaceIfUnmodified,
            0x0B => Opcode::Remove,
            0x0D => Opcode::RemoveIfUnmodified,
            0x0F => Opcode::ContainsKey,
            0x11 => Opcode::GetWithVersion,
            0x13 => Opcode::Clear,
            0x17 => Opcode::Ping,
            _ => return None,
        };
        Some(opcode)
    }

    /// Opcode the server answers with on success
    pub fn response_code(self) -> u8 {
        self as u8 + 1
    }
}

/// A single operation with its body fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Unconditional store
    Put {
        key: Vec<u8>,
        value: Vec<u8>,
        lifespan: u32,
        max_idle: u32,
    },

    /// Store only when the key is absent
    PutIfAbsent {
        key: Vec<u8>,
        value: Vec<u8>,
        lifespan: u32,
        max_idle: u32,
    },

    /// Store only when the entry version matches
    ReplaceIfUnmodified {
        key: Vec<u8>,
        value: Vec<u8>,
        version: i64,
        lifespan: u32,
        max_idle: u32,
    },

    Get { key: Vec<u8> },

    GetWithVersion { key: Vec<u8> },

    ContainsKey { key: Vec<u8> },

    Remove { key: Vec<u8> },

    /// Remove only when the entry version matches
    RemoveIfUnmodified { key: Vec<u8>, version: i64 },

    /// Remove every entry in the cache
    Clear,

    Ping,
}

impl Command {
    /// Get the opcode
    pub fn opcode(&self) -> Opcode {
        match self {
            Command::Put { .. } => Opcode::Put,
            Command::PutIfAbsent { .. } => Opcode::PutIfAbsent,
            Command::ReplaceIfUnmodified { .. } => Opcode::ReplaceIfUnmodified,
            Command::Get { .. } => Opcode::Get,
            Command::GetWithVersion { .. } => Opcode::GetWithVersion,
            Command::ContainsKey { .. } => Opcode::ContainsKey,
            Command::Remove { .. } => Opcode::Remove,
            Command::RemoveIfUnmodified { .. } => Opcode::RemoveIfUnmodified,
            Command::Clear => Opcode::Clear,
            Command::Ping => Opcode::Ping,
        }
    }
}

/// A framed request: header fields plus the command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Echoed back by the server in the response header
    pub message_id: u64,

    /// Target cache, empty for the server default
    pub cache_name: Vec<u8>,

    pub command: Command,
}
