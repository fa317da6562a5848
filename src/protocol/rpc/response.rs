//! Response definitions
//!
//! Represents replies from the server.

/// Opcode of an error response
pub const ERROR_OPCODE: u8 = 0x50;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Success = 0x00,
    NotExecuted = 0x01,
    KeyDoesNotExist = 0x02,
    InvalidMagic = 0x81,
    UnknownCommand = 0x82,
    UnknownVersion = 0x83,
    ParseError = 0x84,
    ServerError = 0x85,
    Timeout = 0x86,
}

impl Status {
    pub fn from_u8(byte: u8) -> Option<Self> {
        let status = match byte {
            0x00 => Status::Success,
            0x01 => Status::NotExecuted,
            0x02 => Status::KeyDoesNotExist,
            0x81 => Status::InvalidMagic,
            0x82 => Status::UnknownCommand,
            0x83 => Status::UnknownVersion,
            0x84 => Status::ParseError,
            0x85 => Status::ServerError,
            0x86 => Status::Timeout,
            _ => return None,
        };
        Some(status)
    }

    /// True for the 0x8x family
    pub fn is_error(self) -> bool {
        (self as u8) & 0x80 != 0
    }
}

/// Body carried after the response header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Empty,

    /// Value of a successful get
    Value(Vec<u8>),

    /// Version and value of a successful versioned get
    Versioned { version: i64, value: Vec<u8> },

    /// Message of an error response
    Error(String),
}

/// A response from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub message_id: u64,
    pub opcode: u8,
    pub status: Status,
    pub body: ResponseBody,
}

impl Response {
    /// Body-less response with the given status
    pub fn status_only(message_id: u64, opcode: u8, status: Status) -> Self {
        Self {
            message_id,
            opcode,
            status,
            body: ResponseBody::Empty,
        }
    }

    /// Create an error response
    pub fn error(message_id: u64, status: Status, message: &str) -> Self {
        Self {
            message_id,
            opcode: ERROR_OPCODE,
            status,
            body: ResponseBody::Error(message.to_string()),
        }
    }
}
