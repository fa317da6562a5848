//! Binary RPC protocol
//!
//! ## Request Format
//! ```text
//! ┌───────────┬────────────┬─────────┬──────────┬───────────────┬───────────┐
//! │ 0xA0 (1)  │ MsgId (vL) │ Ver (1) │ Op (1)   │ Cache (vI+n)  │ Flags(vI) │
//! ├───────────┴──┬─────────┴──────┬──┴──────────┴───────────────┴───────────┤
//! │ Intel (1)    │ Topology (vI)  │ TxType (1) │ Body (per opcode)          │
//! └──────────────┴────────────────┴────────────┴────────────────────────────┘
//! ```
//!
//! ## Response Format
//! ```text
//! ┌───────────┬────────────┬──────────┬────────────┬──────────────┬────────┐
//! │ 0xA1 (1)  │ MsgId (vL) │ Op (1)   │ Status (1) │ TopoMark (1) │  Body  │
//! └───────────┴────────────┴──────────┴────────────┴──────────────┴────────┘
//! ```
//!
//! `vI`/`vL` are unsigned variable-length integers (7 bits per byte, low
//! group first). Byte arrays are a `vI` length followed by the bytes;
//! entry versions are 8-byte big-endian.
//!
//! ### Status Codes
//! - 0x00: success
//! - 0x01: not executed (precondition failed)
//! - 0x02: key does not exist
//! - 0x81..=0x86: server-reported error, body carries a message

mod codec;
mod remote;
mod request;
mod response;

pub use codec::{
    decode_request, decode_response, encode_request, encode_response, read_request,
    read_response, MAX_ARRAY_LEN, PROTOCOL_VERSION, REQUEST_MAGIC, RESPONSE_MAGIC,
};
pub use remote::{RemoteCache, VersionedWrite};
pub use request::{Command, Opcode, Request};
pub use response::{Response, ResponseBody, Status, ERROR_OPCODE};
