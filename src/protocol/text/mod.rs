//! Text line protocol
//!
//! memcached-compatible ASCII protocol. Every command is one CRLF-terminated
//! line; storage commands are followed by a data block of exactly `<bytes>`
//! bytes and its own CRLF.
//!
//! ## Commands
//! ```text
//! set|add <key> <flags> <exptime> <bytes>\r\n<data>\r\n
//! cas <key> <flags> <exptime> <bytes> <cas>\r\n<data>\r\n
//! get|gets <key>\r\n
//! delete <key>\r\n
//! flush_all\r\n
//! ```
//!
//! ## Replies
//! - `STORED`, `NOT_STORED`, `EXISTS`, `NOT_FOUND`, `DELETED`, `OK`
//! - `VALUE <key> <flags> <bytes> [<cas>]` + data, terminated by `END`
//! - `ERROR`, `CLIENT_ERROR <msg>`, `SERVER_ERROR <msg>`

mod command;
mod reply;
mod session;

pub use command::{validate_key, StoreVerb, TextCommand, MAX_EXPTIME_SECONDS, MAX_KEY_LEN};
pub use reply::{read_reply, Item, Reply};
pub use session::TextSession;
pub(crate) use session::unexpected;
