//! Error types for cachecon
//!
//! Every backend maps its native failure conditions into this one taxonomy
//! at the adapter boundary, so callers never see protocol-specific codes.

use thiserror::Error;

/// Result type alias using CacheError
pub type Result<T> = std::result::Result<T, CacheError>;

/// Unified error type for cache client operations
#[derive(Debug, Error)]
pub enum CacheError {
    // -------------------------------------------------------------------------
    // Precondition Outcomes
    // -------------------------------------------------------------------------
    /// The key does not exist, or a version precondition referenced a missing key
    #[error("NOT_FOUND")]
    NotFound,

    /// A version or put-if-absent precondition failed against an existing entry
    #[error("CONFLICT")]
    Conflict,

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    /// An argument is not representable by the selected backend
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    /// Network or protocol level failure talking to the server
    #[error("Transport error: {0}")]
    Transport(String),

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    /// Malformed or unrecognized binary input on decode
    #[error("Format error: {0}")]
    Format(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Transport(err.to_string())
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        CacheError::Transport(err.to_string())
    }
}
