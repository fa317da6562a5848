//! Outcome of a client operation, as reported to the operator.

use std::fmt;

use super::VersionToken;
use crate::error::{CacheError, Result};

/// Everything a command can report upward
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Stored,
    Found {
        value: Vec<u8>,
        version: Option<VersionToken>,
    },
    Version(VersionToken),
    Exists,
    Deleted,
    NotFound,
    Conflict,
    Error(String),
}

impl Outcome {
    /// Fold an operation result into an outcome
    pub fn resolve<T>(result: Result<T>, on_success: impl FnOnce(T) -> Outcome) -> Self {
        match result {
            Ok(value) => on_success(value),
            Err(err) => Self::from_error(err),
        }
    }

    pub fn from_error(err: CacheError) -> Self {
        match err {
            CacheError::NotFound => Outcome::NotFound,
            CacheError::Conflict => Outcome::Conflict,
            other => Outcome::Error(other.to_string()),
        }
    }

    /// Process exit code: 0 on success, 2 not found, 3 conflict, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::NotFound => 2,
            Outcome::Conflict => 3,
            Outcome::Error(_) => 1,
            _ => 0,
        }
    }
}

/// Status line for the outcome (values are printed separately)
impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Stored => f.write_str("STORED"),
            Outcome::Found { version, .. } => match version {
                Some(version) => write!(f, "VERSION {}", version),
                None => Ok(()),
            },
            Outcome::Version(version) => write!(f, "{}", version),
            Outcome::Exists => f.write_str("EXISTS"),
            Outcome::Deleted => f.write_str("DELETED"),
            Outcome::NotFound => f.write_str("NOT_FOUND"),
            Outcome::Conflict => f.write_str("CONFLICT"),
            Outcome::Error(msg) => write!(f, "ERROR {}", msg),
        }
    }
}
