//! Error types for document store calls.

use thiserror::Error;

/// Result type alias for document store calls.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{operation} {target}: transport error: {reason}")]
    Transport {
        operation: &'static str,
        target: String,
        reason: String,
    },

    #[error("{operation} {target}: status {status}: {body}")]
    Status {
        operation: &'static str,
        target: String,
        status: u16,
        body: String,
    },

    #[error("{operation} {target}: malformed response: {reason}")]
    Decode {
        operation: &'static str,
        target: String,
        reason: String,
    },

    #[error("serialization error: {0}")]
    Serialize(String),
}

impl StoreError {
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
