//! Error types for request validation.

use thiserror::Error;

/// Result type alias for core validation.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised before a request reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("no cluster ID on request")]
    MissingCluster,

    #[error("bad tenant identifier")]
    BadTenant,

    #[error("invalid policy hit: {0}")]
    InvalidPolicyHit(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
