//! Error types for query construction.

use thiserror::Error;

/// Result type alias for query construction.
pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("policy match must set at least one of tier, namespace, name or action")]
    EmptyPolicyMatch,

    #[error("invalid time range: from {from} is after to {to}")]
    InvalidTimeRange { from: String, to: String },

    #[error("label selector {0:?} has no values")]
    EmptySelector(String),
}
