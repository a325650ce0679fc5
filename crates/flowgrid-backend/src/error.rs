//! Error types for the backends.

use thiserror::Error;

use flowgrid_core::CoreError;
use flowgrid_query::QueryError;
use flowgrid_store::StoreError;

/// Result type alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("{operation} {index}: {source}")]
    Store {
        operation: &'static str,
        index: String,
        #[source]
        source: StoreError,
    },

    #[error("timed out querying {index}")]
    TimedOut { index: String },

    #[error("request cancelled")]
    Cancelled,

    #[error("error fetching composite results: {0} missing from response")]
    MissingCompositeKey(String),

    #[error("Could not parse startFrom ({0}) as an integer")]
    BadStartFrom(String),

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    /// More documents matched than the offset window holds, and the listing
    /// began on offsets. Restarting it pages through a point in time.
    #[error("{index} grew past the {cutoff} document window while paging; restart the listing")]
    WindowExhausted { index: String, cutoff: usize },

    #[error("failed to initialize {index}: {reason}")]
    Initialize { index: String, reason: String },
}

impl BackendError {
    pub fn store(operation: &'static str, index: impl Into<String>, source: StoreError) -> Self {
        BackendError::Store {
            operation,
            index: index.into(),
            source,
        }
    }

    /// Whether this is the tenant-isolation rejection.
    pub fn is_bad_tenant(&self) -> bool {
        matches!(self, BackendError::Core(CoreError::BadTenant))
    }
}
