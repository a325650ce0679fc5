//! Cancellation and timeout around store calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use flowgrid_store::StoreResult;

use crate::error::{BackendError, BackendResult};

/// Run one store call, aborting on cancellation or after `timeout`.
pub(crate) async fn guarded<T, F>(
    cancel: &CancellationToken,
    timeout: Duration,
    operation: &'static str,
    index: &str,
    call: F,
) -> BackendResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    if cancel.is_cancelled() {
        return Err(BackendError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BackendError::Cancelled),
        result = tokio::time::timeout(timeout, call) => match result {
            Err(_) => Err(BackendError::TimedOut { index: index.to_string() }),
            Ok(r) => r.map_err(|e| BackendError::store(operation, index, e)),
        },
    }
}
