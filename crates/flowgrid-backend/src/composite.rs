//! Composite aggregation paging.
//!
//! ```text
//!   after_key = None ──► search(size = 0, aggs.buckets = composite{after?})
//!                              │
//!              buckets.len() == size ? ──yes──► after_key = response.after_key
//!                              │
//!                              no ──► end of stream (after_key = None)
//! ```
//!
//! The cursor is the store's own composite key, so the number of groups
//! that can be listed is not limited by the store's search result window.

use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use flowgrid_core::AfterKey;
use flowgrid_store::{CompositeBucket, DocumentStore, SearchRequest};

use crate::aggregation::{AggregationSpec, COMPOSITE_NAME};
use crate::error::{BackendError, BackendResult};
use crate::guard::guarded;

/// One page of composite buckets.
#[derive(Debug, Clone, Default)]
pub struct CompositePage {
    pub buckets: Vec<CompositeBucket>,
    /// Cursor for the next page; `None` once the aggregation is exhausted.
    pub after_key: Option<AfterKey>,
    pub total_hits: i64,
}

pub struct CompositePager<'a, S: ?Sized> {
    store: &'a S,
    index: &'a str,
    query: &'a Value,
    spec: &'static AggregationSpec,
    size: usize,
    timeout: Duration,
}

impl<'a, S: DocumentStore + ?Sized> CompositePager<'a, S> {
    pub fn new(
        store: &'a S,
        index: &'a str,
        query: &'a Value,
        spec: &'static AggregationSpec,
        size: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            index,
            query,
            spec,
            size: size.max(1),
            timeout,
        }
    }

    /// The search issued for the page after `after`. Hits are not needed,
    /// only the aggregation.
    pub fn request(&self, after: Option<&AfterKey>) -> SearchRequest {
        SearchRequest::new(self.query.clone())
            .size(0)
            .track_total_hits(true)
            .aggregation(COMPOSITE_NAME, self.spec.composite(self.size, after))
    }

    pub async fn page(
        &self,
        after: Option<&AfterKey>,
        cancel: &CancellationToken,
    ) -> BackendResult<CompositePage> {
        let request = self.request(after);
        debug!(index = %self.index, size = self.size, resumed = after.is_some(), "composite page");

        let response = guarded(
            cancel,
            self.timeout,
            "search",
            self.index,
            self.store.search(self.index, &request),
        )
        .await?;
        if response.timed_out {
            return Err(BackendError::TimedOut {
                index: self.index.to_string(),
            });
        }

        let total_hits = response.total_hits();
        let composite = response
            .composite(COMPOSITE_NAME)
            .map_err(|e| BackendError::store("search", self.index, e))?;
        let Some(composite) = composite else {
            debug!(index = %self.index, "no composite aggregation in response");
            return Ok(CompositePage {
                total_hits,
                ..CompositePage::default()
            });
        };

        // A short page is the last one whatever the store says.
        let after_key = if composite.buckets.len() < self.size {
            None
        } else {
            composite.after_key
        };
        if let (Some(prev), Some(next)) = (after, after_key.as_ref()) {
            if prev == next {
                return Err(BackendError::InvalidCursor(format!(
                    "after_key did not advance on {}",
                    self.index
                )));
            }
        }

        Ok(CompositePage {
            buckets: composite.buckets,
            after_key,
            total_hits,
        })
    }

    /// Follow after keys until the aggregation is exhausted, checking for
    /// cancellation before each page.
    pub async fn all(&self, cancel: &CancellationToken) -> BackendResult<Vec<CompositeBucket>> {
        let mut buckets = Vec::new();
        let mut after: Option<AfterKey> = None;
        let mut pages = 0usize;
        loop {
            if cancel.is_cancelled() {
                return Err(BackendError::Cancelled);
            }
            let page = self.page(after.as_ref(), cancel).await?;
            pages += 1;
            buckets.extend(page.buckets);
            match page.after_key {
                Some(next) => after = Some(next),
                None => break,
            }
        }
        debug!(index = %self.index, pages, buckets = buckets.len(), "composite aggregation drained");
        Ok(buckets)
    }
}
