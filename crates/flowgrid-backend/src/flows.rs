//! Aggregated flow listing.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use flowgrid_core::{ClusterInfo, Index, L3Flow, L3FlowParams, List};
use flowgrid_query::QueryBuilder;
use flowgrid_store::{CompositeBucket, DocumentStore};

use crate::aggregation::flow::SPEC;
use crate::bucket::Bucket;
use crate::composite::CompositePager;
use crate::convert::convert_flow_bucket;
use crate::error::{BackendError, BackendResult};
use crate::settings::BackendSettings;

/// Groups raw flow logs into [`L3Flow`]s with a composite aggregation.
pub struct FlowBackend<S: ?Sized> {
    store: Arc<S>,
    index: Index,
    settings: BackendSettings,
}

impl<S: DocumentStore + ?Sized> FlowBackend<S> {
    pub fn new(store: Arc<S>, index: Index, settings: BackendSettings) -> Self {
        Self {
            store,
            index,
            settings,
        }
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// One page of flows, resuming from `params.after_key`.
    pub async fn list(
        &self,
        info: &ClusterInfo,
        params: &L3FlowParams,
        cancel: &CancellationToken,
    ) -> BackendResult<List<L3Flow>> {
        self.settings.guard.check(info)?;
        let query = QueryBuilder::new(&self.index, info)
            .build(params, Utc::now())?
            .to_json();
        let read = self.index.read_pattern(info);
        let size = self.settings.page_size(params.query.max_page_size);
        let pager = CompositePager::new(self.store.as_ref(), &read, &query, &SPEC, size, self.settings.timeout);

        let page = pager.page(params.query.after_key.as_ref(), cancel).await?;
        let items = convert_buckets(&page.buckets);
        debug!(index = %read, cluster = %info, flows = items.len(), last = page.after_key.is_none(), "listed flows");
        Ok(List {
            items,
            after_key: page.after_key,
            total_hits: page.total_hits,
        })
    }

    /// Every flow matching `params`, following the composite cursor to the
    /// end.
    pub async fn list_all(
        &self,
        info: &ClusterInfo,
        params: &L3FlowParams,
        cancel: &CancellationToken,
    ) -> BackendResult<Vec<L3Flow>> {
        let mut params = params.clone();
        let mut flows = Vec::new();
        loop {
            let page = self.list(info, &params, cancel).await?;
            flows.extend(page.items);
            match page.after_key {
                Some(next) => params.query.after_key = Some(next),
                None => return Ok(flows),
            }
            if cancel.is_cancelled() {
                return Err(BackendError::Cancelled);
            }
        }
    }
}

/// Buckets missing a required key are logged and dropped.
fn convert_buckets(buckets: &[CompositeBucket]) -> Vec<L3Flow> {
    buckets
        .iter()
        .filter_map(|raw| match Bucket::new(raw, &SPEC) {
            Ok(bucket) => Some(convert_flow_bucket(&bucket)),
            Err(e) => {
                warn!(error = %e, "skipping flow bucket");
                None
            }
        })
        .collect()
}
