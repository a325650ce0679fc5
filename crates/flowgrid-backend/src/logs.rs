//! Raw log backends: paged listing and bulk creation of individual log
//! documents.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use flowgrid_core::{
    BulkError, BulkResponse, ClusterInfo, DataType, DnsLog, DnsLogParams, FlowLog, FlowLogParams,
    Index, List,
};
use flowgrid_query::builder::FIELD_END_TIME;
use flowgrid_query::{LogQuery, QueryBuilder};
use flowgrid_store::{BulkItem, BulkOperation, DocumentStore, Hit, StoreError};

use crate::error::{BackendError, BackendResult};
use crate::guard::guarded;
use crate::init::IndexInitializer;
use crate::search::{Cursor, PageLimits, SearchPager};
use crate::settings::BackendSettings;

/// A document type stored in its own index family.
pub trait LogDocument: Serialize + DeserializeOwned + Send + Sync + 'static {
    type Params: LogQuery + Send + Sync;

    const DATA_TYPE: DataType;
    const TIME_FIELD: &'static str = FIELD_END_TIME;

    fn set_id(&mut self, id: Option<String>);

    fn take_id(&mut self) -> Option<String>;

    /// Tag the document with the cluster (and, in a shared index, the
    /// tenant) it was written for.
    fn stamp(&mut self, info: &ClusterInfo, single_index: bool);
}

/// The caller's identity always wins over whatever the document carried.
/// Only shared indices record the tenant; per-cluster indices never do.
fn stamp_fields(cluster: &mut String, tenant: &mut String, info: &ClusterInfo, single_index: bool) {
    cluster.clone_from(&info.cluster);
    if single_index {
        tenant.clone_from(&info.tenant);
    } else {
        tenant.clear();
    }
}

impl LogDocument for FlowLog {
    type Params = FlowLogParams;
    const DATA_TYPE: DataType = DataType::FlowLogs;

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    fn take_id(&mut self) -> Option<String> {
        self.id.take()
    }

    fn stamp(&mut self, info: &ClusterInfo, single_index: bool) {
        stamp_fields(&mut self.cluster, &mut self.tenant, info, single_index);
    }
}

impl LogDocument for DnsLog {
    type Params = DnsLogParams;
    const DATA_TYPE: DataType = DataType::DnsLogs;

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    fn take_id(&mut self) -> Option<String> {
        self.id.take()
    }

    fn stamp(&mut self, info: &ClusterInfo, single_index: bool) {
        stamp_fields(&mut self.cluster, &mut self.tenant, info, single_index);
    }
}

pub type FlowLogBackend<S> = LogBackend<S, FlowLog>;
pub type DnsLogBackend<S> = LogBackend<S, DnsLog>;

/// Lists and creates documents of type `T`.
pub struct LogBackend<S: ?Sized, T> {
    store: Arc<S>,
    index: Index,
    settings: BackendSettings,
    initializer: Arc<dyn IndexInitializer>,
    _doc: PhantomData<fn() -> T>,
}

impl<S: DocumentStore + ?Sized, T: LogDocument> LogBackend<S, T> {
    pub fn new(
        store: Arc<S>,
        index: Index,
        settings: BackendSettings,
        initializer: Arc<dyn IndexInitializer>,
    ) -> Self {
        debug_assert_eq!(index.data_type(), T::DATA_TYPE);
        Self {
            store,
            index,
            settings,
            initializer,
            _doc: PhantomData,
        }
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// One page of documents. The returned `after_key` is the cursor for
    /// the next page and is `None` on the last one.
    pub async fn list(
        &self,
        info: &ClusterInfo,
        params: &T::Params,
        cancel: &CancellationToken,
    ) -> BackendResult<List<T>> {
        self.settings.guard.check(info)?;
        let query = QueryBuilder::new(&self.index, info)
            .with_time_field(T::TIME_FIELD)
            .build(params, Utc::now())?
            .to_json();
        let read = self.index.read_pattern(info);
        let qp = params.query_params();
        let cursor = Cursor::from_after_key(qp.after_key.as_ref())?;
        let pager = SearchPager::new(self.store.as_ref(), &read, &query, T::TIME_FIELD, self.limits(qp.max_page_size));

        let page = pager.page(&cursor, cancel).await?;
        let items = decode_hits(&read, page.hits);
        debug!(index = %read, cluster = %info, items = items.len(), last = page.next.is_none(), "listed logs");
        Ok(List {
            items,
            after_key: page.next.map(|c| c.to_after_key()),
            total_hits: page.total_hits,
        })
    }

    /// Every document matching `params` from its cursor onwards.
    pub async fn list_all(
        &self,
        info: &ClusterInfo,
        params: &T::Params,
        cancel: &CancellationToken,
    ) -> BackendResult<Vec<T>> {
        self.settings.guard.check(info)?;
        let query = QueryBuilder::new(&self.index, info)
            .with_time_field(T::TIME_FIELD)
            .build(params, Utc::now())?
            .to_json();
        let read = self.index.read_pattern(info);
        let qp = params.query_params();
        let cursor = Cursor::from_after_key(qp.after_key.as_ref())?;
        let pager = SearchPager::new(self.store.as_ref(), &read, &query, T::TIME_FIELD, self.limits(qp.max_page_size));
        let hits = pager.all(cursor, cancel).await?;
        Ok(decode_hits(&read, hits))
    }

    /// Write `docs` through the write alias. Per-document failures are
    /// reported in the response, not as an error.
    pub async fn create(
        &self,
        info: &ClusterInfo,
        docs: Vec<T>,
        cancel: &CancellationToken,
    ) -> BackendResult<BulkResponse> {
        self.settings.guard.check(info)?;
        if docs.is_empty() {
            return Ok(BulkResponse::default());
        }
        self.initializer
            .ensure_initialized(&self.index, info, cancel)
            .await?;

        let alias = self.index.write_alias(info);
        let single = self.index.is_single_index();
        let mut operations = Vec::with_capacity(docs.len());
        for mut doc in docs {
            let id = doc.take_id();
            doc.stamp(info, single);
            let document = serde_json::to_value(&doc).map_err(|e| {
                BackendError::store("serialize", alias.as_str(), StoreError::Serialize(e.to_string()))
            })?;
            operations.push(BulkOperation::index(alias.as_str(), document).with_id(id));
        }

        let result = guarded(
            cancel,
            self.settings.timeout,
            "bulk",
            &alias,
            self.store.bulk(&operations),
        )
        .await?;
        let failures: Vec<BulkError> = result.failed().map(|item| bulk_error(&alias, item)).collect();
        let response = BulkResponse::from_failures(operations.len(), failures);
        if response.failed > 0 {
            warn!(index = %alias, total = response.total, failed = response.failed, "bulk create partially failed");
        } else {
            info!(index = %alias, total = response.total, "bulk create");
        }
        Ok(response)
    }

    fn limits(&self, requested: Option<usize>) -> PageLimits {
        PageLimits {
            size: self.settings.page_size(requested),
            cutoff: self.settings.deep_pagination_cutoff,
            keep_alive: self.settings.pit_keep_alive.clone(),
            timeout: self.settings.timeout,
        }
    }
}

fn bulk_error(alias: &str, item: &BulkItem) -> BulkError {
    let resource = if item.id.is_empty() {
        alias.to_string()
    } else {
        item.id.clone()
    };
    match &item.error {
        Some(e) => BulkError {
            resource,
            kind: e.kind.clone(),
            reason: e.reason.clone(),
        },
        None => BulkError {
            resource,
            kind: "status".into(),
            reason: format!("unexpected status {}", item.status),
        },
    }
}

/// Malformed documents are skipped so one bad row cannot fail a listing.
fn decode_hits<T: LogDocument>(index: &str, hits: Vec<Hit>) -> Vec<T> {
    hits.into_iter()
        .filter_map(|hit| match serde_json::from_value::<T>(hit.source) {
            Ok(mut doc) => {
                doc.set_id(Some(hit.id).filter(|id| !id.is_empty()));
                Some(doc)
            }
            Err(e) => {
                warn!(%index, id = %hit.id, error = %e, "skipping undecodable document");
                None
            }
        })
        .collect()
}
