//! flowgrid-backend: the listing and ingest engine.
//!
//! # Architecture
//!
//! ```text
//!   FlowBackend::list                      LogBackend<T>::list / create
//!        │                                      │
//!        ▼                                      ▼
//!   TenantGuard ── bad tenant ──► error, no store call
//!        │
//!        ▼
//!   QueryBuilder (base filter, time range, filters)
//!        │                                      │
//!        ▼                                      ▼
//!   CompositePager (after_key)            SearchPager (startFrom, then
//!        │                                 point-in-time + search_after)
//!        ▼                                      │
//!   Bucket ─► convert_flow_bucket               ▼
//!              ├─ LabelTracker            decode documents
//!              └─ parse_policy_hits
//!                                         create: CachedInitializer ─► bulk
//! ```
//!
//! Every store call goes through the same guard: it is raced against the
//! caller's [`CancellationToken`](tokio_util::sync::CancellationToken) and
//! bounded by the configured request timeout.

pub mod aggregation;
pub mod bucket;
pub mod composite;
pub mod convert;
pub mod error;
pub mod flows;
mod guard;
pub mod init;
pub mod labels;
pub mod logs;
pub mod policy;
pub mod search;
pub mod settings;

#[cfg(test)]
mod mock;

pub use aggregation::{AggregationSpec, COMPOSITE_NAME, NESTED_TERMS_SIZE};
pub use composite::{CompositePage, CompositePager};
pub use convert::convert_flow_bucket;
pub use error::{BackendError, BackendResult};
pub use flows::FlowBackend;
pub use init::{CachedInitializer, IndexInitializer, LifecycleSettings, StoreInitializer};
pub use labels::LabelTracker;
pub use logs::{DnsLogBackend, FlowLogBackend, LogBackend, LogDocument};
pub use policy::parse_policy_hits;
pub use search::{Cursor, SearchPage, SearchPager};
pub use settings::BackendSettings;
