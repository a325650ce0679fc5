//! flowgrid-core: shared types for the flowgrid log engine.
//!
//! Everything in this crate is pure: no I/O beyond reading a config file.
//!
//! # Architecture
//!
//! ```text
//!   ClusterInfo ──► TenantGuard        (isolation check, before any I/O)
//!        │
//!        ▼
//!   Index { Single | Multi } × DataType ──► read pattern / write alias /
//!                                          bootstrap / template / lifecycle
//! ```
//!
//! The request and response models (`L3Flow`, `FlowLog`, `DnsLog`, params,
//! `List<T>`, `BulkResponse`) live here so the query builder, the storage
//! client and the backends agree on a single wire shape.

pub mod cluster;
pub mod config;
pub mod error;
pub mod flows;
pub mod index;
pub mod list;
pub mod logs;
pub mod params;
pub mod policy;

pub use cluster::{ClusterInfo, TenantGuard};
pub use config::{EngineConfig, IndexMode};
pub use error::{CoreError, CoreResult};
pub use flows::*;
pub use index::{DataType, Index};
pub use list::{AfterKey, BulkError, BulkResponse, List};
pub use logs::{DnsLog, DnsServer};
pub use params::*;
pub use policy::PolicyHit;
