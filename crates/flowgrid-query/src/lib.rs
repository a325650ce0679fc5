//! flowgrid-query: turns listing parameters into document store queries.
//!
//! ```text
//!   ClusterInfo + Index ─► base filter (tenant / cluster, single-index only)
//!   QueryParams          ─► time range (defaults to the last 5 minutes)
//!   FlowFilters          ─► actions, types, namespace / name matches,
//!                           policy matches, label selectors
//!                                   │
//!                                   ▼
//!                        Query::Bool { filter: [...] }
//! ```
//!
//! Values within one filter category are OR'd; categories are AND'd.

pub mod builder;
pub mod dsl;
pub mod error;
pub mod filters;

pub use builder::{LogQuery, QueryBuilder};
pub use dsl::{BoolQuery, Query};
pub use error::{QueryError, QueryResult};
