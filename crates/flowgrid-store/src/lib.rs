//! flowgrid-store: the document store collaborator.
//!
//! [`DocumentStore`] is the seam between the engine and the HTTP document
//! store. The engine only depends on the trait; [`HttpDocumentStore`] is the
//! production implementation and tests substitute in-memory stores.
//!
//! Wire types cover the parts of the store API the engine uses: searches
//! with `from`/`size`, point-in-time and `search_after` paging, composite
//! aggregations with `after_key`, bulk indexing and index bootstrapping.

pub mod bulk;
pub mod error;
pub mod client;
pub mod search;

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

pub use bulk::{BulkItem, BulkOperation, BulkResult};
pub use error::{StoreError, StoreResult};
pub use client::HttpDocumentStore;
pub use search::{CompositeBucket, CompositeResult, Hit, PitRef, SearchRequest, SearchResponse};

/// Boxed future returned by every [`DocumentStore`] call.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Operations the engine needs from the document store.
pub trait DocumentStore: Send + Sync {
    /// Run a search. `index` is ignored when the request carries a
    /// point-in-time reference.
    fn search<'a>(&'a self, index: &'a str, request: &'a SearchRequest) -> StoreFuture<'a, SearchResponse>;

    /// Write a batch of documents. Item-level failures are reported in the
    /// result, not as an error.
    fn bulk<'a>(&'a self, operations: &'a [BulkOperation]) -> StoreFuture<'a, BulkResult>;

    /// Open a point-in-time over `index`, returning its id.
    fn open_point_in_time<'a>(&'a self, index: &'a str, keep_alive: &'a str) -> StoreFuture<'a, String>;

    fn close_point_in_time<'a>(&'a self, id: &'a str) -> StoreFuture<'a, ()>;

    fn index_exists<'a>(&'a self, name: &'a str) -> StoreFuture<'a, bool>;

    /// Create an index (bootstrap names may contain date math).
    fn create_index<'a>(&'a self, name: &'a str, body: &'a Value) -> StoreFuture<'a, ()>;

    fn put_index_template<'a>(&'a self, name: &'a str, body: &'a Value) -> StoreFuture<'a, ()>;

    fn put_lifecycle_policy<'a>(&'a self, name: &'a str, body: &'a Value) -> StoreFuture<'a, ()>;
}
