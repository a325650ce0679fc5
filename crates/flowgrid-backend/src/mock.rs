//! Scripted in-memory store for unit tests.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde_json::Value;

use flowgrid_store::{
    BulkItem, BulkOperation, BulkResult, DocumentStore, SearchRequest, SearchResponse, StoreError,
    StoreFuture,
};

/// Replays queued search responses and records every call.
#[derive(Default)]
pub struct ScriptedStore {
    responses: Mutex<VecDeque<SearchResponse>>,
    pub requests: Mutex<Vec<(String, SearchRequest)>>,
    pub calls: Mutex<Vec<String>>,
    pub bulk_ops: Mutex<Vec<BulkOperation>>,
    pub existing: Mutex<HashSet<String>>,
    pub bulk_failures: Mutex<HashSet<usize>>,
    pub fail_installs: AtomicBool,
    pub installs: AtomicUsize,
    pit_counter: AtomicUsize,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: Value) {
        let response = serde_json::from_value(response).unwrap();
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<(String, SearchRequest)> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn install(&self, call: String) -> Result<(), StoreError> {
        self.record(call.clone());
        if self.fail_installs.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                operation: "install",
                target: call,
                status: 500,
                body: "unavailable".into(),
            });
        }
        self.installs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl DocumentStore for ScriptedStore {
    fn search<'a>(&'a self, index: &'a str, request: &'a SearchRequest) -> StoreFuture<'a, SearchResponse> {
        Box::pin(async move {
            self.record(format!("search {index}"));
            self.requests
                .lock()
                .unwrap()
                .push((index.to_string(), request.clone()));
            Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
        })
    }

    fn bulk<'a>(&'a self, operations: &'a [BulkOperation]) -> StoreFuture<'a, BulkResult> {
        Box::pin(async move {
            self.record("bulk".into());
            let failures = self.bulk_failures.lock().unwrap().clone();
            let items = operations
                .iter()
                .enumerate()
                .map(|(i, op)| {
                    let mut item = serde_json::json!({
                        "_index": op.index,
                        "_id": format!("doc-{i}"),
                        "status": 201
                    });
                    if failures.contains(&i) {
                        item["status"] = 400.into();
                        item["error"] = serde_json::json!({
                            "type": "mapper_parsing_exception",
                            "reason": "failed to parse"
                        });
                    }
                    serde_json::from_value::<BulkItem>(item).unwrap()
                })
                .collect();
            self.bulk_ops.lock().unwrap().extend_from_slice(operations);
            Ok(BulkResult {
                took: 1,
                errors: !failures.is_empty(),
                items,
            })
        })
    }

    fn open_point_in_time<'a>(&'a self, index: &'a str, _keep_alive: &'a str) -> StoreFuture<'a, String> {
        Box::pin(async move {
            self.record(format!("open_pit {index}"));
            let n = self.pit_counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!("pit-{n}"))
        })
    }

    fn close_point_in_time<'a>(&'a self, id: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.record(format!("close_pit {id}"));
            Ok(())
        })
    }

    fn index_exists<'a>(&'a self, name: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            self.record(format!("exists {name}"));
            Ok(self.existing.lock().unwrap().contains(name))
        })
    }

    fn create_index<'a>(&'a self, name: &'a str, _body: &'a Value) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.install(format!("create {name}")) })
    }

    fn put_index_template<'a>(&'a self, name: &'a str, _body: &'a Value) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.install(format!("template {name}")) })
    }

    fn put_lifecycle_policy<'a>(&'a self, name: &'a str, _body: &'a Value) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.install(format!("policy {name}")) })
    }
}
