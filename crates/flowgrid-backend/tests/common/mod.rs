//! In-memory document store used by the integration tests.
//!
//! It evaluates the subset of the query language the engine emits against
//! stored documents, groups composite aggregations with `after` paging,
//! serves `from`/`size` and point-in-time `search_after` searches, and
//! enforces a result window so deep `from` paging fails like a real store.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::time::Duration;

use serde_json::{Map, Value, json};

use flowgrid_store::{
    BulkItem, BulkOperation, BulkResult, DocumentStore, SearchRequest, SearchResponse, StoreError,
    StoreFuture, StoreResult,
};

pub const RESULT_WINDOW: usize = 10_000;

struct Doc {
    index: String,
    id: String,
    source: Value,
}

#[derive(Default)]
pub struct FakeStore {
    docs: Mutex<Vec<Doc>>,
    aliases: Mutex<HashSet<String>>,
    pits: Mutex<HashMap<String, String>>,
    next_id: AtomicUsize,
    next_pit: AtomicUsize,
    pub calls: Mutex<Vec<String>>,
    pub installs: AtomicUsize,
    pub closed_pits: AtomicUsize,
    /// Ids whose bulk write is rejected.
    pub reject_ids: Mutex<HashSet<String>>,
    /// Delay applied to every install call, to widen race windows.
    pub install_delay: Mutex<Option<Duration>>,
    pub search_delay: Mutex<Option<Duration>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn doc_count(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    /// Insert a document directly, bypassing the engine.
    pub fn insert(&self, index: &str, source: Value) {
        let n = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
        self.docs.lock().unwrap().push(Doc {
            index: index.to_string(),
            id: format!("fake-{n}"),
            source,
        });
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn install(&self, call: String) {
        self.record(call);
        let delay = *self.install_delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        self.installs.fetch_add(1, AtomicOrdering::SeqCst);
    }

    fn run_search(&self, index: &str, request: &SearchRequest) -> StoreResult<SearchResponse> {
        let pattern = match &request.pit {
            Some(pit) => self
                .pits
                .lock()
                .unwrap()
                .get(&pit.id)
                .cloned()
                .ok_or_else(|| status("search", &pit.id, 404, "point in time not found"))?,
            None => index.to_string(),
        };
        if request.pit.is_none() && request.from.unwrap_or(0) + request.size > RESULT_WINDOW {
            return Err(status("search", index, 400, "Result window is too large"));
        }

        let prefix = pattern.trim_end_matches('*');
        let query = request.query.clone().unwrap_or_else(|| json!({"match_all": {}}));
        let docs = self.docs.lock().unwrap();
        let mut matched: Vec<(usize, &Doc)> = docs
            .iter()
            .enumerate()
            .filter(|(_, d)| d.index.starts_with(prefix))
            .filter(|(_, d)| matches(&query, &d.source))
            .collect();
        matched.sort_by(|(pa, a), (pb, b)| {
            cmp_value(&a.source["end_time"], &b.source["end_time"]).then(pa.cmp(pb))
        });

        let mut response = SearchResponse {
            pit_id: request.pit.as_ref().map(|p| p.id.clone()),
            ..SearchResponse::default()
        };
        response.hits.total = Some(serde_json::from_value(json!({"value": matched.len(), "relation": "eq"})).unwrap());

        if let Some(aggs) = &request.aggs {
            let sources: Vec<&Value> = matched.iter().map(|(_, d)| &d.source).collect();
            for (name, agg) in aggs {
                if let Some(composite) = agg.get("composite") {
                    let sub = agg.get("aggs").and_then(Value::as_object).cloned().unwrap_or_default();
                    response
                        .aggregations
                        .insert(name.clone(), composite_page(composite, &sub, &sources));
                }
            }
        }

        let after: Option<(Value, usize)> = request.search_after.as_ref().map(|sa| {
            let pos = sa.get(1).and_then(Value::as_u64).unwrap_or(0) as usize;
            (sa.first().cloned().unwrap_or(Value::Null), pos)
        });
        let from = request.from.unwrap_or(0);
        let hits: Vec<Value> = matched
            .iter()
            .filter(|(pos, d)| match &after {
                None => true,
                Some((t, p)) => match cmp_value(&d.source["end_time"], t) {
                    Ordering::Greater => true,
                    Ordering::Equal => pos > p,
                    Ordering::Less => false,
                },
            })
            .skip(if request.pit.is_some() { 0 } else { from })
            .take(request.size)
            .map(|(pos, d)| {
                json!({
                    "_index": d.index,
                    "_id": d.id,
                    "_source": d.source,
                    "sort": [d.source["end_time"].clone(), pos]
                })
            })
            .collect();
        response.hits.hits = serde_json::from_value(Value::Array(hits)).unwrap();
        Ok(response)
    }
}

fn status(operation: &'static str, target: &str, code: u16, body: &str) -> StoreError {
    StoreError::Status {
        operation,
        target: target.to_string(),
        status: code,
        body: body.to_string(),
    }
}

impl DocumentStore for FakeStore {
    fn search<'a>(&'a self, index: &'a str, request: &'a SearchRequest) -> StoreFuture<'a, SearchResponse> {
        Box::pin(async move {
            self.record(format!("search {index}"));
            let delay = *self.search_delay.lock().unwrap();
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            self.run_search(index, request)
        })
    }

    fn bulk<'a>(&'a self, operations: &'a [BulkOperation]) -> StoreFuture<'a, BulkResult> {
        Box::pin(async move {
            self.record(format!("bulk {}", operations.len()));
            let reject = self.reject_ids.lock().unwrap().clone();
            let mut items = Vec::with_capacity(operations.len());
            let mut docs = self.docs.lock().unwrap();
            for op in operations {
                let id = match &op.id {
                    Some(id) => id.clone(),
                    None => format!("fake-{}", self.next_id.fetch_add(1, AtomicOrdering::SeqCst)),
                };
                let mut item = json!({"_index": op.index, "_id": id, "status": 201});
                if reject.contains(&id) {
                    item["status"] = json!(400);
                    item["error"] = json!({"type": "mapper_parsing_exception", "reason": "rejected"});
                } else {
                    docs.push(Doc {
                        index: op.index.clone(),
                        id,
                        source: op.document.clone(),
                    });
                }
                items.push(serde_json::from_value::<BulkItem>(item).unwrap());
            }
            Ok(BulkResult {
                took: 1,
                errors: !reject.is_empty(),
                items,
            })
        })
    }

    fn open_point_in_time<'a>(&'a self, index: &'a str, _keep_alive: &'a str) -> StoreFuture<'a, String> {
        Box::pin(async move {
            self.record(format!("open_pit {index}"));
            let id = format!("pit-{}", self.next_pit.fetch_add(1, AtomicOrdering::SeqCst));
            self.pits.lock().unwrap().insert(id.clone(), index.to_string());
            Ok(id)
        })
    }

    fn close_point_in_time<'a>(&'a self, id: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.record(format!("close_pit {id}"));
            self.pits.lock().unwrap().remove(id);
            self.closed_pits.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(())
        })
    }

    fn index_exists<'a>(&'a self, name: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            self.record(format!("exists {name}"));
            Ok(self.aliases.lock().unwrap().contains(name))
        })
    }

    fn create_index<'a>(&'a self, name: &'a str, body: &'a Value) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.install(format!("create {name}")).await;
            if let Some(aliases) = body.get("aliases").and_then(Value::as_object) {
                self.aliases.lock().unwrap().extend(aliases.keys().cloned());
            }
            Ok(())
        })
    }

    fn put_index_template<'a>(&'a self, name: &'a str, _body: &'a Value) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.install(format!("template {name}")).await;
            Ok(())
        })
    }

    fn put_lifecycle_policy<'a>(&'a self, name: &'a str, _body: &'a Value) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.install(format!("policy {name}")).await;
            Ok(())
        })
    }
}

// ── Query evaluation ──────────────────────────────────────────────

/// Values at a dotted path, with arrays flattened.
fn field_values(doc: &Value, path: &str) -> Vec<Value> {
    let mut current: Vec<&Value> = vec![doc];
    for part in path.split('.') {
        let mut next = Vec::new();
        for v in current {
            match v.get(part) {
                Some(Value::Array(items)) => next.extend(items.iter()),
                Some(Value::Null) | None => {}
                Some(other) => next.push(other),
            }
        }
        current = next;
    }
    current.into_iter().cloned().collect()
}

fn matches(query: &Value, doc: &Value) -> bool {
    let Some((kind, body)) = query.as_object().and_then(|o| o.iter().next()) else {
        return true;
    };
    match kind.as_str() {
        "match_all" => true,
        "bool" => {
            let all = |key: &str| {
                body.get(key)
                    .and_then(Value::as_array)
                    .map(|qs| qs.iter().all(|q| matches(q, doc)))
                    .unwrap_or(true)
            };
            let should = body.get("should").and_then(Value::as_array);
            let min_should = body
                .get("minimum_should_match")
                .and_then(Value::as_u64)
                .unwrap_or(0) as usize;
            let should_ok = match should {
                Some(qs) if !qs.is_empty() => {
                    qs.iter().filter(|q| matches(q, doc)).count() >= min_should.max(1)
                }
                _ => true,
            };
            let must_not_ok = body
                .get("must_not")
                .and_then(Value::as_array)
                .map(|qs| !qs.iter().any(|q| matches(q, doc)))
                .unwrap_or(true);
            all("filter") && all("must") && should_ok && must_not_ok
        }
        "term" => body.as_object().is_some_and(|o| {
            o.iter().all(|(field, v)| {
                let expected = v.get("value").unwrap_or(v);
                field_values(doc, field).iter().any(|x| x == expected)
            })
        }),
        "terms" => body.as_object().is_some_and(|o| {
            o.iter().all(|(field, vs)| {
                let wanted = vs.as_array().cloned().unwrap_or_default();
                field_values(doc, field).iter().any(|x| wanted.contains(x))
            })
        }),
        "range" => body.as_object().is_some_and(|o| {
            o.iter().all(|(field, r)| {
                field_values(doc, field).iter().any(|x| {
                    let ge = r.get("gte").map(|b| cmp_value(x, b) != Ordering::Less).unwrap_or(true);
                    let le = r.get("lte").map(|b| cmp_value(x, b) != Ordering::Greater).unwrap_or(true);
                    ge && le
                })
            })
        }),
        "wildcard" => body.as_object().is_some_and(|o| {
            o.iter().all(|(field, p)| {
                let pattern = p.get("value").or_else(|| p.get("wildcard")).unwrap_or(p);
                let pattern = pattern.as_str().unwrap_or_default();
                field_values(doc, field)
                    .iter()
                    .any(|x| x.as_str().is_some_and(|s| glob(pattern, s)))
            })
        }),
        "exists" => body
            .get("field")
            .and_then(Value::as_str)
            .is_some_and(|f| !field_values(doc, f).is_empty()),
        "nested" => body.get("query").is_some_and(|q| matches(q, doc)),
        _ => false,
    }
}

fn glob(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let (mut star, mut mark) = (None, 0);
    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

fn rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

pub fn cmp_value(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

// ── Aggregations ──────────────────────────────────────────────────

struct Source {
    name: String,
    field: String,
    desc: bool,
    missing_bucket: bool,
}

fn parse_sources(composite: &Value) -> Vec<Source> {
    composite["sources"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|s| {
            let (name, def) = s.as_object()?.iter().next()?;
            let terms = &def["terms"];
            Some(Source {
                name: name.clone(),
                field: terms["field"].as_str()?.to_string(),
                desc: terms["order"] == "desc",
                missing_bucket: terms["missing_bucket"] == true,
            })
        })
        .collect()
}

fn cmp_keys(sources: &[Source], a: &Map<String, Value>, b: &Map<String, Value>) -> Ordering {
    for s in sources {
        let null = Value::Null;
        let ord = cmp_value(a.get(&s.name).unwrap_or(&null), b.get(&s.name).unwrap_or(&null));
        let ord = if s.desc { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn composite_page(composite: &Value, sub: &Map<String, Value>, docs: &[&Value]) -> Value {
    let sources = parse_sources(composite);
    let size = composite["size"].as_u64().unwrap_or(10) as usize;

    let mut groups: Vec<(Map<String, Value>, Vec<&Value>)> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();
    'docs: for doc in docs {
        let mut key = Map::new();
        for s in &sources {
            let v = field_values(doc, &s.field).into_iter().next().unwrap_or(Value::Null);
            if v.is_null() && !s.missing_bucket {
                continue 'docs;
            }
            key.insert(s.name.clone(), v);
        }
        let id = Value::Object(key.clone()).to_string();
        match by_key.get(&id) {
            Some(&i) => groups[i].1.push(doc),
            None => {
                by_key.insert(id, groups.len());
                groups.push((key, vec![doc]));
            }
        }
    }
    groups.sort_by(|a, b| cmp_keys(&sources, &a.0, &b.0));

    let after = composite.get("after").and_then(Value::as_object);
    let page: Vec<&(Map<String, Value>, Vec<&Value>)> = groups
        .iter()
        .filter(|(k, _)| after.is_none_or(|a| cmp_keys(&sources, k, a) == Ordering::Greater))
        .take(size)
        .collect();

    let buckets: Vec<Value> = page
        .iter()
        .map(|(key, members)| {
            let mut bucket = Map::new();
            bucket.insert("key".into(), Value::Object(key.clone()));
            bucket.insert("doc_count".into(), json!(members.len()));
            for (name, agg) in sub {
                bucket.insert(name.clone(), sub_aggregation(agg, members));
            }
            Value::Object(bucket)
        })
        .collect();

    let mut out = Map::new();
    if let Some((key, _)) = page.last() {
        out.insert("after_key".into(), Value::Object(key.clone()));
    }
    out.insert("buckets".into(), Value::Array(buckets));
    Value::Object(out)
}

fn numbers(members: &[&Value], field: &str) -> Vec<f64> {
    members
        .iter()
        .flat_map(|d| field_values(d, field))
        .filter_map(|v| v.as_f64())
        .collect()
}

fn term_counts(members: &[&Value], field: &str, size: usize) -> Value {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for d in members {
        for v in field_values(d, field) {
            let key = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            *counts.entry(key).or_default() += 1;
        }
    }
    let mut terms: Vec<(String, usize)> = counts.into_iter().collect();
    terms.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    terms.truncate(size);
    let buckets: Vec<Value> = terms
        .into_iter()
        .map(|(key, count)| json!({"key": key, "doc_count": count}))
        .collect();
    json!({"buckets": buckets})
}

fn sub_aggregation(agg: &Value, members: &[&Value]) -> Value {
    let Some((kind, body)) = agg.as_object().and_then(|o| o.iter().find(|(k, _)| *k != "aggs")) else {
        return Value::Null;
    };
    let field = body["field"].as_str().unwrap_or_default();
    match kind.as_str() {
        "sum" => json!({"value": numbers(members, field).iter().sum::<f64>()}),
        "min" => json!({"value": numbers(members, field).into_iter().reduce(f64::min)}),
        "max" => json!({"value": numbers(members, field).into_iter().reduce(f64::max)}),
        "avg" => {
            let values = numbers(members, field);
            if values.is_empty() {
                json!({"value": null})
            } else {
                json!({"value": values.iter().sum::<f64>() / values.len() as f64})
            }
        }
        "terms" => term_counts(members, field, body["size"].as_u64().unwrap_or(10) as usize),
        "nested" => {
            let mut out = Map::new();
            out.insert("doc_count".into(), json!(members.len()));
            if let Some(inner) = agg.get("aggs").and_then(Value::as_object) {
                for (name, a) in inner {
                    out.insert(name.clone(), sub_aggregation(a, members));
                }
            }
            Value::Object(out)
        }
        _ => Value::Null,
    }
}
