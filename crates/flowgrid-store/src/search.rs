//! Search request and response wire types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Point-in-time reference carried by deep-paging searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitRef {
    pub id: String,
    pub keep_alive: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggs: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_after: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pit: Option<PitRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_total_hits: Option<bool>,
}

impl SearchRequest {
    pub fn new(query: Value) -> Self {
        Self {
            query: Some(query),
            ..Self::default()
        }
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn from(mut self, from: usize) -> Self {
        self.from = Some(from);
        self
    }

    pub fn sort(mut self, sort: Value) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn aggregation(mut self, name: impl Into<String>, agg: Value) -> Self {
        self.aggs.get_or_insert_with(Map::new).insert(name.into(), agg);
        self
    }

    pub fn search_after(mut self, values: Vec<Value>) -> Self {
        self.search_after = Some(values);
        self
    }

    pub fn pit(mut self, id: impl Into<String>, keep_alive: impl Into<String>) -> Self {
        self.pit = Some(PitRef {
            id: id.into(),
            keep_alive: keep_alive.into(),
        });
        self
    }

    pub fn track_total_hits(mut self, track: bool) -> Self {
        self.track_total_hits = Some(track);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalHits {
    pub value: i64,
    #[serde(default)]
    pub relation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub total: Option<TotalHits>,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub hits: Hits,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub aggregations: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pit_id: Option<String>,
}

impl SearchResponse {
    pub fn total_hits(&self) -> i64 {
        self.hits.total.as_ref().map(|t| t.value).unwrap_or(0)
    }

    /// Decode the named composite aggregation. `Ok(None)` when the
    /// response does not contain it, which happens on empty indices.
    pub fn composite(&self, name: &str) -> StoreResult<Option<CompositeResult>> {
        match self.aggregations.get(name) {
            None => Ok(None),
            Some(v) => serde_json::from_value(v.clone())
                .map(Some)
                .map_err(|e| StoreError::Decode {
                    operation: "composite aggregation",
                    target: name.to_string(),
                    reason: e.to_string(),
                }),
        }
    }
}

/// One page of a composite aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_key: Option<Map<String, Value>>,
    #[serde(default)]
    pub buckets: Vec<CompositeBucket>,
}

/// A composite bucket: its key, document count and named
/// sub-aggregation results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeBucket {
    pub key: Map<String, Value>,
    pub doc_count: i64,
    #[serde(flatten)]
    pub aggregations: Map<String, Value>,
}
