//! Typed access to one composite aggregation bucket.

use serde_json::Value;
use tracing::warn;

use flowgrid_store::CompositeBucket;

use crate::aggregation::AggregationSpec;
use crate::error::{BackendError, BackendResult};

/// A bucket checked against the aggregation that produced it.
#[derive(Debug, Clone, Copy)]
pub struct Bucket<'a> {
    raw: &'a CompositeBucket,
}

impl<'a> Bucket<'a> {
    /// Every composite source must be present in the key unless it allows
    /// missing values.
    pub fn new(raw: &'a CompositeBucket, spec: &AggregationSpec) -> BackendResult<Self> {
        for source in spec.sources {
            if source.missing_bucket {
                continue;
            }
            match raw.key.get(source.name) {
                None | Some(Value::Null) => {
                    return Err(BackendError::MissingCompositeKey(source.name.to_string()));
                }
                Some(_) => {}
            }
        }
        Ok(Self { raw })
    }

    pub fn doc_count(&self) -> i64 {
        self.raw.doc_count
    }

    /// Key value as a string; numbers are rendered, null and absent keys
    /// are empty.
    pub fn key_str(&self, name: &str) -> String {
        match self.raw.key.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    pub fn key_i64(&self, name: &str) -> Option<i64> {
        match self.raw.key.get(name)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Value of a metric sub-aggregation. Metrics over no documents come
    /// back as null and read as zero.
    pub fn metric(&self, name: &str) -> f64 {
        self.raw
            .aggregations
            .get(name)
            .and_then(|agg| agg.get("value"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }

    pub fn metric_i64(&self, name: &str) -> i64 {
        self.metric(name).round() as i64
    }

    /// `(key, doc_count)` pairs of a nested terms sub-aggregation.
    pub fn nested_terms(&self, name: &str, term: &str) -> Vec<(String, i64)> {
        let Some(nested) = self.raw.aggregations.get(name) else {
            warn!(aggregation = name, "nested terms missing from bucket");
            return Vec::new();
        };
        match nested.get(term) {
            Some(terms) => term_buckets(terms),
            None => {
                warn!(aggregation = name, term, "nested terms buckets missing");
                Vec::new()
            }
        }
    }

    /// `(key, doc_count)` pairs of a top-level terms sub-aggregation.
    pub fn terms(&self, name: &str) -> Vec<(String, i64)> {
        self.raw
            .aggregations
            .get(name)
            .map(term_buckets)
            .unwrap_or_default()
    }
}

fn term_buckets(terms: &Value) -> Vec<(String, i64)> {
    let Some(buckets) = terms.get("buckets").and_then(Value::as_array) else {
        return Vec::new();
    };
    buckets
        .iter()
        .filter_map(|b| {
            let key = match b.get("key")? {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let count = b.get("doc_count").and_then(Value::as_i64).unwrap_or(0);
            Some((key, count))
        })
        .collect()
}
