//! Label accumulation.

use std::collections::BTreeMap;

use tracing::warn;

use flowgrid_core::{FlowLabelValue, FlowLabels};

/// Collects `(key, value, count)` observations and emits them sorted by key
/// and then by value, whatever order they arrived in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTracker {
    labels: BTreeMap<String, BTreeMap<String, i64>>,
}

impl LabelTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, value: &str, count: i64) {
        *self
            .labels
            .entry(key.to_string())
            .or_default()
            .entry(value.to_string())
            .or_insert(0) += count;
    }

    /// Add a stored `key=value` term. Terms without exactly one `=` are
    /// dropped with a warning.
    pub fn add_term(&mut self, term: &str, count: i64) -> bool {
        let mut parts = term.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) => {
                self.add(key, value, count);
                true
            }
            _ => {
                warn!(term, "skipping malformed label term");
                false
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn into_labels(self) -> Vec<FlowLabels> {
        self.labels
            .into_iter()
            .map(|(key, values)| FlowLabels {
                key,
                values: values
                    .into_iter()
                    .map(|(value, count)| FlowLabelValue { value, count })
                    .collect(),
            })
            .collect()
    }
}

/// Labels from the `(term, count)` pairs of one label aggregation.
pub fn labels_from_terms(terms: &[(String, i64)]) -> Vec<FlowLabels> {
    let mut tracker = LabelTracker::new();
    for (term, count) in terms {
        tracker.add_term(term, *count);
    }
    tracker.into_labels()
}
