//! Response envelopes shared by every listing and bulk write.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque pagination cursor. Either a composite aggregation key or a
/// `{"startFrom": N}` style search cursor.
pub type AfterKey = Map<String, Value>;

/// One page of results.
///
/// `items` is always serialized as an array, `[]` when nothing matched.
/// `after_key` is `null` once the listing is exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub after_key: Option<AfterKey>,
    #[serde(default)]
    pub total_hits: i64,
}

impl<T> List<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            after_key: None,
            total_hits: 0,
        }
    }

    pub fn is_last_page(&self) -> bool {
        self.after_key.is_none()
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Outcome of a bulk write. Partial failure is reported here, never as an
/// error return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkResponse {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    #[serde(default)]
    pub errors: Option<Vec<BulkError>>,
}

impl BulkResponse {
    /// Build a response from per-item failures; `errors` is `None` when
    /// every item succeeded.
    pub fn from_failures(total: usize, failures: Vec<BulkError>) -> Self {
        let failed = failures.len();
        Self {
            total,
            succeeded: total.saturating_sub(failed),
            failed,
            errors: (!failures.is_empty()).then_some(failures),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkError {
    /// Document id, or the target index when the store assigned no id.
    pub resource: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub reason: String,
}
