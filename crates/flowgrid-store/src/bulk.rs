//! Bulk write wire types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{StoreError, StoreResult};

/// One document to index through an alias.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOperation {
    pub index: String,
    pub id: Option<String>,
    pub document: Value,
}

impl BulkOperation {
    pub fn index(index: impl Into<String>, document: Value) -> Self {
        Self {
            index: index.into(),
            id: None,
            document,
        }
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id.filter(|id| !id.is_empty());
        self
    }
}

/// Render operations as the newline-delimited bulk body.
pub fn to_ndjson(operations: &[BulkOperation]) -> StoreResult<String> {
    let mut body = String::new();
    for op in operations {
        let mut meta = json!({"_index": op.index});
        if let Some(id) = &op.id {
            meta["_id"] = json!(id);
        }
        let action = serde_json::to_string(&json!({"index": meta}))
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        let doc = serde_json::to_string(&op.document)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        body.push_str(&action);
        body.push('\n');
        body.push_str(&doc);
        body.push('\n');
    }
    Ok(body)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItemError {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reason: String,
}

/// Per-document outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItem {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<BulkItemError>,
}

impl BulkItem {
    pub fn succeeded(&self) -> bool {
        (200..300).contains(&self.status) && self.error.is_none()
    }
}

/// Bulk response. The store nests each item under its action name; the
/// action is dropped on decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkResult {
    pub took: u64,
    pub errors: bool,
    pub items: Vec<BulkItem>,
}

#[derive(Deserialize)]
struct RawBulkResult {
    #[serde(default)]
    took: u64,
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<HashMap<String, BulkItem>>,
}

impl<'de> Deserialize<'de> for BulkResult {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawBulkResult::deserialize(deserializer)?;
        Ok(BulkResult {
            took: raw.took,
            errors: raw.errors,
            items: raw
                .items
                .into_iter()
                .filter_map(|m| m.into_values().next())
                .collect(),
        })
    }
}

impl BulkResult {
    pub fn failed(&self) -> impl Iterator<Item = &BulkItem> {
        self.items.iter().filter(|i| !i.succeeded())
    }
}
