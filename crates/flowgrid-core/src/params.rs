//! Request parameters for listings.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::list::AfterKey;

/// Window applied when a request carries no time range. This silently
/// narrows results, so callers wanting history must always set a range.
pub const DEFAULT_TIME_WINDOW_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// The `window` ending at `now`.
    pub fn last(window: TimeDelta, now: DateTime<Utc>) -> Self {
        Self {
            from: now - window,
            to: now,
        }
    }

    pub fn default_window(now: DateTime<Utc>) -> Self {
        Self::last(TimeDelta::seconds(DEFAULT_TIME_WINDOW_SECS), now)
    }

    pub fn is_valid(&self) -> bool {
        self.from <= self.to
    }
}

/// Paging and time parameters common to every listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_page_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_key: Option<AfterKey>,
}

impl QueryParams {
    pub fn time_range_or_default(&self, now: DateTime<Utc>) -> TimeRange {
        self.time_range
            .unwrap_or_else(|| TimeRange::default_window(now))
    }

    /// Requested page size, falling back to `default` and never zero.
    pub fn page_size(&self, default: usize) -> usize {
        self.max_page_size.filter(|n| *n > 0).unwrap_or(default)
    }
}

/// Which side of a flow a match applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Any,
    Source,
    #[serde(alias = "dest")]
    Destination,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceMatch {
    #[serde(rename = "type", default)]
    pub match_type: MatchType,
    pub namespaces: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMatch {
    #[serde(rename = "type", default)]
    pub match_type: MatchType,
    pub names: Vec<String>,
}

/// Matches flows whose recorded policy hits include the given policy.
/// Unset fields match anything, but at least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyMatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl PolicyMatch {
    pub fn is_empty(&self) -> bool {
        self.tier.is_none() && self.namespace.is_none() && self.name.is_none() && self.action.is_none()
    }
}

/// A label selector term such as `app == nginx`, stored as `app=nginx`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelector {
    pub key: String,
    pub operator: String,
    pub values: Vec<String>,
}

/// Filters shared by aggregated and raw flow listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowFilters {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_types: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub destination_types: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub namespace_matches: Vec<NamespaceMatch>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub name_aggr_matches: Vec<NameMatch>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policy_matches: Vec<PolicyMatch>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_selectors: Vec<LabelSelector>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub destination_selectors: Vec<LabelSelector>,
}

/// Parameters for aggregated flow listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct L3FlowParams {
    #[serde(flatten)]
    pub query: QueryParams,
    #[serde(flatten)]
    pub filters: FlowFilters,
}

/// Parameters for raw flow log listings. Same filter set as aggregated
/// flows, applied to individual rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowLogParams {
    #[serde(flatten)]
    pub query: QueryParams,
    #[serde(flatten)]
    pub filters: FlowFilters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsLogParams {
    #[serde(flatten)]
    pub query: QueryParams,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qnames: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rcodes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub client_namespaces: Vec<String>,
}
