//! Index addressing.
//!
//! Maps a [`ClusterInfo`] and a [`DataType`] to the storage names used for
//! reads, writes, bootstrapping and lifecycle management. Two strategies
//! exist:
//!
//! - **multi-index**: one physical index family per tenant, cluster and data
//!   type. Names embed `tenant.cluster` (or `cluster`) as literal segments.
//!   This layout is persisted in deployed clusters and must not change.
//! - **single-index**: one shared index family per data type. Isolation is
//!   enforced by the query filter, so the names ignore the cluster identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterInfo;

/// Prefix used by lifecycle policies for both strategies.
const LIFECYCLE_PREFIX: &str = "tigera_secure_ee";

/// Kinds of data the engine stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    FlowLogs,
    DnsLogs,
    L7Logs,
    AuditEeLogs,
    AuditKubeLogs,
    BgpLogs,
    WafLogs,
    RuntimeReports,
    Events,
    ComplianceReports,
    BenchmarkResults,
    Snapshots,
    ThreatfeedsIpSet,
    ThreatfeedsDomainSet,
}

impl DataType {
    pub const ALL: [DataType; 14] = [
        DataType::FlowLogs,
        DataType::DnsLogs,
        DataType::L7Logs,
        DataType::AuditEeLogs,
        DataType::AuditKubeLogs,
        DataType::BgpLogs,
        DataType::WafLogs,
        DataType::RuntimeReports,
        DataType::Events,
        DataType::ComplianceReports,
        DataType::BenchmarkResults,
        DataType::Snapshots,
        DataType::ThreatfeedsIpSet,
        DataType::ThreatfeedsDomainSet,
    ];

    /// The short name embedded in index and policy names.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::FlowLogs => "flows",
            DataType::DnsLogs => "dns",
            DataType::L7Logs => "l7",
            DataType::AuditEeLogs => "audit_ee",
            DataType::AuditKubeLogs => "audit_kube",
            DataType::BgpLogs => "bgp",
            DataType::WafLogs => "waf",
            DataType::RuntimeReports => "runtime",
            DataType::Events => "events",
            DataType::ComplianceReports => "compliance_reports",
            DataType::BenchmarkResults => "benchmark_results",
            DataType::Snapshots => "snapshots",
            DataType::ThreatfeedsIpSet => "threatfeeds_ipset",
            DataType::ThreatfeedsDomainSet => "threatfeeds_domainnameset",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|dt| dt.as_str() == s)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Naming family for multi-index templates and bootstrap indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// Log types written by the collectors: template name keeps a trailing dot.
    Fluentd,
    /// Reports and events.
    Lma,
    /// Threat feeds.
    Linseed,
}

const NAMING: &[(DataType, Layout)] = &[
    (DataType::FlowLogs, Layout::Fluentd),
    (DataType::DnsLogs, Layout::Fluentd),
    (DataType::L7Logs, Layout::Fluentd),
    (DataType::AuditEeLogs, Layout::Fluentd),
    (DataType::AuditKubeLogs, Layout::Fluentd),
    (DataType::BgpLogs, Layout::Fluentd),
    (DataType::WafLogs, Layout::Fluentd),
    (DataType::RuntimeReports, Layout::Fluentd),
    (DataType::Events, Layout::Lma),
    (DataType::ComplianceReports, Layout::Lma),
    (DataType::BenchmarkResults, Layout::Lma),
    (DataType::Snapshots, Layout::Lma),
    (DataType::ThreatfeedsIpSet, Layout::Linseed),
    (DataType::ThreatfeedsDomainSet, Layout::Linseed),
];

fn layout(data_type: DataType) -> Layout {
    NAMING
        .iter()
        .find(|(dt, _)| *dt == data_type)
        .map(|(_, layout)| *layout)
        .unwrap_or_else(|| panic!("no index naming registered for data type {data_type}"))
}

/// Storage addressing strategy for one data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Index {
    Single { name: String, data_type: DataType },
    Multi { base: String, data_type: DataType },
}

impl Index {
    pub fn single(name: impl Into<String>, data_type: DataType) -> Self {
        Index::Single {
            name: name.into(),
            data_type,
        }
    }

    pub fn multi(base: impl Into<String>, data_type: DataType) -> Self {
        Index::Multi {
            base: base.into(),
            data_type,
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Index::Single { data_type, .. } | Index::Multi { data_type, .. } => *data_type,
        }
    }

    pub fn is_single_index(&self) -> bool {
        matches!(self, Index::Single { .. })
    }

    /// Index family name, without any pattern or alias suffix.
    pub fn name(&self, info: &ClusterInfo) -> String {
        match self {
            Index::Single { name, .. } => name.clone(),
            Index::Multi { base, .. } => format!("{base}.{}", info.index_segment()),
        }
    }

    /// Pattern used for searches.
    pub fn read_pattern(&self, info: &ClusterInfo) -> String {
        format!("{}.*", self.name(info))
    }

    /// Alias that all writes go through.
    pub fn write_alias(&self, info: &ClusterInfo) -> String {
        format!("{}.", self.name(info))
    }

    /// Date-math name of the first concrete index behind the write alias.
    pub fn bootstrap_name(&self, info: &ClusterInfo) -> String {
        let name = self.name(info);
        match self {
            Index::Single { .. } => format!("<{name}.linseed-{{now/s{{yyyyMMdd}}}}-000001>"),
            Index::Multi { data_type, .. } => match layout(*data_type) {
                Layout::Fluentd => format!("<{name}.fluentd-{{now/s{{yyyyMMdd}}}}-000001>"),
                Layout::Lma => format!("<{name}.lma-{{now/s{{yyyyMMdd}}}}-000000>"),
                Layout::Linseed => format!("<{name}.linseed-{{now/s{{yyyyMMdd}}}}-000001>"),
            },
        }
    }

    pub fn template_name(&self, info: &ClusterInfo) -> String {
        let name = self.name(info);
        match self {
            Index::Single { .. } => name,
            Index::Multi { data_type, .. } => match layout(*data_type) {
                Layout::Fluentd => format!("{name}."),
                Layout::Lma | Layout::Linseed => name,
            },
        }
    }

    /// Lifecycle policy name. Single-index deployments keep the multi-index
    /// convention because lifecycle tooling outside this service looks
    /// policies up by that name.
    pub fn lifecycle_policy_name(&self) -> String {
        format!("{LIFECYCLE_PREFIX}_{}_policy", self.data_type())
    }
}
