//! Flow log rows and aggregated L3 flows.

use serde::{Deserialize, Serialize};

use crate::policy::PolicyHit;

/// Label set attached to one side of a flow log, stored as `key=value` terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowLogLabels {
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Policy hit strings recorded on a flow log, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowLogPolicies {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_policies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enforced_policies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_policies: Vec<String>,
}

/// One raw flow observation as ingested and stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowLog {
    /// Document id assigned by the store; never written into the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub start_time: i64,
    pub end_time: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    pub source_name: String,
    pub source_name_aggr: String,
    pub source_namespace: String,
    pub source_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_labels: Option<FlowLogLabels>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_ip: Option<String>,
    pub dest_name: String,
    pub dest_name_aggr: String,
    pub dest_namespace: String,
    pub dest_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_labels: Option<FlowLogLabels>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_domains: Option<Vec<String>>,

    pub dest_service_namespace: String,
    pub dest_service_name: String,
    pub dest_service_port: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_service_port_num: Option<i64>,

    pub proto: String,
    pub action: String,
    pub reporter: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub policies: Option<FlowLogPolicies>,

    pub bytes_in: i64,
    pub bytes_out: i64,
    pub packets_in: i64,
    pub packets_out: i64,
    pub num_flows: i64,
    pub num_flows_started: i64,
    pub num_flows_completed: i64,

    pub http_requests_allowed_in: i64,
    pub http_requests_denied_in: i64,

    pub process_name: String,
    pub num_process_names: i64,
    pub num_process_ids: i64,

    pub tcp_mean_send_congestion_window: i64,
    pub tcp_min_send_congestion_window: i64,
    pub tcp_mean_smooth_rtt: i64,
    pub tcp_max_smooth_rtt: i64,
    pub tcp_mean_min_rtt: i64,
    pub tcp_max_min_rtt: i64,
    pub tcp_mean_mss: i64,
    pub tcp_min_mss: i64,
    pub tcp_total_retransmissions: i64,
    pub tcp_lost_packets: i64,
    pub tcp_unrecovered_to: i64,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tenant: String,
}

// ── Aggregated flows ──────────────────────────────────────────────

/// One side of a flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub aggregated_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
}

/// The fields that define "the same flow".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct L3FlowKey {
    pub action: String,
    pub reporter: String,
    pub protocol: String,
    pub source: Endpoint,
    pub destination: Endpoint,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub namespace: String,
    pub name: String,
    pub port_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStats {
    /// Sum of flows reported across all matching rows.
    pub log_count: i64,
    /// Number of raw rows aggregated into this flow.
    pub flow_log_count: i64,
    pub started: i64,
    pub completed: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficStats {
    pub packets_in: i64,
    pub packets_out: i64,
    pub bytes_in: i64,
    pub bytes_out: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpStats {
    pub allowed_in: i64,
    pub denied_in: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TcpStats {
    pub total_retransmissions: i64,
    pub lost_packets: i64,
    pub unrecovered_to: i64,

    pub min_send_congestion_window: f64,
    pub min_mss: f64,
    pub max_smooth_rtt: f64,
    pub max_min_rtt: f64,

    pub mean_send_congestion_window: f64,
    pub mean_smooth_rtt: f64,
    pub mean_min_rtt: f64,
    pub mean_mss: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStats {
    pub min_num_names_per_flow: i64,
    pub max_num_names_per_flow: i64,
    pub min_num_ids_per_flow: i64,
    pub max_num_ids_per_flow: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowLabelValue {
    pub value: String,
    pub count: i64,
}

/// All values observed for one label key, sorted by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowLabels {
    pub key: String,
    pub values: Vec<FlowLabelValue>,
}

/// A query-time aggregate of every flow log row sharing an [`L3FlowKey`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct L3Flow {
    pub key: L3FlowKey,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_stats: Option<LogStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Service>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_stats: Option<TrafficStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_stats: Option<HttpStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_stats: Option<TcpStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<Process>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_stats: Option<ProcessStats>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_labels: Vec<FlowLabels>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destination_labels: Vec<FlowLabels>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<PolicyHit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enforced_policies: Vec<PolicyHit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_policies: Vec<PolicyHit>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destination_domains: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_ips: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destination_ips: Vec<String>,
}
