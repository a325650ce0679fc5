//! Raw log documents other than flows.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsServer {
    pub name: String,
    pub name_aggr: String,
    pub namespace: String,
    pub ip: String,
}

/// One DNS observation reported by a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsLog {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub start_time: i64,
    pub end_time: i64,
    pub count: i64,

    pub client_name: String,
    pub client_name_aggr: String,
    pub client_namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub client_labels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<DnsServer>,

    pub qname: String,
    pub qclass: String,
    pub qtype: String,
    pub rcode: String,

    pub latency_count: i64,
    pub latency_mean: i64,
    pub latency_max: i64,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tenant: String,
}
