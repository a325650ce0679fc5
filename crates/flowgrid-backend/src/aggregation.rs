//! Composite aggregation specifications.
//!
//! A specification is a static table: the ordered composite sources that
//! define a group's identity, the numeric accumulators computed per group,
//! and the term sub-aggregations (nested label/policy terms and plain
//! top-level terms). [`AggregationSpec::composite`] renders it as the
//! store's aggregation body.

use serde_json::{Map, Value, json};

use flowgrid_core::AfterKey;

/// Name of the composite aggregation in every request.
pub const COMPOSITE_NAME: &str = "buckets";

/// Size of nested and top-level terms sub-aggregations. Endpoints with more
/// than this many label pairs (or flows with more distinct policy hits)
/// report only the first ten. Matches the behaviour of existing consumers;
/// a composite aggregation per path would lift the cap at a higher query
/// cost.
pub const NESTED_TERMS_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// One field of the composite key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeSource {
    pub name: &'static str,
    pub field: &'static str,
    pub order: Option<SortOrder>,
    /// Documents lacking the field form their own bucket with a null key.
    pub missing_bucket: bool,
}

impl CompositeSource {
    pub const fn new(name: &'static str, field: &'static str) -> Self {
        Self {
            name,
            field,
            order: None,
            missing_bucket: false,
        }
    }

    pub const fn order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub const fn allow_missing(mut self) -> Self {
        self.missing_bucket = true;
        self
    }

    fn to_json(self) -> Value {
        let mut terms = Map::new();
        terms.insert("field".into(), json!(self.field));
        if let Some(order) = self.order {
            terms.insert("order".into(), json!(order.as_str()));
        }
        if self.missing_bucket {
            terms.insert("missing_bucket".into(), json!(true));
        }
        json!({ self.name: {"terms": terms} })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Sum,
    Min,
    Max,
    Mean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accumulator {
    pub name: &'static str,
    pub field: &'static str,
    pub metric: Metric,
}

impl Accumulator {
    pub const fn sum(name: &'static str, field: &'static str) -> Self {
        Self { name, field, metric: Metric::Sum }
    }

    pub const fn min(name: &'static str, field: &'static str) -> Self {
        Self { name, field, metric: Metric::Min }
    }

    pub const fn max(name: &'static str, field: &'static str) -> Self {
        Self { name, field, metric: Metric::Max }
    }

    pub const fn mean(name: &'static str, field: &'static str) -> Self {
        Self { name, field, metric: Metric::Mean }
    }

    fn to_json(self) -> Value {
        match self.metric {
            Metric::Sum => json!({"sum": {"field": self.field}}),
            Metric::Min => json!({"min": {"field": self.field}}),
            Metric::Max => json!({"max": {"field": self.field}}),
            Metric::Mean => json!({"avg": {"field": self.field}}),
        }
    }
}

/// Terms aggregation over a field inside a nested document path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedTerms {
    pub name: &'static str,
    pub path: &'static str,
    pub term: &'static str,
    pub field: &'static str,
}

impl NestedTerms {
    fn to_json(self) -> Value {
        json!({
            "nested": {"path": self.path},
            "aggs": { self.term: {"terms": {"field": self.field, "size": NESTED_TERMS_SIZE}} }
        })
    }
}

/// Terms aggregation over a top-level field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terms {
    pub name: &'static str,
    pub field: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct AggregationSpec {
    pub sources: &'static [CompositeSource],
    pub accumulators: &'static [Accumulator],
    pub nested: &'static [NestedTerms],
    pub terms: &'static [Terms],
}

impl AggregationSpec {
    pub fn source(&self, name: &str) -> Option<&CompositeSource> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Render the composite aggregation for one page.
    pub fn composite(&self, size: usize, after: Option<&AfterKey>) -> Value {
        let sources: Vec<Value> = self.sources.iter().map(|s| s.to_json()).collect();
        let mut composite = Map::new();
        composite.insert("size".into(), json!(size));
        composite.insert("sources".into(), Value::Array(sources));
        if let Some(after) = after {
            composite.insert("after".into(), Value::Object(after.clone()));
        }

        let mut aggs = Map::new();
        for acc in self.accumulators {
            aggs.insert(acc.name.into(), acc.to_json());
        }
        for nested in self.nested {
            aggs.insert(nested.name.into(), nested.to_json());
        }
        for terms in self.terms {
            aggs.insert(
                terms.name.into(),
                json!({"terms": {"field": terms.field, "size": NESTED_TERMS_SIZE}}),
            );
        }

        let mut body = Map::new();
        body.insert("composite".into(), Value::Object(composite));
        if !aggs.is_empty() {
            body.insert("aggs".into(), Value::Object(aggs));
        }
        Value::Object(body)
    }
}

// ── Flow aggregation ──────────────────────────────────────────────

pub mod flow {
    //! Names of the flow aggregation's keys and accumulators.

    use super::*;

    pub const DEST_TYPE: &str = "dest_type";
    pub const DEST_NAMESPACE: &str = "dest_namespace";
    pub const DEST_NAME_AGGR: &str = "dest_name_aggr";
    pub const DEST_SERVICE_NAMESPACE: &str = "dest_service_namespace";
    pub const DEST_SERVICE_NAME: &str = "dest_service_name";
    pub const DEST_SERVICE_PORT_NAME: &str = "dest_service_port_name";
    pub const DEST_SERVICE_PORT_NUM: &str = "dest_service_port_num";
    pub const PROTO: &str = "proto";
    pub const DEST_PORT_NUM: &str = "dest_port_num";
    pub const SOURCE_TYPE: &str = "source_type";
    pub const SOURCE_NAMESPACE: &str = "source_namespace";
    pub const SOURCE_NAME_AGGR: &str = "source_name_aggr";
    pub const PROCESS_NAME: &str = "process_name";
    pub const REPORTER: &str = "reporter";
    pub const ACTION: &str = "action";

    pub const SUM_NUM_FLOWS: &str = "sum_num_flows";
    pub const SUM_NUM_FLOWS_STARTED: &str = "sum_num_flows_started";
    pub const SUM_NUM_FLOWS_COMPLETED: &str = "sum_num_flows_completed";
    pub const SUM_PACKETS_IN: &str = "sum_packets_in";
    pub const SUM_BYTES_IN: &str = "sum_bytes_in";
    pub const SUM_PACKETS_OUT: &str = "sum_packets_out";
    pub const SUM_BYTES_OUT: &str = "sum_bytes_out";
    pub const SUM_HTTP_ALLOWED_IN: &str = "sum_http_requests_allowed_in";
    pub const SUM_HTTP_DENIED_IN: &str = "sum_http_requests_denied_in";
    pub const SUM_TCP_RETRANSMISSIONS: &str = "sum_tcp_total_retransmissions";
    pub const SUM_TCP_LOST_PACKETS: &str = "sum_tcp_lost_packets";
    pub const SUM_TCP_UNRECOVERED_TO: &str = "sum_tcp_unrecovered_to";

    pub const MIN_PROCESS_NAMES: &str = "process_names_min_num";
    pub const MIN_PROCESS_IDS: &str = "process_ids_min_num";
    pub const MIN_TCP_SEND_CWND: &str = "tcp_min_send_congestion_window";
    pub const MIN_TCP_MSS: &str = "tcp_min_mss";

    pub const MAX_PROCESS_NAMES: &str = "process_names_max_num";
    pub const MAX_PROCESS_IDS: &str = "process_ids_max_num";
    pub const MAX_TCP_SMOOTH_RTT: &str = "tcp_max_smooth_rtt";
    pub const MAX_TCP_MIN_RTT: &str = "tcp_max_min_rtt";

    pub const MEAN_TCP_SEND_CWND: &str = "tcp_mean_send_congestion_window";
    pub const MEAN_TCP_SMOOTH_RTT: &str = "tcp_mean_smooth_rtt";
    pub const MEAN_TCP_MIN_RTT: &str = "tcp_mean_min_rtt";
    pub const MEAN_TCP_MSS: &str = "tcp_mean_mss";

    pub const SOURCE_LABELS: &str = "source_labels";
    pub const DEST_LABELS: &str = "dest_labels";
    pub const LABEL_TERM: &str = "by_kvpair";
    pub const POLICIES: &str = "policies";
    pub const ENFORCED_POLICIES: &str = "enforced_policies";
    pub const PENDING_POLICIES: &str = "pending_policies";
    pub const ALL_POLICY_TERM: &str = "by_tiered_policy";
    pub const ENFORCED_POLICY_TERM: &str = "by_tiered_enforced_policy";
    pub const PENDING_POLICY_TERM: &str = "by_tiered_pending_policy";
    pub const DEST_DOMAINS: &str = "dest_domains";
    pub const SOURCE_IPS: &str = "source_ip";
    pub const DEST_IPS: &str = "dest_ip";

    pub static SPEC: AggregationSpec = AggregationSpec {
        sources: &[
            CompositeSource::new(DEST_TYPE, "dest_type"),
            CompositeSource::new(DEST_NAMESPACE, "dest_namespace"),
            CompositeSource::new(DEST_NAME_AGGR, "dest_name_aggr"),
            CompositeSource::new(DEST_SERVICE_NAMESPACE, "dest_service_namespace")
                .order(SortOrder::Desc)
                .allow_missing(),
            CompositeSource::new(DEST_SERVICE_NAME, "dest_service_name").allow_missing(),
            CompositeSource::new(DEST_SERVICE_PORT_NAME, "dest_service_port").allow_missing(),
            CompositeSource::new(DEST_SERVICE_PORT_NUM, "dest_service_port_num").allow_missing(),
            CompositeSource::new(PROTO, "proto"),
            CompositeSource::new(DEST_PORT_NUM, "dest_port").allow_missing(),
            CompositeSource::new(SOURCE_TYPE, "source_type"),
            CompositeSource::new(SOURCE_NAMESPACE, "source_namespace"),
            CompositeSource::new(SOURCE_NAME_AGGR, "source_name_aggr"),
            CompositeSource::new(PROCESS_NAME, "process_name").allow_missing(),
            CompositeSource::new(REPORTER, "reporter"),
            CompositeSource::new(ACTION, "action"),
        ],
        accumulators: &[
            Accumulator::sum(SUM_NUM_FLOWS, "num_flows"),
            Accumulator::sum(SUM_NUM_FLOWS_STARTED, "num_flows_started"),
            Accumulator::sum(SUM_NUM_FLOWS_COMPLETED, "num_flows_completed"),
            Accumulator::sum(SUM_PACKETS_IN, "packets_in"),
            Accumulator::sum(SUM_BYTES_IN, "bytes_in"),
            Accumulator::sum(SUM_PACKETS_OUT, "packets_out"),
            Accumulator::sum(SUM_BYTES_OUT, "bytes_out"),
            Accumulator::sum(SUM_HTTP_ALLOWED_IN, "http_requests_allowed_in"),
            Accumulator::sum(SUM_HTTP_DENIED_IN, "http_requests_denied_in"),
            Accumulator::sum(SUM_TCP_RETRANSMISSIONS, "tcp_total_retransmissions"),
            Accumulator::sum(SUM_TCP_LOST_PACKETS, "tcp_lost_packets"),
            Accumulator::sum(SUM_TCP_UNRECOVERED_TO, "tcp_unrecovered_to"),
            Accumulator::min(MIN_PROCESS_NAMES, "num_process_names"),
            Accumulator::min(MIN_PROCESS_IDS, "num_process_ids"),
            Accumulator::min(MIN_TCP_SEND_CWND, "tcp_min_send_congestion_window"),
            Accumulator::min(MIN_TCP_MSS, "tcp_min_mss"),
            Accumulator::max(MAX_PROCESS_NAMES, "num_process_names"),
            Accumulator::max(MAX_PROCESS_IDS, "num_process_ids"),
            Accumulator::max(MAX_TCP_SMOOTH_RTT, "tcp_max_smooth_rtt"),
            Accumulator::max(MAX_TCP_MIN_RTT, "tcp_max_min_rtt"),
            Accumulator::mean(MEAN_TCP_SEND_CWND, "tcp_mean_send_congestion_window"),
            Accumulator::mean(MEAN_TCP_SMOOTH_RTT, "tcp_mean_smooth_rtt"),
            Accumulator::mean(MEAN_TCP_MIN_RTT, "tcp_mean_min_rtt"),
            Accumulator::mean(MEAN_TCP_MSS, "tcp_mean_mss"),
        ],
        nested: &[
            NestedTerms {
                name: DEST_LABELS,
                path: "dest_labels",
                term: LABEL_TERM,
                field: "dest_labels.labels",
            },
            NestedTerms {
                name: SOURCE_LABELS,
                path: "source_labels",
                term: LABEL_TERM,
                field: "source_labels.labels",
            },
            NestedTerms {
                name: POLICIES,
                path: "policies",
                term: ALL_POLICY_TERM,
                field: "policies.all_policies",
            },
            NestedTerms {
                name: ENFORCED_POLICIES,
                path: "policies",
                term: ENFORCED_POLICY_TERM,
                field: "policies.enforced_policies",
            },
            NestedTerms {
                name: PENDING_POLICIES,
                path: "policies",
                term: PENDING_POLICY_TERM,
                field: "policies.pending_policies",
            },
        ],
        terms: &[
            Terms {
                name: DEST_DOMAINS,
                field: "dest_domains",
            },
            Terms {
                name: SOURCE_IPS,
                field: "source_ip",
            },
            Terms {
                name: DEST_IPS,
                field: "dest_ip",
            },
        ],
    };
}
