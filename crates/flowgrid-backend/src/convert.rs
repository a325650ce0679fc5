//! Bucket to [`L3Flow`] conversion.

use flowgrid_core::{
    Endpoint, HttpStats, L3Flow, L3FlowKey, LogStats, Process, ProcessStats, Service, TcpStats,
    TrafficStats,
};

use crate::aggregation::flow::*;
use crate::bucket::Bucket;
use crate::labels::labels_from_terms;
use crate::policy::parse_policy_hits;

const TCP: &str = "tcp";

/// Placeholder the collectors write for an unknown value.
const UNSET: &str = "-";

fn is_set(value: &str) -> bool {
    !value.is_empty() && value != UNSET
}

/// Build one aggregated flow from a flow aggregation bucket.
///
/// TCP statistics are attached only to TCP flows and process details only
/// when the flow has a process name; both decisions use the composite key,
/// not the presence of the metrics. Empty and `-` keys count as unset.
pub fn convert_flow_bucket(b: &Bucket<'_>) -> L3Flow {
    let protocol = b.key_str(PROTO);
    let key = L3FlowKey {
        action: b.key_str(ACTION),
        reporter: b.key_str(REPORTER),
        protocol: protocol.clone(),
        source: Endpoint {
            kind: b.key_str(SOURCE_TYPE),
            namespace: b.key_str(SOURCE_NAMESPACE),
            aggregated_name: b.key_str(SOURCE_NAME_AGGR),
            port: None,
        },
        destination: Endpoint {
            kind: b.key_str(DEST_TYPE),
            namespace: b.key_str(DEST_NAMESPACE),
            aggregated_name: b.key_str(DEST_NAME_AGGR),
            port: b.key_i64(DEST_PORT_NUM),
        },
    };

    let mut flow = L3Flow {
        key,
        log_stats: Some(LogStats {
            flow_log_count: b.doc_count(),
            log_count: b.metric_i64(SUM_NUM_FLOWS),
            started: b.metric_i64(SUM_NUM_FLOWS_STARTED),
            completed: b.metric_i64(SUM_NUM_FLOWS_COMPLETED),
        }),
        traffic_stats: Some(TrafficStats {
            packets_in: b.metric_i64(SUM_PACKETS_IN),
            packets_out: b.metric_i64(SUM_PACKETS_OUT),
            bytes_in: b.metric_i64(SUM_BYTES_IN),
            bytes_out: b.metric_i64(SUM_BYTES_OUT),
        }),
        http_stats: Some(HttpStats {
            allowed_in: b.metric_i64(SUM_HTTP_ALLOWED_IN),
            denied_in: b.metric_i64(SUM_HTTP_DENIED_IN),
        }),
        ..Default::default()
    };

    let service_name = b.key_str(DEST_SERVICE_NAME);
    if is_set(&service_name) {
        flow.service = Some(Service {
            namespace: b.key_str(DEST_SERVICE_NAMESPACE),
            name: service_name,
            port_name: b.key_str(DEST_SERVICE_PORT_NAME),
            port: b.key_i64(DEST_SERVICE_PORT_NUM),
        });
    }

    if protocol == TCP {
        flow.tcp_stats = Some(TcpStats {
            total_retransmissions: b.metric_i64(SUM_TCP_RETRANSMISSIONS),
            lost_packets: b.metric_i64(SUM_TCP_LOST_PACKETS),
            unrecovered_to: b.metric_i64(SUM_TCP_UNRECOVERED_TO),
            min_send_congestion_window: b.metric(MIN_TCP_SEND_CWND),
            min_mss: b.metric(MIN_TCP_MSS),
            max_smooth_rtt: b.metric(MAX_TCP_SMOOTH_RTT),
            max_min_rtt: b.metric(MAX_TCP_MIN_RTT),
            mean_send_congestion_window: b.metric(MEAN_TCP_SEND_CWND),
            mean_smooth_rtt: b.metric(MEAN_TCP_SMOOTH_RTT),
            mean_min_rtt: b.metric(MEAN_TCP_MIN_RTT),
            mean_mss: b.metric(MEAN_TCP_MSS),
        });
    }

    let process_name = b.key_str(PROCESS_NAME);
    if is_set(&process_name) {
        flow.process = Some(Process { name: process_name });
        flow.process_stats = Some(ProcessStats {
            min_num_names_per_flow: b.metric_i64(MIN_PROCESS_NAMES),
            max_num_names_per_flow: b.metric_i64(MAX_PROCESS_NAMES),
            min_num_ids_per_flow: b.metric_i64(MIN_PROCESS_IDS),
            max_num_ids_per_flow: b.metric_i64(MAX_PROCESS_IDS),
        });
    }

    flow.source_labels = labels_from_terms(&b.nested_terms(SOURCE_LABELS, LABEL_TERM));
    flow.destination_labels = labels_from_terms(&b.nested_terms(DEST_LABELS, LABEL_TERM));

    flow.policies = parse_policy_hits(&b.nested_terms(POLICIES, ALL_POLICY_TERM));
    flow.enforced_policies = parse_policy_hits(&b.nested_terms(ENFORCED_POLICIES, ENFORCED_POLICY_TERM));
    flow.pending_policies = parse_policy_hits(&b.nested_terms(PENDING_POLICIES, PENDING_POLICY_TERM));

    flow.destination_domains = sorted_keys(b.terms(DEST_DOMAINS));
    flow.source_ips = sorted_keys(b.terms(SOURCE_IPS));
    flow.destination_ips = sorted_keys(b.terms(DEST_IPS));

    flow
}

fn sorted_keys(terms: Vec<(String, i64)>) -> Vec<String> {
    let mut keys: Vec<String> = terms.into_iter().map(|(k, _)| k).collect();
    keys.sort();
    keys.dedup();
    keys
}
