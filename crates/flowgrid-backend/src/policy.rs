//! Policy hit parsing and ordering for aggregated flows.

use tracing::warn;

use flowgrid_core::PolicyHit;

/// Parse the `(hit string, count)` pairs of one policy aggregation.
///
/// Malformed strings are logged and skipped. The result is sorted by tier
/// order and then rule index, i.e. the order in which policies are
/// evaluated, with name and action breaking ties. The result does not
/// depend on the order the store returned the terms in.
pub fn parse_policy_hits(terms: &[(String, i64)]) -> Vec<PolicyHit> {
    let mut hits: Vec<PolicyHit> = terms
        .iter()
        .filter_map(|(term, count)| match PolicyHit::parse(term, *count) {
            Ok(hit) => Some(hit),
            Err(e) => {
                warn!(error = %e, "skipping policy hit");
                None
            }
        })
        .collect();
    hits.sort_by(PolicyHit::evaluation_order);
    hits
}
