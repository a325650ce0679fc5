//! Filter clauses for flow listings.

use flowgrid_core::{FlowFilters, LabelSelector, MatchType, NameMatch, NamespaceMatch, PolicyMatch};

use crate::dsl::{BoolQuery, Query};
use crate::error::{QueryError, QueryResult};

pub const FIELD_ACTION: &str = "action";
pub const FIELD_SOURCE_TYPE: &str = "source_type";
pub const FIELD_DEST_TYPE: &str = "dest_type";
pub const FIELD_SOURCE_NAMESPACE: &str = "source_namespace";
pub const FIELD_DEST_NAMESPACE: &str = "dest_namespace";
pub const FIELD_SOURCE_NAME_AGGR: &str = "source_name_aggr";
pub const FIELD_DEST_NAME_AGGR: &str = "dest_name_aggr";
pub const FIELD_ALL_POLICIES: &str = "policies.all_policies";

const STAGED: &str = "staged:";
pub const PATH_SOURCE_LABELS: &str = "source_labels";
pub const PATH_DEST_LABELS: &str = "dest_labels";

/// Apply `values` to the source field, the destination field, or either.
fn sided(match_type: MatchType, source: &str, dest: &str, values: &[String]) -> Query {
    match match_type {
        MatchType::Source => Query::one_of(source, values),
        MatchType::Destination => Query::one_of(dest, values),
        MatchType::Any => BoolQuery::any_of(vec![
            Query::one_of(source, values),
            Query::one_of(dest, values),
        ])
        .into(),
    }
}

pub fn namespace_match(m: &NamespaceMatch) -> Query {
    sided(m.match_type, FIELD_SOURCE_NAMESPACE, FIELD_DEST_NAMESPACE, &m.namespaces)
}

pub fn name_aggr_match(m: &NameMatch) -> Query {
    sided(m.match_type, FIELD_SOURCE_NAME_AGGR, FIELD_DEST_NAME_AGGR, &m.names)
}

/// Wildcard patterns over the stored hit string
/// `"<order>|<tier>|<name>|<action>|<rule>"`. Unset parts become `*`.
///
/// A policy name only matches whole names: it must follow the `.` that ends
/// the tier (or `knp.default`) prefix, or the `staged:` marker, and run up to
/// the next `|`. That takes two patterns; any one of them matching is a hit.
pub fn policy_patterns(m: &PolicyMatch) -> QueryResult<Vec<String>> {
    if m.is_empty() {
        return Err(QueryError::EmptyPolicyMatch);
    }
    let tier = m.tier.as_deref().unwrap_or("*");
    let action = m.action.as_deref().unwrap_or("*");
    let scope = match m.namespace.as_deref() {
        Some(ns) => format!("{ns}/"),
        None => String::new(),
    };
    let names = match m.name.as_deref() {
        Some(name) => vec![format!("{scope}*.{name}"), format!("{scope}*.{STAGED}{name}")],
        None => vec![format!("{scope}*")],
    };
    Ok(names
        .into_iter()
        .map(|name| format!("*|{tier}|{name}|{action}|*"))
        .collect())
}

/// Matches flows that hit any of the given policies.
pub fn policy_matches(matches: &[PolicyMatch]) -> QueryResult<Query> {
    let clauses = matches
        .iter()
        .map(policy_patterns)
        .collect::<QueryResult<Vec<_>>>()?
        .into_iter()
        .flatten()
        .map(|p| Query::wildcard(FIELD_ALL_POLICIES, p))
        .collect();
    Ok(BoolQuery::any_of(clauses).into())
}

/// Nested query requiring every selector to match a `key<op>value` label
/// term on one side of the flow.
pub fn label_selectors(selectors: &[LabelSelector], path: &str) -> QueryResult<Query> {
    let field = format!("{path}.labels");
    let mut inner = BoolQuery::new();
    for selector in selectors {
        if selector.values.is_empty() {
            return Err(QueryError::EmptySelector(selector.key.clone()));
        }
        let terms: Vec<String> = selector
            .values
            .iter()
            .map(|v| format!("{}{}{v}", selector.key, selector.operator))
            .collect();
        inner = inner.filter(Query::one_of(field.clone(), &terms));
    }
    Ok(Query::nested(path, inner.into()))
}

/// All optional flow filters, in a fixed order.
pub fn flow_filters(f: &FlowFilters) -> QueryResult<Vec<Query>> {
    let mut out = Vec::new();
    if !f.actions.is_empty() {
        out.push(Query::one_of(FIELD_ACTION, &f.actions));
    }
    if !f.source_types.is_empty() {
        out.push(Query::one_of(FIELD_SOURCE_TYPE, &f.source_types));
    }
    if !f.destination_types.is_empty() {
        out.push(Query::one_of(FIELD_DEST_TYPE, &f.destination_types));
    }
    out.extend(
        f.namespace_matches
            .iter()
            .filter(|m| !m.namespaces.is_empty())
            .map(namespace_match),
    );
    out.extend(
        f.name_aggr_matches
            .iter()
            .filter(|m| !m.names.is_empty())
            .map(name_aggr_match),
    );
    if !f.policy_matches.is_empty() {
        out.push(policy_matches(&f.policy_matches)?);
    }
    if !f.source_selectors.is_empty() {
        out.push(label_selectors(&f.source_selectors, PATH_SOURCE_LABELS)?);
    }
    if !f.destination_selectors.is_empty() {
        out.push(label_selectors(&f.destination_selectors, PATH_DEST_LABELS)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// `*`-only wildcard matching, as the store applies it.
    fn glob(pattern: &str, text: &str) -> bool {
        match pattern.split_once('*') {
            None => pattern == text,
            Some((head, rest)) => {
                text.starts_with(head)
                    && (head.len()..=text.len()).any(|i| text.is_char_boundary(i) && glob(rest, &text[i..]))
            }
        }
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn namespace_match_any_covers_both_sides() {
        let q = namespace_match(&NamespaceMatch {
            match_type: MatchType::Any,
            namespaces: strings(&["ns1"]),
        });
        assert_eq!(
            q.to_json(),
            json!({"bool": {
                "should": [
                    {"term": {"source_namespace": "ns1"}},
                    {"term": {"dest_namespace": "ns1"}}
                ],
                "minimum_should_match": 1
            }})
        );
    }

    #[test]
    fn name_match_destination_only() {
        let q = name_aggr_match(&NameMatch {
            match_type: MatchType::Destination,
            names: strings(&["db-*", "cache-*"]),
        });
        assert_eq!(
            q.to_json(),
            json!({"terms": {"dest_name_aggr": ["db-*", "cache-*"]}})
        );
    }

    #[test]
    fn policy_pattern_fills_wildcards() {
        let pm = PolicyMatch {
            tier: Some("default".into()),
            action: Some("deny".into()),
            ..Default::default()
        };
        assert_eq!(policy_patterns(&pm).unwrap(), vec!["*|default|*|deny|*"]);

        let pm = PolicyMatch {
            namespace: Some("ns1".into()),
            name: Some("allow-dns".into()),
            ..Default::default()
        };
        assert_eq!(
            policy_patterns(&pm).unwrap(),
            vec!["*|*|ns1/*.allow-dns|*|*", "*|*|ns1/*.staged:allow-dns|*|*"]
        );
    }

    #[test]
    fn policy_name_matches_whole_names_only() {
        let pm = PolicyMatch {
            name: Some("dns".into()),
            ..Default::default()
        };
        let patterns = policy_patterns(&pm).unwrap();
        let hits_any = |hit: &str| patterns.iter().any(|p| glob(p, hit));
        assert!(hits_any("0|default|default.dns|allow|0"));
        assert!(hits_any("0|default|ns1/default.dns|allow|-"));
        assert!(hits_any("0|default|default.staged:dns|allow|0"));
        assert!(hits_any("1|default|ns1/knp.default.dns|deny|2"));
        assert!(!hits_any("0|default|default.allow-dns|allow|0"));
        assert!(!hits_any("0|default|default.dns-egress|allow|0"));

        let q = policy_matches(&[pm]).unwrap().to_json();
        assert_eq!(q["bool"]["should"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn empty_policy_match_is_an_error() {
        assert_eq!(
            policy_patterns(&PolicyMatch::default()),
            Err(QueryError::EmptyPolicyMatch)
        );
        let err = policy_matches(&[
            PolicyMatch {
                tier: Some("t".into()),
                ..Default::default()
            },
            PolicyMatch::default(),
        ])
        .unwrap_err();
        assert_eq!(err, QueryError::EmptyPolicyMatch);
    }

    #[test]
    fn label_selectors_use_term_or_terms() {
        let q = label_selectors(
            &[
                LabelSelector {
                    key: "app".into(),
                    operator: "=".into(),
                    values: strings(&["web"]),
                },
                LabelSelector {
                    key: "tier".into(),
                    operator: "!=".into(),
                    values: strings(&["a", "b"]),
                },
            ],
            PATH_SOURCE_LABELS,
        )
        .unwrap();
        assert_eq!(
            q.to_json(),
            json!({"nested": {"path": "source_labels", "query": {"bool": {"filter": [
                {"term": {"source_labels.labels": "app=web"}},
                {"terms": {"source_labels.labels": ["tier!=a", "tier!=b"]}}
            ]}}}})
        );
    }

    #[test]
    fn selector_without_values_is_rejected() {
        let err = label_selectors(
            &[LabelSelector {
                key: "app".into(),
                operator: "=".into(),
                values: Vec::new(),
            }],
            PATH_DEST_LABELS,
        )
        .unwrap_err();
        assert_eq!(err, QueryError::EmptySelector("app".into()));
    }

    #[test]
    fn flow_filters_skip_unset_categories() {
        let filters = FlowFilters {
            actions: strings(&["allow", "deny"]),
            ..Default::default()
        };
        let out = flow_filters(&filters).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].to_json(),
            json!({"terms": {"action": ["allow", "deny"]}})
        );
        assert!(flow_filters(&FlowFilters::default()).unwrap().is_empty());
    }
}
