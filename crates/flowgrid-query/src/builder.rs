//! Query assembly.

use chrono::{DateTime, Utc};
use tracing::debug;

use flowgrid_core::{ClusterInfo, DnsLogParams, FlowLogParams, Index, L3FlowParams, QueryParams, TimeRange};

use crate::dsl::{BoolQuery, Query};
use crate::error::{QueryError, QueryResult};
use crate::filters;

pub const FIELD_CLUSTER: &str = "cluster";
pub const FIELD_TENANT: &str = "tenant";
/// Default time field; stored as epoch seconds.
pub const FIELD_END_TIME: &str = "end_time";

/// Parameters that can be turned into a query.
pub trait LogQuery {
    fn query_params(&self) -> &QueryParams;

    /// Optional filter clauses beyond tenancy and time.
    fn filters(&self) -> QueryResult<Vec<Query>>;
}

impl LogQuery for L3FlowParams {
    fn query_params(&self) -> &QueryParams {
        &self.query
    }

    fn filters(&self) -> QueryResult<Vec<Query>> {
        filters::flow_filters(&self.filters)
    }
}

impl LogQuery for FlowLogParams {
    fn query_params(&self) -> &QueryParams {
        &self.query
    }

    fn filters(&self) -> QueryResult<Vec<Query>> {
        filters::flow_filters(&self.filters)
    }
}

impl LogQuery for DnsLogParams {
    fn query_params(&self) -> &QueryParams {
        &self.query
    }

    fn filters(&self) -> QueryResult<Vec<Query>> {
        let mut out = Vec::new();
        if !self.qnames.is_empty() {
            out.push(Query::one_of("qname", &self.qnames));
        }
        if !self.rcodes.is_empty() {
            out.push(Query::one_of("rcode", &self.rcodes));
        }
        if !self.client_namespaces.is_empty() {
            out.push(Query::one_of("client_namespace", &self.client_namespaces));
        }
        Ok(out)
    }
}

/// Builds the boolean query for one index and cluster.
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    index: &'a Index,
    info: &'a ClusterInfo,
    time_field: &'a str,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(index: &'a Index, info: &'a ClusterInfo) -> Self {
        Self {
            index,
            info,
            time_field: FIELD_END_TIME,
        }
    }

    pub fn with_time_field(mut self, field: &'a str) -> Self {
        self.time_field = field;
        self
    }

    /// Tenant and cluster clauses. Multi-index deployments are isolated by
    /// index name, so only the shared single index needs them.
    pub fn base_filter(&self) -> Vec<Query> {
        if !self.index.is_single_index() {
            return Vec::new();
        }
        let mut out = vec![Query::term(FIELD_CLUSTER, self.info.cluster.as_str())];
        if self.info.has_tenant() {
            out.push(Query::term(FIELD_TENANT, self.info.tenant.as_str()));
        }
        out
    }

    pub fn time_filter(&self, range: &TimeRange) -> QueryResult<Query> {
        if !range.is_valid() {
            return Err(QueryError::InvalidTimeRange {
                from: range.from.to_rfc3339(),
                to: range.to.to_rfc3339(),
            });
        }
        Ok(Query::range(
            self.time_field,
            range.from.timestamp(),
            range.to.timestamp(),
        ))
    }

    /// Full query: base filter, then time range, then the parameter
    /// filters, all AND'd.
    pub fn build<P: LogQuery>(&self, params: &P, now: DateTime<Utc>) -> QueryResult<Query> {
        let range = params.query_params().time_range_or_default(now);
        let mut q = BoolQuery::new();
        for clause in self.base_filter() {
            q = q.filter(clause);
        }
        q = q.filter(self.time_filter(&range)?);
        for clause in params.filters()? {
            q = q.filter(clause);
        }
        debug!(
            index = %self.index.read_pattern(self.info),
            clauses = q.filter.len(),
            from = %range.from,
            to = %range.to,
            "built query"
        );
        Ok(q.into())
    }
}
