//! Cluster identity and the tenant-isolation boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Identifies the tenant and managed cluster a request belongs to.
///
/// `tenant` is empty for single-tenant deployments. `cluster` is always
/// required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterInfo {
    #[serde(default)]
    pub tenant: String,
    pub cluster: String,
}

impl ClusterInfo {
    pub fn new(tenant: impl Into<String>, cluster: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            cluster: cluster.into(),
        }
    }

    /// Identity for a single-tenant deployment.
    pub fn cluster(cluster: impl Into<String>) -> Self {
        Self::new("", cluster)
    }

    pub fn has_tenant(&self) -> bool {
        !self.tenant.is_empty()
    }

    /// Reject identities with no cluster.
    pub fn validate(&self) -> CoreResult<()> {
        if self.cluster.is_empty() {
            return Err(CoreError::MissingCluster);
        }
        Ok(())
    }

    /// The dotted segment used in multi-index names: `tenant.cluster` or
    /// `cluster` when there is no tenant.
    pub fn index_segment(&self) -> String {
        if self.has_tenant() {
            format!("{}.{}", self.tenant, self.cluster)
        } else {
            self.cluster.clone()
        }
    }
}

impl fmt::Display for ClusterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_tenant() {
            write!(f, "{}/{}", self.tenant, self.cluster)
        } else {
            write!(f, "{}", self.cluster)
        }
    }
}

/// Enforces that every request carries the tenant this service was
/// started for.
///
/// A guard built with an empty tenant is single-tenant and accepts any
/// tenant value on the request.
#[derive(Debug, Clone, Default)]
pub struct TenantGuard {
    expected: Option<String>,
}

impl TenantGuard {
    pub fn new(tenant: &str) -> Self {
        Self {
            expected: (!tenant.is_empty()).then(|| tenant.to_string()),
        }
    }

    pub fn single_tenant() -> Self {
        Self::default()
    }

    pub fn is_multi_tenant(&self) -> bool {
        self.expected.is_some()
    }

    /// Validate a request identity. Must be called before any storage call.
    pub fn check(&self, info: &ClusterInfo) -> CoreResult<()> {
        info.validate()?;
        match &self.expected {
            Some(expected) if *expected != info.tenant => {
                tracing::warn!(
                    expected = %expected,
                    got = %info.tenant,
                    cluster = %info.cluster,
                    "rejecting request for foreign tenant"
                );
                Err(CoreError::BadTenant)
            }
            _ => Ok(()),
        }
    }
}
