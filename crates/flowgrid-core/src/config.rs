//! flowgrid.toml configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cluster::TenantGuard;
use crate::error::{CoreError, CoreResult};
use crate::index::{DataType, Index};

/// Which index naming strategy the deployment uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    #[default]
    Multi,
    Single,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tenant this service instance serves. Empty means single-tenant.
    pub tenant: String,
    pub index_mode: IndexMode,
    /// Prefix of multi-index base names (`<prefix>_<datatype>`).
    pub base_prefix: String,
    /// Prefix of single-index names (`<prefix>_<datatype>`).
    pub single_index_prefix: String,
    /// Page size used when a request does not set one.
    pub default_page_size: usize,
    /// Offset beyond which raw log listings switch to point-in-time paging.
    pub max_page_size: usize,
    /// Per-call timeout for storage requests, e.g. `"60s"`.
    pub request_timeout: String,
    pub store_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tenant: String::new(),
            index_mode: IndexMode::Multi,
            base_prefix: "tigera_secure_ee".to_string(),
            single_index_prefix: "calico".to_string(),
            default_page_size: 1000,
            max_page_size: 10_000,
            request_timeout: "60s".to_string(),
            store_url: "http://127.0.0.1:9200".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.default_page_size == 0 {
            return Err(CoreError::InvalidConfig(
                "default_page_size must be positive".into(),
            ));
        }
        if self.default_page_size > self.max_page_size {
            return Err(CoreError::InvalidConfig(format!(
                "default_page_size {} exceeds max_page_size {}",
                self.default_page_size, self.max_page_size
            )));
        }
        if parse_duration(&self.request_timeout).is_none() {
            return Err(CoreError::InvalidConfig(format!(
                "unparseable request_timeout {:?}",
                self.request_timeout
            )));
        }
        Ok(())
    }

    pub fn tenant_guard(&self) -> TenantGuard {
        TenantGuard::new(&self.tenant)
    }

    pub fn request_timeout(&self) -> Duration {
        parse_duration(&self.request_timeout).unwrap_or(Duration::from_secs(60))
    }

    /// Build the index addressing for a data type under the configured mode.
    pub fn index_for(&self, data_type: DataType) -> Index {
        match self.index_mode {
            IndexMode::Multi => Index::multi(format!("{}_{data_type}", self.base_prefix), data_type),
            IndexMode::Single => {
                Index::single(format!("{}_{data_type}", self.single_index_prefix), data_type)
            }
        }
    }
}

/// Parse `"500ms"`, `"30s"`, `"5m"` or `"1h"`.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        return ms.parse().ok().map(Duration::from_millis);
    }
    let split = s.len().checked_sub(1)?;
    if !s.is_char_boundary(split) {
        return None;
    }
    let (num, unit) = s.split_at(split);
    let n: u64 = num.parse().ok()?;
    match unit {
        "s" => Some(Duration::from_secs(n)),
        "m" => Some(Duration::from_secs(n * 60)),
        "h" => Some(Duration::from_secs(n * 3600)),
        _ => None,
    }
}
