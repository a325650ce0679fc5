//! Per-backend runtime settings.

use std::time::Duration;

use flowgrid_core::{EngineConfig, TenantGuard};

/// Keep-alive requested for deep-paging point-in-time searches.
pub const DEFAULT_PIT_KEEP_ALIVE: &str = "5m";

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub guard: TenantGuard,
    /// Page size when the request does not set one.
    pub default_page_size: usize,
    /// Offset beyond which `from`/`size` paging gives way to point-in-time
    /// paging.
    pub deep_pagination_cutoff: usize,
    /// Upper bound for every individual store call.
    pub timeout: Duration,
    pub pit_keep_alive: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            guard: TenantGuard::single_tenant(),
            default_page_size: 1000,
            deep_pagination_cutoff: 10_000,
            timeout: Duration::from_secs(60),
            pit_keep_alive: DEFAULT_PIT_KEEP_ALIVE.to_string(),
        }
    }
}

impl BackendSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            guard: config.tenant_guard(),
            default_page_size: config.default_page_size,
            deep_pagination_cutoff: config.max_page_size,
            timeout: config.request_timeout(),
            pit_keep_alive: DEFAULT_PIT_KEEP_ALIVE.to_string(),
        }
    }

    pub fn with_tenant(mut self, tenant: &str) -> Self {
        self.guard = TenantGuard::new(tenant);
        self
    }

    /// Clamp a requested page size to `(0, cutoff]`.
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .filter(|n| *n > 0)
            .unwrap_or(self.default_page_size)
            .min(self.deep_pagination_cutoff)
    }
}
