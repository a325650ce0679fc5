//! Index bootstrapping before the first write.
//!
//! ```text
//!   CachedInitializer ── seen (DataType, ClusterInfo)? ──yes──► done
//!          │ no
//!          ▼ install lock, check again
//!   StoreInitializer:  alias exists? ──yes──► done
//!          │ no
//!          ├─ PUT lifecycle policy
//!          ├─ PUT index template
//!          └─ PUT bootstrap index with the write alias
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use flowgrid_core::{ClusterInfo, DataType, Index};
use flowgrid_store::DocumentStore;

use crate::error::{BackendError, BackendResult};
use crate::guard::guarded;

pub type InitFuture<'a> = Pin<Box<dyn Future<Output = BackendResult<()>> + Send + 'a>>;

/// Makes sure the write alias of an index exists. Must be idempotent.
pub trait IndexInitializer: Send + Sync {
    fn ensure_initialized<'a>(
        &'a self,
        index: &'a Index,
        info: &'a ClusterInfo,
        cancel: &'a CancellationToken,
    ) -> InitFuture<'a>;
}

// ── Store-backed installation ─────────────────────────────────────

/// Rollover and retention applied through the lifecycle policy.
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub rollover_size: String,
    pub rollover_age: String,
    pub retention: String,
    pub shards: u32,
    pub replicas: u32,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            rollover_size: "50gb".into(),
            rollover_age: "1d".into(),
            retention: "7d".into(),
            shards: 1,
            replicas: 0,
        }
    }
}

impl LifecycleSettings {
    fn policy_body(&self) -> Value {
        json!({
            "policy": {
                "phases": {
                    "hot": {
                        "actions": {
                            "rollover": {
                                "max_size": self.rollover_size,
                                "max_age": self.rollover_age
                            }
                        }
                    },
                    "delete": {
                        "min_age": self.retention,
                        "actions": {"delete": {}}
                    }
                }
            }
        })
    }

    fn template_body(&self, index: &Index, info: &ClusterInfo) -> Value {
        json!({
            "index_patterns": [index.read_pattern(info)],
            "template": {
                "settings": {
                    "number_of_shards": self.shards,
                    "number_of_replicas": self.replicas,
                    "index.lifecycle.name": index.lifecycle_policy_name(),
                    "index.lifecycle.rollover_alias": index.write_alias(info)
                }
            }
        })
    }
}

/// Installs the lifecycle policy, index template and bootstrap index for
/// an index whose write alias does not exist yet.
pub struct StoreInitializer<S: ?Sized> {
    store: Arc<S>,
    lifecycle: LifecycleSettings,
    timeout: Duration,
}

impl<S: DocumentStore + ?Sized> StoreInitializer<S> {
    pub fn new(store: Arc<S>, timeout: Duration) -> Self {
        Self {
            store,
            lifecycle: LifecycleSettings::default(),
            timeout,
        }
    }

    pub fn with_lifecycle(mut self, lifecycle: LifecycleSettings) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    async fn install(&self, index: &Index, info: &ClusterInfo, cancel: &CancellationToken) -> BackendResult<()> {
        let alias = index.write_alias(info);
        let store = self.store.as_ref();

        let exists = guarded(cancel, self.timeout, "index exists", &alias, store.index_exists(&alias)).await?;
        if exists {
            debug!(%alias, "write alias already present");
            return Ok(());
        }

        let policy = index.lifecycle_policy_name();
        let policy_body = self.lifecycle.policy_body();
        guarded(
            cancel,
            self.timeout,
            "put lifecycle policy",
            &policy,
            store.put_lifecycle_policy(&policy, &policy_body),
        )
        .await?;

        let template = index.template_name(info);
        let template_body = self.lifecycle.template_body(index, info);
        guarded(
            cancel,
            self.timeout,
            "put index template",
            &template,
            store.put_index_template(&template, &template_body),
        )
        .await?;

        let bootstrap = index.bootstrap_name(info);
        let mut aliases = serde_json::Map::new();
        aliases.insert(alias.clone(), json!({"is_write_index": true}));
        let body = json!({ "aliases": aliases });
        guarded(
            cancel,
            self.timeout,
            "create index",
            &bootstrap,
            store.create_index(&bootstrap, &body),
        )
        .await?;

        info!(%alias, %template, %policy, cluster = %info, "initialized index");
        Ok(())
    }
}

impl<S: DocumentStore + ?Sized> IndexInitializer for StoreInitializer<S> {
    fn ensure_initialized<'a>(
        &'a self,
        index: &'a Index,
        info: &'a ClusterInfo,
        cancel: &'a CancellationToken,
    ) -> InitFuture<'a> {
        Box::pin(self.install(index, info, cancel))
    }
}

// ── Memoisation ───────────────────────────────────────────────────

/// Remembers which `(DataType, ClusterInfo)` pairs are initialized.
///
/// Concurrent first writers for the same pair install exactly once: the
/// fast path reads the set, the slow path takes the install lock and looks
/// again before installing. Failures are not remembered, so the next write
/// retries.
pub struct CachedInitializer<I> {
    inner: I,
    done: RwLock<HashSet<(DataType, ClusterInfo)>>,
    install: tokio::sync::Mutex<()>,
}

impl<I: IndexInitializer> CachedInitializer<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            done: RwLock::new(HashSet::new()),
            install: tokio::sync::Mutex::new(()),
        }
    }

    fn is_done(&self, key: &(DataType, ClusterInfo)) -> bool {
        match self.done.read() {
            Ok(done) => done.contains(key),
            Err(poisoned) => poisoned.into_inner().contains(key),
        }
    }

    fn mark_done(&self, key: (DataType, ClusterInfo)) {
        match self.done.write() {
            Ok(mut done) => done.insert(key),
            Err(poisoned) => poisoned.into_inner().insert(key),
        };
    }

    async fn ensure(&self, index: &Index, info: &ClusterInfo, cancel: &CancellationToken) -> BackendResult<()> {
        let key = (index.data_type(), info.clone());
        if self.is_done(&key) {
            return Ok(());
        }

        let _install = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BackendError::Cancelled),
            guard = self.install.lock() => guard,
        };
        if self.is_done(&key) {
            return Ok(());
        }

        match self.inner.ensure_initialized(index, info, cancel).await {
            Ok(()) => {
                self.mark_done(key);
                Ok(())
            }
            Err(e) => {
                warn!(data_type = %index.data_type(), cluster = %info, error = %e, "index initialization failed");
                Err(e)
            }
        }
    }
}

impl<I: IndexInitializer> IndexInitializer for CachedInitializer<I> {
    fn ensure_initialized<'a>(
        &'a self,
        index: &'a Index,
        info: &'a ClusterInfo,
        cancel: &'a CancellationToken,
    ) -> InitFuture<'a> {
        Box::pin(self.ensure(index, info, cancel))
    }
}
