pub mod flows;
pub mod indices;
pub mod ingest;
pub mod logs;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{TimeDelta, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use flowgrid_backend::{BackendSettings, CachedInitializer, IndexInitializer, StoreInitializer};
use flowgrid_core::{AfterKey, ClusterInfo, EngineConfig, QueryParams, TimeRange};
use flowgrid_store::HttpDocumentStore;

use crate::{Target, Window};

/// Read the config file, or fall back to defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if path.is_file() {
        let config = EngineConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    } else {
        debug!(path = %path.display(), "no config file, using defaults");
        Ok(EngineConfig::default())
    }
}

/// Store client, settings and initializer shared by the commands that talk
/// to the document store.
pub struct Engine {
    pub store: Arc<HttpDocumentStore>,
    pub settings: BackendSettings,
    pub initializer: Arc<dyn IndexInitializer>,
}

impl Engine {
    pub fn connect(config: &EngineConfig) -> Result<Self> {
        let store = Arc::new(
            HttpDocumentStore::new(&config.store_url)
                .with_context(|| format!("connecting to {}", config.store_url))?,
        );
        let settings = BackendSettings::from_config(config);
        let initializer = Arc::new(CachedInitializer::new(StoreInitializer::new(
            store.clone(),
            settings.timeout,
        )));
        Ok(Self {
            store,
            settings,
            initializer,
        })
    }
}

pub fn cluster_info(target: &Target) -> Result<ClusterInfo> {
    let info = ClusterInfo::new(target.tenant.as_str(), target.cluster.as_str());
    info.validate()?;
    Ok(info)
}

pub fn query_params(window: &Window) -> Result<QueryParams> {
    let after_key = window
        .after_key
        .as_deref()
        .map(serde_json::from_str::<AfterKey>)
        .transpose()
        .context("--after-key must be a JSON object")?;
    Ok(QueryParams {
        time_range: Some(TimeRange::last(TimeDelta::minutes(window.minutes), Utc::now())),
        max_page_size: window.page_size,
        after_key,
    })
}

/// Token cancelled on Ctrl-C, so an interrupted listing stops between store
/// calls instead of mid-page.
pub fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            child.cancel();
        }
    });
    token
}
