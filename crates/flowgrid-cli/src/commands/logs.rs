use anyhow::{Result, bail};
use serde::Serialize;

use flowgrid_backend::{LogBackend, LogDocument};
use flowgrid_core::{ClusterInfo, DnsLog, DnsLogParams, EngineConfig, FlowLog, FlowLogParams, List};
use flowgrid_store::HttpDocumentStore;

use super::{Engine, cluster_info, interrupt_token, query_params};
use crate::{LogKind, Target, Window};

pub async fn list(config: &EngineConfig, kind: LogKind, target: &Target, window: &Window) -> Result<()> {
    let info = cluster_info(target)?;
    let engine = Engine::connect(config)?;
    let query = query_params(window)?;
    match kind {
        LogKind::Flows => {
            let params = FlowLogParams {
                query,
                ..Default::default()
            };
            run::<FlowLog>(config, engine, &info, &params, window).await
        }
        LogKind::Dns => {
            let params = DnsLogParams {
                query,
                ..Default::default()
            };
            run::<DnsLog>(config, engine, &info, &params, window).await
        }
    }
}

async fn run<T: LogDocument>(
    config: &EngineConfig,
    engine: Engine,
    info: &ClusterInfo,
    params: &T::Params,
    window: &Window,
) -> Result<()> {
    let backend: LogBackend<HttpDocumentStore, T> = LogBackend::new(
        engine.store,
        config.index_for(T::DATA_TYPE),
        engine.settings,
        engine.initializer,
    );
    let cancel = interrupt_token();
    if window.all {
        let docs = backend.list_all(info, params, &cancel).await?;
        return emit(&docs, None, &window.format);
    }
    let page: List<T> = backend.list(info, params, &cancel).await?;
    let next = page
        .after_key
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    emit(&page.items, next.as_deref(), &window.format)
}

fn emit<T: Serialize>(docs: &[T], next: Option<&str>, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(docs)?),
        "text" => {
            for doc in docs {
                println!("{}", serde_json::to_string(doc)?);
            }
        }
        other => bail!("unknown format {other:?}; expected text or json"),
    }
    if let Some(next) = next {
        eprintln!("next: --after-key '{next}'");
    }
    Ok(())
}
