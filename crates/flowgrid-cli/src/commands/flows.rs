use anyhow::{Result, bail};

use flowgrid_backend::FlowBackend;
use flowgrid_core::{DataType, EngineConfig, L3Flow, L3FlowParams};

use super::{Engine, cluster_info, interrupt_token, query_params};
use crate::{Target, Window};

pub async fn list(config: &EngineConfig, target: &Target, window: &Window) -> Result<()> {
    let info = cluster_info(target)?;
    let engine = Engine::connect(config)?;
    let backend = FlowBackend::new(engine.store, config.index_for(DataType::FlowLogs), engine.settings);
    let params = L3FlowParams {
        query: query_params(window)?,
        ..Default::default()
    };
    let cancel = interrupt_token();

    if window.all {
        let flows = backend.list_all(&info, &params, &cancel).await?;
        match window.format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&flows)?),
            "text" => flows.iter().for_each(|f| println!("{}", summary(f))),
            other => bail!("unknown format {other:?}; expected text or json"),
        }
        return Ok(());
    }

    let page = backend.list(&info, &params, &cancel).await?;
    match window.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&page)?),
        "text" => {
            page.items.iter().for_each(|f| println!("{}", summary(f)));
            if let Some(next) = &page.after_key {
                println!("next: --after-key '{}'", serde_json::to_string(next)?);
            }
        }
        other => bail!("unknown format {other:?}; expected text or json"),
    }
    Ok(())
}

fn summary(flow: &L3Flow) -> String {
    let k = &flow.key;
    let port = k
        .destination
        .port
        .map(|p| format!(":{p}"))
        .unwrap_or_default();
    let logs = flow.log_stats.as_ref().map(|s| s.flow_log_count).unwrap_or(0);
    let mut out = format!(
        "{}/{} -> {}/{}{port} {} {} {} logs={logs}",
        k.source.namespace,
        k.source.aggregated_name,
        k.destination.namespace,
        k.destination.aggregated_name,
        k.protocol,
        k.action,
        k.reporter,
    );
    for hit in &flow.policies {
        out.push_str(&format!("\n    policy {hit} x{}", hit.count));
    }
    out
}
