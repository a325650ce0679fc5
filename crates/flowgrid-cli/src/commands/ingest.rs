use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use flowgrid_backend::{LogBackend, LogDocument};
use flowgrid_core::{BulkResponse, DnsLog, EngineConfig, FlowLog};
use flowgrid_store::HttpDocumentStore;

use super::{Engine, cluster_info, interrupt_token};
use crate::{LogKind, Target};

pub async fn ingest(config: &EngineConfig, kind: LogKind, target: &Target, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let response = match kind {
        LogKind::Flows => write::<FlowLog>(config, target, parse(&content)?).await?,
        LogKind::Dns => write::<DnsLog>(config, target, parse(&content)?).await?,
    };

    println!("✓ {} of {} documents written", response.succeeded, response.total);
    for e in response.errors.iter().flatten() {
        warn!(resource = %e.resource, kind = %e.kind, "{}", e.reason);
    }
    if response.failed > 0 {
        anyhow::bail!("{} documents failed", response.failed);
    }
    Ok(())
}

fn parse<T: LogDocument>(content: &str) -> Result<Vec<T>> {
    serde_json::from_str(content).context("expected a JSON array of documents")
}

async fn write<T: LogDocument>(config: &EngineConfig, target: &Target, docs: Vec<T>) -> Result<BulkResponse> {
    let info = cluster_info(target)?;
    let engine = Engine::connect(config)?;
    let backend: LogBackend<HttpDocumentStore, T> = LogBackend::new(
        engine.store,
        config.index_for(T::DATA_TYPE),
        engine.settings,
        engine.initializer,
    );
    Ok(backend.create(&info, docs, &interrupt_token()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_document_array() {
        let docs: Vec<DnsLog> = parse(r#"[{"qname": "example.com", "rcode": "NoError", "count": 2}]"#).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].qname, "example.com");
        assert_eq!(docs[0].count, 2);
    }

    #[test]
    fn rejects_a_single_object() {
        assert!(parse::<FlowLog>(r#"{"proto": "tcp"}"#).is_err());
    }
}
