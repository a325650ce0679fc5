use anyhow::Result;

use flowgrid_core::{ClusterInfo, DataType, EngineConfig};

use super::cluster_info;
use crate::Target;

pub fn print(config: &EngineConfig, target: &Target) -> Result<()> {
    let info = cluster_info(target)?;
    for line in describe(config, &info) {
        println!("{line}");
    }
    Ok(())
}

fn describe(config: &EngineConfig, info: &ClusterInfo) -> Vec<String> {
    DataType::ALL
        .into_iter()
        .map(|dt| {
            let index = config.index_for(dt);
            format!(
                "{:<28} read={} write={} template={} bootstrap={}",
                dt.as_str(),
                index.read_pattern(info),
                index.write_alias(info),
                index.template_name(info),
                index.bootstrap_name(info),
            )
        })
        .collect()
}
