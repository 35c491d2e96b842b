//! Index command

use crate::app::{IndexArgs, OutputFormat};
use agentrag_core::vector::BuildStats;
use agentrag_core::{Config, RagEngine};
use anyhow::Result;

pub async fn run(args: IndexArgs, mut config: Config, format: OutputFormat) -> Result<()> {
    let path = config.index.path.clone();
    let fresh = args.force || !path.exists();
    config.index.rebuild = args.force;
    let engine = RagEngine::open(config).await?;

    // Opening already embedded everything when there was nothing to load
    let stats = if fresh {
        let status = engine.status();
        BuildStats {
            documents: status.documents,
            chunks: status.chunks,
            reused: 0,
            computed: status.chunks,
        }
    } else {
        engine.reindex().await?
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        _ => {
            println!(
                "Indexed {} documents ({} chunks) into {}",
                stats.documents,
                stats.chunks,
                path.display()
            );
            println!(
                "  Embedded:      {} new, {} reused",
                stats.computed, stats.reused
            );
        }
    }
    Ok(())
}
