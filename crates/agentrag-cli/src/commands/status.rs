//! Status command

use crate::app::OutputFormat;
use agentrag_core::{AgentRagError, Config, EmbeddingProviderKind, VectorIndex};
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct StatusReport {
    index_path: PathBuf,
    index_built: bool,
    documents: usize,
    chunks: usize,
    dimensions: usize,
    embedding_model: Option<String>,
    documents_dir: PathBuf,
    llm_url: String,
    chat_model: String,
    embedding_provider: EmbeddingProviderKind,
}

/// Report on the persisted index without building it
pub async fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let index = match VectorIndex::load(&config.index.path, None) {
        Ok(index) => Some(index),
        Err(AgentRagError::IndexUnavailable(reason)) => {
            tracing::info!("No usable index: {}", reason);
            None
        }
        Err(e) => return Err(e.into()),
    };

    let report = StatusReport {
        index_path: config.index.path.clone(),
        index_built: index.is_some(),
        documents: index.as_ref().map_or(0, |i| i.document_count()),
        chunks: index.as_ref().map_or(0, |i| i.len()),
        dimensions: index.as_ref().map_or(0, |i| i.dimensions()),
        embedding_model: index.as_ref().map(|i| i.model().to_string()),
        documents_dir: config.documents.dir.clone(),
        llm_url: config.llm_service.url.clone(),
        chat_model: config.llm_service.model.clone(),
        embedding_provider: config.embedding.provider,
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!("Index:           {}", report.index_path.display());
            if report.index_built {
                println!("  Documents:     {}", report.documents);
                println!("  Chunks:        {}", report.chunks);
                println!("  Dimensions:    {}", report.dimensions);
                println!(
                    "  Embedded with: {}",
                    report.embedding_model.as_deref().unwrap_or("-")
                );
            } else {
                println!("  No index built yet (run `agentrag index`)");
            }
            println!();
            println!("Documents dir:   {}", report.documents_dir.display());
            println!("LLM service:     {}", report.llm_url);
            println!("  Chat model:    {}", report.chat_model);
            println!("  Embeddings:    {:?}", report.embedding_provider);
        }
    }
    Ok(())
}
