//! Top-level entry point wiring configuration to the index and workflow

use crate::agent::{Answer, Workflow};
use crate::config::{Config, EmbeddingProviderKind};
use crate::error::Result;
use crate::index::{DirectorySource, DocumentSource};
use crate::llm::{
    Embedder, HashEmbedder, HttpEmbedder, LanguageModel, RetryingEmbedder, RetryingModel,
    VLLMClient,
};
use crate::vector::{BuildOptions, BuildStats, IndexHandle, VectorIndex};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Summary of the loaded index
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub path: Option<PathBuf>,
    pub documents: usize,
    pub chunks: usize,
    pub dimensions: usize,
    pub embedding_model: String,
    pub chat_model: String,
}

/// Question answering over an indexed document collection
pub struct RagEngine {
    config: Config,
    model: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
    source: Arc<dyn DocumentSource>,
    handle: IndexHandle,
    workflow: Workflow,
}

impl RagEngine {
    /// Build the model, embedder and document source described by `config`
    /// and open the persisted index, rebuilding it if it is missing,
    /// unreadable, or `config.index.rebuild` is set.
    pub async fn open(config: Config) -> Result<Self> {
        let model: Arc<dyn LanguageModel> = Arc::new(RetryingModel::new(
            VLLMClient::new(config.llm_service.clone())?,
            &config.retry,
        ));
        let embedder = embedder_from_config(&config)?;
        let source: Arc<dyn DocumentSource> = Arc::new(
            DirectorySource::new(config.documents.dir.clone())
                .with_pattern(config.documents.pattern.clone()),
        );
        Self::with_components(config, model, embedder, source).await
    }

    /// Like [`open`](Self::open) with caller-supplied components
    pub async fn with_components(
        config: Config,
        model: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        source: Arc<dyn DocumentSource>,
    ) -> Result<Self> {
        config.validate()?;
        let handle = IndexHandle::open_or_rebuild(
            &config.index.path,
            source.as_ref(),
            embedder.as_ref(),
            &BuildOptions::from(&config),
            config.index.rebuild,
        )
        .await?;
        let workflow = Workflow::new(Arc::clone(&model), Arc::clone(&embedder), &config)?;

        Ok(Self {
            config,
            model,
            embedder,
            source,
            handle,
            workflow,
        })
    }

    /// Answer a question against the current index
    pub async fn answer(&self, query: &str) -> Result<Answer> {
        let index = self.handle.snapshot();
        self.workflow.answer(&index, query).await
    }

    /// Re-read the document source and rebuild, reusing unchanged embeddings
    pub async fn reindex(&self) -> Result<BuildStats> {
        self.handle
            .rebuild(
                self.source.as_ref(),
                self.embedder.as_ref(),
                &BuildOptions::from(&self.config),
            )
            .await
    }

    pub fn status(&self) -> IndexStatus {
        let index = self.handle.snapshot();
        IndexStatus {
            path: self.handle.path().map(|p| p.to_path_buf()),
            documents: index.document_count(),
            chunks: index.len(),
            dimensions: index.dimensions(),
            embedding_model: index.model().to_string(),
            chat_model: self.model.model_name().to_string(),
        }
    }

    /// Current index snapshot
    pub fn index(&self) -> Arc<VectorIndex> {
        self.handle.snapshot()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Embedder selected by `embedding.provider`. Service-backed embedders
/// retry with the same policy as the chat model.
pub fn embedder_from_config(config: &Config) -> Result<Arc<dyn Embedder>> {
    Ok(match config.embedding.provider {
        EmbeddingProviderKind::Hash => {
            Arc::new(HashEmbedder::new(config.embedding.hash_dimensions))
        }
        EmbeddingProviderKind::Http => Arc::new(RetryingEmbedder::new(
            HttpEmbedder::from_config(config.llm_service.clone())?,
            &config.retry,
        )),
    })
}
