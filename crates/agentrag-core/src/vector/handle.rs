//! Shared, swappable index

use super::{BuildOptions, BuildStats, VectorIndex};
use crate::error::{AgentRagError, Result};
use crate::index::{chunk_documents, DocumentSource};
use crate::llm::Embedder;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// Holds the current index behind an `Arc`.
///
/// Queries take a snapshot and keep using it even if a rebuild swaps in a new
/// index meanwhile. Rebuilds are serialized.
pub struct IndexHandle {
    current: RwLock<Arc<VectorIndex>>,
    path: Option<PathBuf>,
    rebuild_lock: Mutex<()>,
}

impl IndexHandle {
    pub fn new(index: VectorIndex, path: Option<PathBuf>) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
            path,
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Load the index at `path`, rebuilding from `source` when it is missing
    /// or unreadable, or when `force` is set.
    ///
    /// A stored index built with a different embedding dimension is an error:
    /// the caller decides whether to rebuild with `force`.
    pub async fn open_or_rebuild(
        path: &Path,
        source: &dyn DocumentSource,
        embedder: &dyn Embedder,
        options: &BuildOptions,
        force: bool,
    ) -> Result<Self> {
        if !force {
            match VectorIndex::load(path, Some(embedder.dimensions())) {
                Ok(index) => return Ok(Self::new(index, Some(path.to_path_buf()))),
                Err(AgentRagError::IndexUnavailable(reason)) => {
                    tracing::warn!("Index unavailable ({}), rebuilding", reason);
                }
                Err(e) => return Err(e),
            }
        }

        let handle = Self::new(
            VectorIndex::empty(embedder.dimensions(), embedder.model_name()),
            Some(path.to_path_buf()),
        );
        handle.rebuild(source, embedder, options).await?;
        Ok(handle)
    }

    /// Current index
    pub fn snapshot(&self) -> Arc<VectorIndex> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Rebuild from `source`, reusing embeddings of unchanged chunks.
    ///
    /// The new index is built and persisted before it replaces the current
    /// one. On failure neither the in-memory index nor the file changes.
    pub async fn rebuild(
        &self,
        source: &dyn DocumentSource,
        embedder: &dyn Embedder,
        options: &BuildOptions,
    ) -> Result<BuildStats> {
        let _guard = self.rebuild_lock.lock().await;

        let documents = source.documents().await?;
        tracing::info!(
            "Rebuilding index from {} ({} documents)",
            source.provider_type(),
            documents.len()
        );
        let chunks = chunk_documents(&documents, options.chunk_size, options.chunk_overlap);

        let previous = self.snapshot();
        let (index, stats) =
            VectorIndex::build(&documents, chunks, embedder, Some(&previous), options).await?;

        if let Some(path) = &self.path {
            index.persist(path)?;
        }

        let fresh = Arc::new(index);
        match self.current.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
        Ok(stats)
    }
}
