//! Document sources
//!
//! A [`DocumentSource`] enumerates `(file id, full text)` pairs for indexing.

use super::scanner::{find_documents, WalkOptions};
use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// An ingested text document. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File identifier (relative path)
    pub id: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Source provider trait - anything that can enumerate documents for indexing
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Provider type identifier (e.g., "directory", "static")
    fn provider_type(&self) -> &'static str;

    /// List all documents, ordered by id
    async fn documents(&self) -> Result<Vec<Document>>;
}

/// Reads text files from a directory tree
pub struct DirectorySource {
    root: PathBuf,
    options: WalkOptions,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            options: WalkOptions::default(),
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.options.pattern = pattern.into();
        self
    }
}

#[async_trait]
impl DocumentSource for DirectorySource {
    fn provider_type(&self) -> &'static str {
        "directory"
    }

    async fn documents(&self) -> Result<Vec<Document>> {
        if !self.root.exists() {
            tracing::warn!(
                "Document directory {} does not exist; treating as empty",
                self.root.display()
            );
            return Ok(Vec::new());
        }

        let mut docs = Vec::new();
        for file in find_documents(&self.root, &self.options)? {
            match tokio::fs::read_to_string(&file.path).await {
                Ok(text) => docs.push(Document::new(file.id, text)),
                // Non-UTF-8 files land here
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", file.path.display(), e);
                }
            }
        }

        tracing::info!("Loaded {} documents from {}", docs.len(), self.root.display());
        Ok(docs)
    }
}

/// A fixed, in-memory document collection
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    docs: Vec<Document>,
}

impl StaticSource {
    pub fn new(mut docs: Vec<Document>) -> Self {
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Self { docs }
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    fn provider_type(&self) -> &'static str {
        "static"
    }

    async fn documents(&self) -> Result<Vec<Document>> {
        Ok(self.docs.clone())
    }
}
