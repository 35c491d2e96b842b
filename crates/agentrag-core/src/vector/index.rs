//! In-memory exact nearest-neighbor index

use super::cosine_similarity;
use crate::config::Config;
use crate::error::{AgentRagError, Result};
use crate::index::{Chunk, Document};
use crate::llm::Embedder;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// A stored chunk and its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// One query result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Insertion position of the entry, the tie-breaker for equal scores
    pub position: usize,
    pub chunk: Chunk,
    pub score: f32,
}

/// Build-time tuning
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Texts per embedding request
    pub batch_size: usize,
    /// Embedding requests in flight
    pub max_concurrent: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for BuildOptions {
    fn from(config: &Config) -> Self {
        Self {
            chunk_size: config.retrieval.chunk_size,
            chunk_overlap: config.retrieval.chunk_overlap,
            batch_size: config.embedding.batch_size,
            max_concurrent: config.embedding.max_concurrent,
        }
    }
}

/// Embedding statistics for one build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub documents: usize,
    pub chunks: usize,
    pub reused: usize,
    pub computed: usize,
}

/// Immutable vector index over document chunks.
///
/// Entries keep their insertion order; `doc_chunks` maps each document id to
/// the positions of its entries.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimensions: usize,
    model: String,
    entries: Vec<IndexEntry>,
    doc_chunks: BTreeMap<String, Vec<usize>>,
    documents: BTreeMap<String, String>,
}

impl VectorIndex {
    /// An index with no documents
    pub fn empty(dimensions: usize, model: impl Into<String>) -> Self {
        Self {
            dimensions,
            model: model.into(),
            entries: Vec::new(),
            doc_chunks: BTreeMap::new(),
            documents: BTreeMap::new(),
        }
    }

    /// Assemble an index from already-embedded entries, rebuilding the
    /// reverse mapping. Vectors must all have `dimensions` components.
    pub fn from_parts(
        dimensions: usize,
        model: impl Into<String>,
        documents: BTreeMap<String, String>,
        entries: Vec<IndexEntry>,
    ) -> Result<Self> {
        let mut doc_chunks: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (position, entry) in entries.iter().enumerate() {
            if entry.vector.len() != dimensions {
                return Err(AgentRagError::SchemaMismatch {
                    expected: dimensions,
                    found: entry.vector.len(),
                });
            }
            doc_chunks
                .entry(entry.chunk.doc_id.clone())
                .or_default()
                .push(position);
        }

        Ok(Self {
            dimensions,
            model: model.into(),
            entries,
            doc_chunks,
            documents,
        })
    }

    /// Embed and index `chunks`.
    ///
    /// Chunks whose content hash already has a vector in `reuse` (same model
    /// and dimensions) are not re-embedded. Missing embeddings are computed in
    /// concurrent batches and re-assembled in input order, so the resulting
    /// index does not depend on completion order.
    pub async fn build(
        documents: &[Document],
        chunks: Vec<Chunk>,
        embedder: &dyn Embedder,
        reuse: Option<&VectorIndex>,
        options: &BuildOptions,
    ) -> Result<(Self, BuildStats)> {
        let dimensions = embedder.dimensions();
        let model = embedder.model_name().to_string();

        let cached: HashMap<&str, &[f32]> = match reuse {
            Some(prev) if prev.dimensions == dimensions && prev.model == model => prev
                .entries
                .iter()
                .map(|e| (e.chunk.hash.as_str(), e.vector.as_slice()))
                .collect(),
            _ => HashMap::new(),
        };

        let mut vectors: Vec<Option<Vec<f32>>> = chunks
            .iter()
            .map(|c| cached.get(c.hash.as_str()).map(|v| v.to_vec()))
            .collect();

        let missing: Vec<usize> = vectors
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_none())
            .map(|(i, _)| i)
            .collect();

        let stats = BuildStats {
            documents: documents.len(),
            chunks: chunks.len(),
            reused: chunks.len() - missing.len(),
            computed: missing.len(),
        };

        if !missing.is_empty() {
            let batch_size = options.batch_size.max(1);
            let concurrent = options.max_concurrent.max(1);
            let texts: Vec<String> = missing.iter().map(|&i| chunks[i].text.clone()).collect();
            let batches: Vec<&[String]> = texts.chunks(batch_size).collect();
            let total_batches = batches.len();

            tracing::info!(
                "Embedding {} chunks in {} batches ({} concurrent, {} reused)",
                texts.len(),
                total_batches,
                concurrent,
                stats.reused
            );

            let mut results: Vec<(usize, Result<Vec<Vec<f32>>>)> = stream::iter(batches)
                .enumerate()
                .map(|(idx, batch)| async move {
                    tracing::debug!("Processing batch {}/{}", idx + 1, total_batches);
                    (idx, embedder.embed_batch(batch).await)
                })
                .buffer_unordered(concurrent)
                .collect()
                .await;

            results.sort_by_key(|(idx, _)| *idx);

            let mut computed = Vec::with_capacity(texts.len());
            for (_, result) in results {
                computed.extend(result?);
            }

            if computed.len() != missing.len() {
                return Err(AgentRagError::ModelUnavailable(format!(
                    "Embedder returned {} vectors for {} chunks",
                    computed.len(),
                    missing.len()
                )));
            }

            for (slot, vector) in missing.into_iter().zip(computed) {
                vectors[slot] = Some(vector);
            }
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry {
                chunk,
                vector: vector.unwrap_or_default(),
            })
            .collect();

        let documents = documents
            .iter()
            .map(|d| (d.id.clone(), d.text.clone()))
            .collect();

        let index = Self::from_parts(dimensions, model, documents, entries)?;
        tracing::info!(
            "Built vector index: {} documents, {} chunks ({} dims)",
            index.document_count(),
            index.len(),
            dimensions
        );
        Ok((index, stats))
    }

    /// Return the `k` entries most similar to `vector`, by non-increasing
    /// cosine similarity, ties broken by insertion order.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.rank(vector, k, None)
    }

    /// Like [`query`](Self::query) but only over chunks of the given files.
    /// An empty file list searches the whole index.
    pub fn query_filtered(
        &self,
        vector: &[f32],
        k: usize,
        files: &[String],
    ) -> Result<Vec<SearchHit>> {
        if files.is_empty() {
            return self.rank(vector, k, None);
        }
        let mut positions: Vec<usize> = files
            .iter()
            .filter_map(|f| self.doc_chunks.get(f))
            .flatten()
            .copied()
            .collect();
        positions.sort_unstable();
        positions.dedup();
        self.rank(vector, k, Some(&positions))
    }

    fn rank(&self, vector: &[f32], k: usize, positions: Option<&[usize]>) -> Result<Vec<SearchHit>> {
        if k < 1 {
            return Err(AgentRagError::InvalidArgument(
                "k must be at least 1".to_string(),
            ));
        }
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if vector.len() != self.dimensions {
            return Err(AgentRagError::InvalidArgument(format!(
                "query vector has {} dimensions, index has {}",
                vector.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = match positions {
            Some(ps) => ps
                .iter()
                .map(|&p| (p, cosine_similarity(vector, &self.entries[p].vector)))
                .collect(),
            None => self
                .entries
                .iter()
                .enumerate()
                .map(|(p, e)| (p, cosine_similarity(vector, &e.vector)))
                .collect(),
        };

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| SearchHit {
                position,
                chunk: self.entries[position].chunk.clone(),
                score,
            })
            .collect())
    }

    /// Full text of a document, if indexed
    pub fn document_text(&self, id: &str) -> Option<&str> {
        self.documents.get(id).map(String::as_str)
    }

    pub(crate) fn documents(&self) -> &BTreeMap<String, String> {
        &self.documents
    }

    /// Entry positions belonging to a document
    pub fn chunks_for(&self, doc_id: &str) -> &[usize] {
        self.doc_chunks.get(doc_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}
