//! Retrieval planning
//!
//! Ranks files by aggregating chunk-level similarity. No LLM call is made
//! here: the result depends only on the index and the embedder.

use crate::agent::{FileScore, QueryAnalysis};
use crate::error::{AgentRagError, Result};
use crate::llm::Embedder;
use crate::vector::{SearchHit, VectorIndex};
use std::collections::HashMap;

/// Default number of chunks fetched per selected file
pub const DEFAULT_OVERSAMPLE: usize = 4;

/// Selects the files most relevant to a query
pub struct RetrievalPlanner {
    top_n: usize,
    oversample: usize,
}

impl RetrievalPlanner {
    pub fn new(top_n: usize, oversample: usize) -> Result<Self> {
        if top_n == 0 {
            return Err(AgentRagError::InvalidArgument(
                "top_n must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            top_n,
            oversample: oversample.max(1),
        })
    }

    /// Up to `top_n` files ranked by summed chunk similarity.
    ///
    /// Fetches `top_n * oversample` chunks so that a file with several good
    /// chunks can outrank one with a single best chunk. Returns fewer files
    /// when fewer have matching chunks, and none for an empty index.
    pub async fn plan(
        &self,
        index: &VectorIndex,
        embedder: &dyn Embedder,
        query: &str,
        analysis: &QueryAnalysis,
    ) -> Result<Vec<FileScore>> {
        if index.is_empty() {
            return Ok(Vec::new());
        }

        let search_text = analysis.search_text(query);
        let vector = embedder.embed(&search_text).await?;
        let hits = index.query(&vector, self.top_n * self.oversample)?;
        let files = aggregate(&hits, self.top_n);

        tracing::info!(
            "Planned retrieval over {} files from {} chunks",
            files.len(),
            hits.len()
        );
        for f in &files {
            tracing::debug!("  {}: {:.4}", f.file, f.score);
        }
        Ok(files)
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn oversample(&self) -> usize {
        self.oversample
    }
}

/// Sum chunk scores per file and keep the best `top_n`.
///
/// `hits` must be in rank order. Files with equal totals keep the order of
/// their best-ranked chunk, so the result is a pure function of `hits`.
pub fn aggregate(hits: &[SearchHit], top_n: usize) -> Vec<FileScore> {
    // file -> (summed score, rank of first chunk)
    let mut scores: HashMap<&str, (f32, usize)> = HashMap::new();
    for (rank, hit) in hits.iter().enumerate() {
        let entry = scores.entry(hit.chunk.doc_id.as_str()).or_insert((0.0, rank));
        entry.0 += hit.score;
    }

    let mut ranked: Vec<(&str, f32, usize)> = scores
        .into_iter()
        .map(|(file, (score, first))| (file, score, first))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(top_n)
        .map(|(file, score, _)| FileScore {
            file: file.to_string(),
            score,
        })
        .collect()
}
