//! Vector index
//!
//! Stores `(chunk, vector)` entries with a reverse document → chunks map,
//! answers exact top-k cosine queries, and persists to a SQLite file.

mod handle;
mod index;
mod store;

pub use handle::IndexHandle;
pub use index::{BuildOptions, BuildStats, IndexEntry, SearchHit, VectorIndex};
pub use store::{bytes_to_embedding, embedding_to_bytes, SCHEMA_VERSION};

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
