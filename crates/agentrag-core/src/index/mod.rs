//! Ingestion pipeline
//!
//! Document sources, file scanning, and chunking.

mod chunker;
mod scanner;
mod source;

pub use chunker::*;
pub use scanner::*;
pub use source::*;

/// Chunk every document in order, producing the index input sequence
pub fn chunk_documents(docs: &[Document], chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    docs.iter()
        .flat_map(|doc| chunk_document(doc, chunk_size, overlap))
        .collect()
}
