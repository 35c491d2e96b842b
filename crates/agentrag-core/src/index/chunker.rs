//! Document chunking for embedding

use super::Document;
use sha2::{Digest, Sha256};

/// Default chunking configuration, in characters
pub const CHUNK_SIZE_CHARS: usize = 1000;
pub const CHUNK_OVERLAP_CHARS: usize = 150;

/// A contiguous slice of one document's text, the unit of embedding and retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Source document id (file name)
    pub doc_id: String,
    /// Position of this chunk within its document
    pub seq: u32,
    /// Byte offset where the chunk starts
    pub start: usize,
    /// Byte offset one past the chunk end
    pub end: usize,
    /// Zero-based line of the first character
    pub start_line: usize,
    /// Zero-based line of the last character
    pub end_line: usize,
    pub text: String,
    /// SHA-256 of `text`, used to reuse embeddings across rebuilds
    pub hash: String,
}

/// Hash content using SHA-256
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Raw character window produced by [`chunk_by_chars`]
#[derive(Debug, Clone)]
pub struct TextSpan {
    pub text: String,
    pub position: usize,
}

/// Find a valid char boundary at or before the given byte index
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Find a valid char boundary at or after the given byte index
fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Character-based chunking with overlap, preferring natural break points
pub fn chunk_by_chars(content: &str, chunk_size: usize, overlap: usize) -> Vec<TextSpan> {
    if content.len() <= chunk_size {
        return vec![TextSpan {
            text: content.to_string(),
            position: 0,
        }];
    }

    let mut spans = Vec::new();
    let mut start = 0;

    while start < content.len() {
        let raw_end = (start + chunk_size).min(content.len());
        let end = floor_char_boundary(content, raw_end);
        let mut chunk_end = end;

        // Find natural break point in last 30%
        if end < content.len() {
            let search_start_raw = start + (chunk_size * 70 / 100);
            let search_start = ceil_char_boundary(content, search_start_raw);

            if search_start < end {
                let search_region = &content[search_start..end];

                if let Some(pos) = search_region.rfind("\n\n") {
                    chunk_end = search_start + pos + 2;
                } else if let Some(pos) = search_region.rfind(". ") {
                    chunk_end = search_start + pos + 2;
                } else if let Some(pos) = search_region.rfind('\n') {
                    chunk_end = search_start + pos + 1;
                } else if let Some(pos) = search_region.rfind(' ') {
                    chunk_end = search_start + pos + 1;
                }
            }
        }

        chunk_end = floor_char_boundary(content, chunk_end);
        if chunk_end <= start {
            // A single char wider than chunk_size; take it whole
            chunk_end = ceil_char_boundary(content, start + 1);
        }

        spans.push(TextSpan {
            text: content[start..chunk_end].to_string(),
            position: start,
        });

        if chunk_end >= content.len() {
            break;
        }

        let new_start = ceil_char_boundary(content, chunk_end.saturating_sub(overlap));
        start = if new_start > start { new_start } else { chunk_end };
    }

    spans
}

/// Split a document into chunks carrying offsets and line ranges.
///
/// Whitespace-only documents produce no chunks.
pub fn chunk_document(doc: &Document, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    if doc.text.trim().is_empty() {
        return Vec::new();
    }

    chunk_by_chars(&doc.text, chunk_size, overlap)
        .into_iter()
        .filter(|span| !span.text.trim().is_empty())
        .enumerate()
        .map(|(seq, span)| {
            let start_line = doc.text[..span.position].matches('\n').count();
            let trailing = span.text.trim_end_matches('\n');
            let end_line = start_line + trailing.matches('\n').count();
            Chunk {
                doc_id: doc.id.clone(),
                seq: seq as u32,
                start: span.position,
                end: span.position + span.text.len(),
                start_line,
                end_line,
                hash: hash_content(&span.text),
                text: span.text,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_small_content() {
        let content = "Small content.";
        let chunks = chunk_by_chars(content, 100, 20);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, content);
    }

    #[test]
    fn test_chunk_preserves_paragraphs() {
        let content = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_by_chars(content, 30, 5);
        assert!(chunks.len() >= 2);
    }

    #[test]
    fn test_chunk_handles_unicode() {
        let content = "Hello 世界! This is a test with emoji 🎉 and special chars ─ here.";
        let chunks = chunk_by_chars(content, 20, 5);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(!chunk.text.is_empty());
        }
    }

    #[test]
    fn test_large_overlap_still_terminates() {
        let content = "word ".repeat(200);
        let chunks = chunk_by_chars(&content, 50, 45);
        assert!(chunks.len() > 1);
        assert!(chunks.windows(2).all(|w| w[1].position > w[0].position));
    }

    #[test]
    fn test_floor_char_boundary() {
        let s = "Hello 世界";
        assert_eq!(floor_char_boundary(s, 6), 6);
        assert_eq!(floor_char_boundary(s, 7), 6);
        assert_eq!(floor_char_boundary(s, 8), 6);
        assert_eq!(floor_char_boundary(s, 9), 9);
    }

    #[test]
    fn test_chunk_document_offsets_and_lines() {
        let text = (0..40)
            .map(|i| format!("line number {i} of the report"))
            .collect::<Vec<_>>()
            .join("\n");
        let doc = Document::new("report.txt", text.clone());
        let chunks = chunk_document(&doc, 200, 30);

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.seq as usize, i);
            assert_eq!(chunk.doc_id, "report.txt");
            assert_eq!(&text[chunk.start..chunk.end], chunk.text);
            assert!(chunk.end_line >= chunk.start_line);
            assert_eq!(chunk.hash, hash_content(&chunk.text));
        }
        assert_eq!(chunks[0].start_line, 0);
    }

    #[test]
    fn test_chunk_document_blank() {
        let doc = Document::new("empty.txt", "   \n\n ");
        assert!(chunk_document(&doc, 100, 10).is_empty());
    }
}
