//! SQLite persistence for [`VectorIndex`]

use super::{IndexEntry, VectorIndex};
use crate::error::{AgentRagError, Result};
use crate::index::Chunk;
use rusqlite::{params, Connection, OpenFlags};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Version of the on-disk layout
pub const SCHEMA_VERSION: i32 = 1;

const CREATE_TABLES: &str = r#"
-- Index-wide metadata
CREATE TABLE index_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Full document text, for read_section
CREATE TABLE documents (
    id TEXT PRIMARY KEY,
    body TEXT NOT NULL
);

-- Chunk entries in insertion order
CREATE TABLE chunks (
    position INTEGER PRIMARY KEY,
    doc_id TEXT NOT NULL,
    seq INTEGER NOT NULL,
    start_offset INTEGER NOT NULL,
    end_offset INTEGER NOT NULL,
    start_line INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    text TEXT NOT NULL,
    hash TEXT NOT NULL,
    embedding BLOB NOT NULL
);

CREATE INDEX idx_chunks_doc ON chunks(doc_id);
"#;

/// Serialize an embedding as little-endian f32 bytes
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize little-endian f32 bytes. Trailing bytes that do not form a
/// whole f32 are ignored; callers check the length first.
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn unavailable(path: &Path, reason: impl std::fmt::Display) -> AgentRagError {
    AgentRagError::IndexUnavailable(format!("{}: {}", path.display(), reason))
}

impl VectorIndex {
    /// Write the index to `path`.
    ///
    /// The file is written next to `path` and renamed over it, so readers see
    /// either the previous index or the new one.
    pub fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = temp_path(path);
        if tmp.exists() {
            std::fs::remove_file(&tmp)?;
        }

        if let Err(e) = self.write_db(&tmp) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }

        std::fs::rename(&tmp, path)?;
        tracing::info!(
            "Persisted index ({} chunks) to {}",
            self.len(),
            path.display()
        );
        Ok(())
    }

    fn write_db(&self, path: &Path) -> Result<()> {
        let mut conn = Connection::open(path)?;
        conn.execute_batch(CREATE_TABLES)?;

        let tx = conn.transaction()?;
        {
            let mut meta = tx.prepare("INSERT INTO index_meta (key, value) VALUES (?1, ?2)")?;
            meta.execute(params!["schema_version", SCHEMA_VERSION.to_string()])?;
            meta.execute(params!["dimensions", self.dimensions().to_string()])?;
            meta.execute(params!["model", self.model()])?;
            meta.execute(params!["built_at", chrono::Utc::now().to_rfc3339()])?;

            let mut docs = tx.prepare("INSERT INTO documents (id, body) VALUES (?1, ?2)")?;
            for (id, body) in self.documents() {
                docs.execute(params![id, body])?;
            }

            let mut chunks = tx.prepare(
                "INSERT INTO chunks (position, doc_id, seq, start_offset, end_offset,
                                     start_line, end_line, text, hash, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for (position, entry) in self.entries().iter().enumerate() {
                let c = &entry.chunk;
                chunks.execute(params![
                    position as i64,
                    c.doc_id,
                    c.seq,
                    c.start as i64,
                    c.end as i64,
                    c.start_line as i64,
                    c.end_line as i64,
                    c.text,
                    c.hash,
                    embedding_to_bytes(&entry.vector),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Load an index written by [`persist`](Self::persist).
    ///
    /// Anything that prevents reading a complete index is `IndexUnavailable`.
    /// A readable index whose dimension differs from `expected_dims` is
    /// `SchemaMismatch`.
    pub fn load(path: &Path, expected_dims: Option<usize>) -> Result<Self> {
        if !path.exists() {
            return Err(unavailable(path, "no index file"));
        }

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| unavailable(path, e))?;

        let meta = read_meta(&conn).map_err(|e| unavailable(path, e))?;

        let version: i32 = meta
            .get("schema_version")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| unavailable(path, "missing schema_version"))?;
        if version != SCHEMA_VERSION {
            return Err(unavailable(
                path,
                format!("layout version {version}, expected {SCHEMA_VERSION}"),
            ));
        }

        let dimensions: usize = meta
            .get("dimensions")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| unavailable(path, "missing dimensions"))?;
        let model = meta.get("model").cloned().unwrap_or_default();

        if let Some(expected) = expected_dims {
            if expected != dimensions {
                return Err(AgentRagError::SchemaMismatch {
                    expected,
                    found: dimensions,
                });
            }
        }

        let documents = read_documents(&conn).map_err(|e| unavailable(path, e))?;
        let rows = read_chunks(&conn).map_err(|e| unavailable(path, e))?;

        let mut entries = Vec::with_capacity(rows.len());
        for (expected_position, (position, chunk, blob)) in rows.into_iter().enumerate() {
            if position != expected_position as i64 {
                return Err(unavailable(path, "chunk positions are not contiguous"));
            }
            if blob.len() != dimensions * 4 {
                return Err(unavailable(
                    path,
                    format!(
                        "embedding at position {position} has {} bytes, expected {}",
                        blob.len(),
                        dimensions * 4
                    ),
                ));
            }
            entries.push(IndexEntry {
                chunk,
                vector: bytes_to_embedding(&blob),
            });
        }

        let index = VectorIndex::from_parts(dimensions, model, documents, entries)?;
        tracing::info!(
            "Loaded index from {} ({} documents, {} chunks)",
            path.display(),
            index.document_count(),
            index.len()
        );
        Ok(index)
    }
}

fn read_meta(conn: &Connection) -> rusqlite::Result<BTreeMap<String, String>> {
    let mut stmt = conn.prepare("SELECT key, value FROM index_meta")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

fn read_documents(conn: &Connection) -> rusqlite::Result<BTreeMap<String, String>> {
    let mut stmt = conn.prepare("SELECT id, body FROM documents")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

fn read_chunks(conn: &Connection) -> rusqlite::Result<Vec<(i64, Chunk, Vec<u8>)>> {
    let mut stmt = conn.prepare(
        "SELECT position, doc_id, seq, start_offset, end_offset, start_line, end_line,
                text, hash, embedding
         FROM chunks ORDER BY position",
    )?;
    let rows = stmt.query_map([], |row| {
        let chunk = Chunk {
            doc_id: row.get(1)?,
            seq: row.get(2)?,
            start: row.get::<_, i64>(3)? as usize,
            end: row.get::<_, i64>(4)? as usize,
            start_line: row.get::<_, i64>(5)? as usize,
            end_line: row.get::<_, i64>(6)? as usize,
            text: row.get(7)?,
            hash: row.get(8)?,
        };
        Ok((row.get(0)?, chunk, row.get(9)?))
    })?;
    rows.collect()
}
