//! Tools available to the evidence-gathering loop

use crate::error::{AgentRagError, Result};
use crate::llm::Embedder;
use crate::vector::VectorIndex;
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_length() -> usize {
    50
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    /// Semantic search over chunks of the selected files
    Search {
        query: String,
        /// Result count; the tool box default when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        k: Option<usize>,
    },

    /// Literal lines `[start, start + length)` of a file, zero-based
    ReadSection {
        file: String,
        #[serde(default)]
        start: usize,
        #[serde(default = "default_length")]
        length: usize,
    },
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::Search { .. } => "search",
            ToolCall::ReadSection { .. } => "read_section",
        }
    }
}

impl fmt::Display for ToolCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolCall::Search { query, k: Some(k) } => write!(f, "search(query={query:?}, k={k})"),
            ToolCall::Search { query, k: None } => write!(f, "search(query={query:?})"),
            ToolCall::ReadSection {
                file,
                start,
                length,
            } => write!(f, "read_section(file={file:?}, start={start}, length={length})"),
        }
    }
}

/// Textual result of one tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolObservation {
    pub call: ToolCall,
    /// What the model sees
    pub text: String,
    /// Per-file excerpts backing `text`, in rank order
    pub excerpts: Vec<(String, String)>,
    /// The call failed with a recoverable error (unknown file, bad range)
    pub is_error: bool,
}

impl ToolObservation {
    fn error(call: ToolCall, err: &AgentRagError) -> Self {
        Self {
            call,
            text: format!("Error: {err}"),
            excerpts: Vec::new(),
            is_error: true,
        }
    }
}

/// Executes tool calls against one index snapshot
pub struct ToolBox<'a> {
    index: &'a VectorIndex,
    embedder: &'a dyn Embedder,
    files: Vec<String>,
    default_k: usize,
}

impl<'a> ToolBox<'a> {
    /// `files` restricts `search`; empty means the whole index
    pub fn new(index: &'a VectorIndex, embedder: &'a dyn Embedder, files: Vec<String>) -> Self {
        Self {
            index,
            embedder,
            files,
            default_k: 5,
        }
    }

    /// Result count for searches that do not specify one
    pub fn with_default_k(mut self, k: usize) -> Self {
        self.default_k = k;
        self
    }

    /// Run `call`. Caller mistakes (unknown file, empty range, k = 0) come
    /// back as error observations; only service failures are `Err`.
    pub async fn execute(&self, call: ToolCall) -> Result<ToolObservation> {
        let result = match &call {
            ToolCall::Search { query, k } => self.search(query, k.unwrap_or(self.default_k)).await,
            ToolCall::ReadSection {
                file,
                start,
                length,
            } => read_section(self.index, file, *start, *length)
                .map(|(text, excerpt)| (text, vec![(file.clone(), excerpt)])),
        };

        match result {
            Ok((text, excerpts)) => Ok(ToolObservation {
                call,
                text,
                excerpts,
                is_error: false,
            }),
            Err(e @ (AgentRagError::NotFound(_) | AgentRagError::InvalidArgument(_))) => {
                tracing::debug!("{} failed: {}", call, e);
                Ok(ToolObservation::error(call, &e))
            }
            Err(e) => Err(e),
        }
    }

    async fn search(&self, query: &str, k: usize) -> Result<(String, Vec<(String, String)>)> {
        if k == 0 {
            return Err(AgentRagError::InvalidArgument(
                "k must be at least 1".to_string(),
            ));
        }
        if self.index.is_empty() {
            return Ok(("No relevant information found.".to_string(), Vec::new()));
        }

        let vector = self.embedder.embed(query).await?;
        let hits = self.index.query_filtered(&vector, k, &self.files)?;
        if hits.is_empty() {
            return Ok(("No relevant information found.".to_string(), Vec::new()));
        }

        let mut formatted = Vec::with_capacity(hits.len());
        let mut excerpts: Vec<(String, String)> = Vec::new();
        for (i, hit) in hits.iter().enumerate() {
            let c = &hit.chunk;
            formatted.push(format!(
                "--- Result {} (from {}, lines {}-{}, score {:.3}) ---\n{}\n",
                i + 1,
                c.doc_id,
                c.start_line + 1,
                c.end_line + 1,
                hit.score,
                c.text
            ));
            match excerpts.iter_mut().find(|(file, _)| *file == c.doc_id) {
                Some((_, text)) => {
                    text.push('\n');
                    text.push_str(&c.text);
                }
                None => excerpts.push((c.doc_id.clone(), c.text.clone())),
            }
        }

        Ok((formatted.join("\n"), excerpts))
    }
}

/// Lines `[start, start + length)` of `file`.
///
/// Returns the rendered observation and the raw excerpt. `NotFound` when the
/// file is not indexed, `start` is past the last line, or `length` is zero.
pub fn read_section(
    index: &VectorIndex,
    file: &str,
    start: usize,
    length: usize,
) -> Result<(String, String)> {
    let text = index
        .document_text(file)
        .ok_or_else(|| AgentRagError::NotFound(format!("file '{file}' is not indexed")))?;

    let lines: Vec<&str> = text.lines().collect();
    if length == 0 {
        return Err(AgentRagError::NotFound(format!(
            "empty range requested from '{file}'"
        )));
    }
    if start >= lines.len() {
        return Err(AgentRagError::NotFound(format!(
            "start line {start} exceeds length of '{file}' ({} lines)",
            lines.len()
        )));
    }

    let end = start.saturating_add(length).min(lines.len());
    let excerpt = lines[start..end].join("\n");
    let rendered = format!("--- {file} (lines {} to {end}) ---\n{excerpt}", start + 1);
    Ok((rendered, excerpt))
}

/// Tool descriptions included in the gathering prompt
pub fn tool_descriptions() -> &'static str {
    r#"- search: semantic search over document chunks.
  {"tool": "search", "query": "<what to look for>", "k": <optional number of results>}
- read_section: read lines of a file, zero-based, to see surrounding context.
  {"tool": "read_section", "file": "<file id>", "start": <first line>, "length": <line count>}
- finish: stop when the evidence answers the question.
  {"tool": "finish", "summary": "<what the evidence shows, citing file ids>"}"#
}
