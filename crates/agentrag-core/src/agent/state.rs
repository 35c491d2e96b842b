//! Workflow state carried between stages

use serde::{Deserialize, Serialize};

/// Structured reading of the user's question
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    #[serde(default)]
    pub information_needed: Vec<String>,
    #[serde(default)]
    pub time_periods: Vec<String>,
    #[serde(default)]
    pub metrics_requested: Vec<String>,
    #[serde(default)]
    pub inference_required: bool,
    #[serde(default)]
    pub search_strategy: String,
    /// Set when the model's analysis could not be parsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_fallback: Option<String>,
}

impl QueryAnalysis {
    /// Analysis used when the model reply is unusable: search for the
    /// question itself.
    pub fn fallback(query: &str) -> Self {
        Self {
            information_needed: vec![query.to_string()],
            search_strategy: "semantic search on the original query".to_string(),
            raw_fallback: Some(query.to_string()),
            ..Default::default()
        }
    }

    /// Text embedded to plan retrieval: the query plus the analysis terms
    pub fn search_text(&self, query: &str) -> String {
        let mut parts = vec![query.trim().to_string()];
        for term in self
            .information_needed
            .iter()
            .chain(&self.time_periods)
            .chain(&self.metrics_requested)
        {
            let term = term.trim();
            if !term.is_empty() && !parts.iter().any(|p| p == term) {
                parts.push(term.to_string());
            }
        }
        parts.join(" ")
    }
}

/// A file chosen for evidence gathering with its aggregated relevance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileScore {
    pub file: String,
    pub score: f32,
}

/// One piece of gathered evidence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// File the excerpt came from, if any
    pub source: Option<String>,
    pub excerpt: String,
    /// How it was obtained, e.g. `search(query="budget", k=5)`
    pub provenance: String,
}

/// State threaded through the workflow. Each stage takes it by value and
/// returns it with only its own fields changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    pub original_query: String,
    pub query_analysis: QueryAnalysis,
    pub selected_files: Vec<FileScore>,
    pub evidence: Vec<Evidence>,
    pub reasoning_trace: String,
    pub final_answer: String,
    /// Tool-loop iterations of the latest gather pass
    pub iteration_count: usize,
    /// Synthesize → GatherEvidence back-edges taken
    pub regather_count: usize,
}

impl GraphState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            original_query: query.into(),
            ..Default::default()
        }
    }

    /// Distinct evidence sources, in first-seen order
    pub fn cited_files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = Vec::new();
        for source in self.evidence.iter().filter_map(|e| e.source.as_deref()) {
            if !files.contains(&source) {
                files.push(source);
            }
        }
        files
    }
}

/// Result returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub final_answer: String,
    pub reasoning_trace: String,
    pub selected_files: Vec<FileScore>,
    pub evidence: Vec<Evidence>,
}

impl From<GraphState> for Answer {
    fn from(state: GraphState) -> Self {
        Self {
            final_answer: state.final_answer,
            reasoning_trace: state.reasoning_trace,
            selected_files: state.selected_files,
            evidence: state.evidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_parses_partial_json() {
        let analysis: QueryAnalysis =
            serde_json::from_str(r#"{"information_needed": ["budget"], "inference_required": true}"#)
                .unwrap();
        assert_eq!(analysis.information_needed, vec!["budget"]);
        assert!(analysis.inference_required);
        assert!(analysis.time_periods.is_empty());
        assert!(analysis.raw_fallback.is_none());
    }

    #[test]
    fn test_search_text_dedups_terms() {
        let analysis = QueryAnalysis {
            information_needed: vec!["budget".into(), " ".into()],
            time_periods: vec!["Q1".into()],
            metrics_requested: vec!["budget".into()],
            ..Default::default()
        };
        assert_eq!(analysis.search_text("How big was it?"), "How big was it? budget Q1");
    }

    #[test]
    fn test_fallback_searches_query() {
        let analysis = QueryAnalysis::fallback("what happened?");
        assert_eq!(analysis.search_text("what happened?"), "what happened?");
        assert_eq!(analysis.raw_fallback.as_deref(), Some("what happened?"));
    }

    #[test]
    fn test_cited_files_order() {
        let mut state = GraphState::new("q");
        for source in [Some("b.txt"), None, Some("a.txt"), Some("b.txt")] {
            state.evidence.push(Evidence {
                source: source.map(String::from),
                excerpt: String::new(),
                provenance: "search".into(),
            });
        }
        assert_eq!(state.cited_files(), vec!["b.txt", "a.txt"]);
    }
}
