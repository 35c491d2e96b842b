//! Bounded ReAct loop for gathering evidence

use super::prompts::{correction_message, gather_messages, observation_message, tool_step_schema};
use super::state::{Evidence, GraphState};
use super::tools::{ToolBox, ToolCall, ToolObservation};
use crate::error::{AgentRagError, Result};
use crate::llm::{extract_json, ChatMessage, Embedder, LanguageModel};
use crate::vector::VectorIndex;
use serde_json::Value;
use std::sync::Arc;

/// Provenance of the summary the model gives when it stops
pub const FINAL_SUMMARY: &str = "final_summary";

/// A model turn, parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelResponse {
    ToolCall(ToolCall),
    Finish { summary: String },
    Unparsable { raw: String, reason: String },
}

impl ModelResponse {
    /// Parse a reply. Accepts `{"tool": "search", ...}`,
    /// `{"tool": "finish", "summary": ...}`, `{"finish": ...}` and a bare
    /// `done`; anything else is `Unparsable`.
    pub fn parse(raw: &str) -> Self {
        let unparsable = |reason: String| ModelResponse::Unparsable {
            raw: raw.to_string(),
            reason,
        };

        if raw.trim().eq_ignore_ascii_case("done") {
            return ModelResponse::Finish {
                summary: String::new(),
            };
        }

        let value: Value = match serde_json::from_str(extract_json(raw)) {
            Ok(v) => v,
            Err(e) => return unparsable(format!("invalid JSON: {e}")),
        };

        match value.get("tool").and_then(Value::as_str) {
            Some("finish") | Some("done") => ModelResponse::Finish {
                summary: value
                    .get("summary")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            Some(_) => match serde_json::from_value::<ToolCall>(value) {
                Ok(call) => ModelResponse::ToolCall(call),
                Err(e) => unparsable(format!("invalid tool call: {e}")),
            },
            None => match value.get("finish").and_then(Value::as_str) {
                Some(summary) => ModelResponse::Finish {
                    summary: summary.to_string(),
                },
                None => unparsable("missing \"tool\" field".to_string()),
            },
        }
    }
}

/// Truncate to at most `max` characters
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Drives the model through tool calls until it finishes or runs out of
/// iterations
pub struct EvidenceGatherer {
    model: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
    max_iterations: usize,
    observation_chars: usize,
    search_k: usize,
}

impl EvidenceGatherer {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        max_iterations: usize,
        observation_chars: usize,
    ) -> Self {
        Self {
            model,
            embedder,
            max_iterations,
            observation_chars,
            search_k: 5,
        }
    }

    /// Result count for `search` calls that omit `k`
    pub fn with_search_k(mut self, k: usize) -> Self {
        self.search_k = k;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Run one gathering pass, extending `state.evidence`.
    ///
    /// Every pass starts its own count, so `state.iteration_count` never
    /// exceeds `max_iterations`. Only a failing model or embedder aborts the
    /// pass; bad replies and bad tool arguments become evidence notes.
    pub async fn gather(&self, index: &VectorIndex, mut state: GraphState) -> Result<GraphState> {
        let files: Vec<String> = state.selected_files.iter().map(|f| f.file.clone()).collect();
        let tools = ToolBox::new(index, self.embedder.as_ref(), files).with_default_k(self.search_k);
        let schema = tool_step_schema();

        let mut messages = gather_messages(
            &state.original_query,
            &state.query_analysis,
            &state.selected_files,
            &state.evidence,
        );
        let mut iterations: usize = 0;
        let mut finished = false;

        while iterations < self.max_iterations {
            let (reply, response) = match self.model.generate(messages.clone(), Some(&schema)).await
            {
                Ok(reply) => {
                    tracing::debug!("Gather reply {}: {}", iterations + 1, reply);
                    let response = ModelResponse::parse(&reply);
                    (reply, response)
                }
                Err(AgentRagError::MalformedModelOutput(e)) => (
                    String::new(),
                    ModelResponse::Unparsable {
                        raw: String::new(),
                        reason: format!("unusable reply: {e}"),
                    },
                ),
                Err(e) => return Err(e),
            };

            match response {
                ModelResponse::ToolCall(call) => {
                    iterations += 1;
                    tracing::info!(
                        tool = call.name(),
                        "Step {}/{}: {}",
                        iterations,
                        self.max_iterations,
                        call
                    );
                    let provenance = call.to_string();
                    let observation = tools.execute(call).await?;
                    self.record(&mut state.evidence, &observation, &provenance);
                    messages.push(ChatMessage::assistant(reply));
                    messages.push(observation_message(iterations, &provenance, &observation.text));
                }
                ModelResponse::Finish { summary } => {
                    tracing::info!("Gathering finished after {} steps", iterations);
                    if !summary.trim().is_empty() {
                        state.evidence.push(Evidence {
                            source: None,
                            excerpt: summary,
                            provenance: FINAL_SUMMARY.to_string(),
                        });
                    }
                    finished = true;
                    break;
                }
                ModelResponse::Unparsable { raw, reason } => {
                    iterations += 1;
                    tracing::warn!("Unusable gather reply ({}), continuing", reason);
                    state.evidence.push(Evidence {
                        source: None,
                        excerpt: format!("Model reply could not be parsed: {reason}"),
                        provenance: "parse_error".to_string(),
                    });
                    if !raw.is_empty() {
                        messages.push(ChatMessage::assistant(raw));
                    }
                    messages.push(correction_message(&reason));
                }
            }
        }

        if !finished {
            tracing::warn!(
                "Gathering stopped at the iteration limit ({})",
                self.max_iterations
            );
        }
        state.iteration_count = iterations;
        Ok(state)
    }

    fn record(&self, evidence: &mut Vec<Evidence>, observation: &ToolObservation, provenance: &str) {
        if observation.excerpts.is_empty() {
            evidence.push(Evidence {
                source: None,
                excerpt: truncate_chars(&observation.text, self.observation_chars),
                provenance: provenance.to_string(),
            });
            return;
        }
        for (file, excerpt) in &observation.excerpts {
            evidence.push(Evidence {
                source: Some(file.clone()),
                excerpt: truncate_chars(excerpt, self.observation_chars),
                provenance: provenance.to_string(),
            });
        }
    }
}
