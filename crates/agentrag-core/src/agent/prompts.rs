//! Prompt construction for the workflow stages

use super::state::{Evidence, FileScore, QueryAnalysis};
use super::tools::tool_descriptions;
use crate::llm::{ChatMessage, OutputSchema};
use serde_json::json;

/// Line synthesis emits when the evidence cannot answer the question
pub const NEED_MORE_EVIDENCE: &str = "NEED_MORE_EVIDENCE";

pub fn query_analysis_messages(query: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You are a query analysis expert. Break the user's question into searchable \
             components. Output ONLY valid JSON, no introductory text or code fences.",
        ),
        ChatMessage::user(format!(
            r#"User query: {query}

Consider:
1. What specific information is needed to answer this?
2. Are time periods mentioned (Q1, December, end of year, ...)?
3. What metrics or numbers might be relevant?
4. Does answering require inference across multiple sources?

Respond with:
{{
  "information_needed": ["..."],
  "time_periods": ["..."],
  "metrics_requested": ["..."],
  "inference_required": true,
  "search_strategy": "brief explanation of how to search"
}}"#
        )),
    ]
}

pub fn query_analysis_schema() -> OutputSchema {
    OutputSchema::new(
        "query_analysis",
        json!({
            "type": "object",
            "properties": {
                "information_needed": {"type": "array", "items": {"type": "string"}},
                "time_periods": {"type": "array", "items": {"type": "string"}},
                "metrics_requested": {"type": "array", "items": {"type": "string"}},
                "inference_required": {"type": "boolean"},
                "search_strategy": {"type": "string"}
            },
            "required": ["information_needed", "time_periods", "metrics_requested",
                         "inference_required", "search_strategy"]
        }),
    )
}

pub fn tool_step_schema() -> OutputSchema {
    OutputSchema::new(
        "tool_step",
        json!({
            "type": "object",
            "properties": {
                "tool": {"type": "string", "enum": ["search", "read_section", "finish"]},
                "query": {"type": "string"},
                "k": {"type": "integer", "minimum": 1},
                "file": {"type": "string"},
                "start": {"type": "integer", "minimum": 0},
                "length": {"type": "integer", "minimum": 1},
                "summary": {"type": "string"}
            },
            "required": ["tool"]
        }),
    )
}

fn format_files(files: &[FileScore]) -> String {
    if files.is_empty() {
        return "(none selected; search covers all documents)".to_string();
    }
    files
        .iter()
        .map(|f| format!("- {}: {:.4}", f.file, f.score))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_analysis(analysis: &QueryAnalysis) -> String {
    serde_json::to_string_pretty(analysis).unwrap_or_default()
}

/// Opening messages of one gathering pass
pub fn gather_messages(
    query: &str,
    analysis: &QueryAnalysis,
    files: &[FileScore],
    prior: &[Evidence],
) -> Vec<ChatMessage> {
    let mut context = format!(
        "Original query: {query}\n\nQuery analysis:\n{}\n\n\
         Files ranked by relevance (higher is better):\n{}",
        format_analysis(analysis),
        format_files(files)
    );
    if !prior.is_empty() {
        context.push_str(
            "\n\nEvidence gathered so far was judged insufficient. Look for what is missing:\n",
        );
        context.push_str(&format_evidence(prior));
    }

    vec![
        ChatMessage::system(format!(
            "You are an evidence-gathering agent. Use the tools to find concrete facts \
             that answer the user's query, preferring the highest-ranked files. \
             Reply with exactly one JSON object per turn choosing one tool:\n{}\n\
             Cite the file id for every fact.",
            tool_descriptions()
        )),
        ChatMessage::user(context),
    ]
}

/// Message feeding a tool result back to the model
pub fn observation_message(step: usize, call: &str, observation: &str) -> ChatMessage {
    ChatMessage::user(format!(
        "Observation {step} for {call}:\n{observation}\n\nChoose the next tool, or finish."
    ))
}

/// Message sent after a reply that was not a valid tool call
pub fn correction_message(reason: &str) -> ChatMessage {
    ChatMessage::user(format!(
        "Your last reply could not be used ({reason}). Reply with one JSON object \
         with a \"tool\" field."
    ))
}

pub fn format_evidence(evidence: &[Evidence]) -> String {
    evidence
        .iter()
        .enumerate()
        .map(|(i, e)| {
            format!(
                "[{}] source: {} | via: {}\n{}",
                i + 1,
                e.source.as_deref().unwrap_or("-"),
                e.provenance,
                e.excerpt
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Synthesis prompt. `allow_more` offers the need-more-evidence verdict.
pub fn synthesis_messages(
    query: &str,
    analysis: &QueryAnalysis,
    evidence: &[Evidence],
    allow_more: bool,
) -> Vec<ChatMessage> {
    let verdict = if allow_more {
        format!(
            "\nIf the evidence is clearly insufficient and more searching could help, \
             reply with the single line {NEED_MORE_EVIDENCE} instead."
        )
    } else {
        "\nIf the evidence is insufficient, say what is missing in the answer.".to_string()
    };

    vec![
        ChatMessage::system(
            "You are a synthesis expert. Build an accurate answer from the gathered evidence only.",
        ),
        ChatMessage::user(format!(
            r#"User query: {query}

Query analysis:
{analysis}

Evidence gathered:
{evidence}

Instructions:
1. Think through the evidence step by step.
2. If inference is required, explain it.
3. Use specific numbers, dates and facts from the evidence.
4. Cite sources inline, e.g. (from budget_report_q1.txt).{verdict}

Response format:

**REASONING:**
[step-by-step thought process]

**ANSWER:**
[final answer with inline citations]"#,
            analysis = format_analysis(analysis),
            evidence = format_evidence(evidence),
        )),
    ]
}
