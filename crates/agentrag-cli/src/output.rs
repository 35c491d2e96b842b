//! Answer formatting

use crate::app::OutputFormat;
use agentrag_core::Answer;
use anyhow::Result;

pub fn format_answer(answer: &Answer, format: OutputFormat, show_evidence: bool) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(answer)?),
        OutputFormat::Cli => Ok(format_cli(answer, show_evidence)),
    }
}

fn format_cli(answer: &Answer, show_evidence: bool) -> String {
    let mut out = String::new();
    out.push_str(answer.final_answer.trim());
    out.push('\n');

    if !answer.selected_files.is_empty() {
        out.push_str("\nSources:\n");
        for file in &answer.selected_files {
            out.push_str(&format!("  {:<40} {:.3}\n", file.file, file.score));
        }
    }

    if show_evidence && !answer.evidence.is_empty() {
        out.push_str("\nEvidence:\n");
        for (i, evidence) in answer.evidence.iter().enumerate() {
            let source = evidence.source.as_deref().unwrap_or("-");
            out.push_str(&format!("  [{}] {} via {}\n", i + 1, source, evidence.provenance));
            for line in evidence.excerpt.lines().take(6) {
                out.push_str(&format!("      {}\n", line));
            }
        }
    }

    if !answer.reasoning_trace.trim().is_empty() {
        out.push_str("\nReasoning:\n");
        for line in answer.reasoning_trace.trim().lines() {
            out.push_str(&format!("  {}\n", line));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentrag_core::{Evidence, FileScore};

    fn answer() -> Answer {
        Answer {
            final_answer: "Budget rose 10% (from doc1.txt)".to_string(),
            reasoning_trace: "doc1 says so".to_string(),
            selected_files: vec![FileScore {
                file: "doc1.txt".to_string(),
                score: 0.8125,
            }],
            evidence: vec![Evidence {
                source: Some("doc1.txt".to_string()),
                excerpt: "Q1 budget increased 10%".to_string(),
                provenance: "search(query=\"budget\")".to_string(),
            }],
        }
    }

    #[test]
    fn test_cli_format_lists_sources() {
        let text = format_answer(&answer(), OutputFormat::Cli, false).unwrap();
        assert!(text.starts_with("Budget rose 10%"));
        assert!(text.contains("doc1.txt"));
        assert!(text.contains("0.812"));
        assert!(!text.contains("Evidence:"));
    }

    #[test]
    fn test_cli_format_with_evidence() {
        let text = format_answer(&answer(), OutputFormat::Cli, true).unwrap();
        assert!(text.contains("Evidence:"));
        assert!(text.contains("Q1 budget increased 10%"));
    }

    #[test]
    fn test_json_format_is_parseable() {
        let text = format_answer(&answer(), OutputFormat::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["selected_files"][0]["file"], "doc1.txt");
    }
}
