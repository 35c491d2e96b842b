//! Reasoning workflow
//!
//! Query analysis, retrieval planning, tool-driven evidence gathering and
//! synthesis, sequenced by an explicit stage graph.

mod graph;
mod prompts;
mod react;
mod state;
mod tools;

pub use graph::{Stage, Verdict, Workflow, INSUFFICIENT_EVIDENCE_ANSWER, NO_INFORMATION_ANSWER};
pub use prompts::NEED_MORE_EVIDENCE;
pub use react::{EvidenceGatherer, ModelResponse, FINAL_SUMMARY};
pub use state::{Answer, Evidence, FileScore, GraphState, QueryAnalysis};
pub use tools::{read_section, ToolBox, ToolCall, ToolObservation};
