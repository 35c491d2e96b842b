//! Staged question-answering workflow
//!
//! ```text
//! AnalyzeQuery -> PlanRetrieval -> GatherEvidence -> Synthesize -> Done
//!                                        ^               |
//!                                        +---------------+  (at most max_regathers times)
//! ```

use super::prompts::{
    query_analysis_messages, query_analysis_schema, synthesis_messages, NEED_MORE_EVIDENCE,
};
use super::react::EvidenceGatherer;
use super::state::{Answer, GraphState, QueryAnalysis};
use crate::config::Config;
use crate::error::{AgentRagError, Result};
use crate::llm::{extract_json, Embedder, LanguageModel};
use crate::retrieval::RetrievalPlanner;
use crate::vector::VectorIndex;
use std::sync::Arc;
use std::time::Duration;

/// Answer given when the collection has nothing to search
pub const NO_INFORMATION_ANSWER: &str =
    "No relevant information was found in the indexed documents.";

/// Answer given when synthesis still wants more evidence after the last re-gather
pub const INSUFFICIENT_EVIDENCE_ANSWER: &str =
    "The gathered evidence is not sufficient to answer the question.";

const NO_REASONING_NOTE: &str = "Direct synthesis without explicit reasoning trace";

/// Workflow position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    AnalyzeQuery,
    PlanRetrieval,
    GatherEvidence,
    Synthesize,
    Done,
}

/// What synthesis concluded about the evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Sufficient,
    NeedMoreEvidence,
}

/// Parsed synthesis reply
#[derive(Debug, Clone, PartialEq, Eq)]
enum Synthesis {
    NeedMore,
    Answer { reasoning: String, answer: String },
}

fn parse_synthesis(reply: &str) -> Synthesis {
    if reply.lines().any(|l| l.trim() == NEED_MORE_EVIDENCE) {
        return Synthesis::NeedMore;
    }

    match (reply.find("**REASONING:**"), reply.find("**ANSWER:**")) {
        (Some(_), Some(answer_at)) => {
            let reasoning = reply[..answer_at].replace("**REASONING:**", "");
            let answer = &reply[answer_at + "**ANSWER:**".len()..];
            Synthesis::Answer {
                reasoning: reasoning.trim().to_string(),
                answer: answer.trim().to_string(),
            }
        }
        _ => Synthesis::Answer {
            reasoning: NO_REASONING_NOTE.to_string(),
            answer: reply.trim().to_string(),
        },
    }
}

/// Runs queries through the stage graph
pub struct Workflow {
    model: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
    planner: RetrievalPlanner,
    gatherer: EvidenceGatherer,
    max_regathers: usize,
    timeout: Option<Duration>,
}

impl Workflow {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        config: &Config,
    ) -> Result<Self> {
        let planner =
            RetrievalPlanner::new(config.retrieval.max_files, config.retrieval.oversample)?;
        let gatherer = EvidenceGatherer::new(
            Arc::clone(&model),
            Arc::clone(&embedder),
            config.agent.max_iterations,
            config.agent.observation_chars,
        )
        .with_search_k(config.retrieval.top_k_chunks);

        Ok(Self {
            model,
            embedder,
            planner,
            gatherer,
            max_regathers: config.agent.max_regathers,
            timeout: config.agent.run_timeout_secs.map(Duration::from_secs),
        })
    }

    /// Transition function. The back-edge from `Synthesize` is taken only
    /// while `regather_count < max_regathers`.
    pub fn next(&self, stage: Stage, state: &GraphState, verdict: Verdict) -> Stage {
        match stage {
            Stage::AnalyzeQuery => Stage::PlanRetrieval,
            Stage::PlanRetrieval => Stage::GatherEvidence,
            Stage::GatherEvidence => Stage::Synthesize,
            Stage::Synthesize
                if verdict == Verdict::NeedMoreEvidence
                    && state.regather_count < self.max_regathers =>
            {
                Stage::GatherEvidence
            }
            Stage::Synthesize | Stage::Done => Stage::Done,
        }
    }

    /// Answer `query` from `index`.
    ///
    /// Fails with `InvalidArgument` for a blank query, `Timeout` when the
    /// configured limit elapses, and `ModelUnavailable` when the model keeps
    /// failing. No partial answer is returned on failure.
    pub async fn answer(&self, index: &VectorIndex, query: &str) -> Result<Answer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AgentRagError::InvalidArgument(
                "query must not be empty".to_string(),
            ));
        }

        let state = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(index, query))
                .await
                .map_err(|_| AgentRagError::Timeout(limit.as_secs()))??,
            None => self.run(index, query).await?,
        };
        Ok(state.into())
    }

    /// Drive the graph to `Done`, returning the final state
    pub async fn run(&self, index: &VectorIndex, query: &str) -> Result<GraphState> {
        let mut state = GraphState::new(query);
        let mut stage = Stage::AnalyzeQuery;
        let mut verdict = Verdict::Sufficient;

        while stage != Stage::Done {
            tracing::info!("Stage: {:?}", stage);
            state = match stage {
                Stage::AnalyzeQuery => self.analyze_query(state).await?,
                Stage::PlanRetrieval => self.plan_retrieval(index, state).await?,
                Stage::GatherEvidence => self.gather_evidence(index, state).await?,
                Stage::Synthesize => {
                    let (next, v) = self.synthesize(index, state).await?;
                    verdict = v;
                    next
                }
                Stage::Done => state,
            };

            let next = self.next(stage, &state, verdict);
            if stage == Stage::Synthesize && next == Stage::GatherEvidence {
                state.regather_count += 1;
                tracing::info!(
                    "Synthesis asked for more evidence (re-gather {}/{})",
                    state.regather_count,
                    self.max_regathers
                );
            }
            stage = next;
        }

        tracing::info!(
            "Workflow done: {} files, {} evidence items",
            state.selected_files.len(),
            state.evidence.len()
        );
        Ok(state)
    }

    async fn analyze_query(&self, mut state: GraphState) -> Result<GraphState> {
        let schema = query_analysis_schema();
        let reply = match self
            .model
            .generate(query_analysis_messages(&state.original_query), Some(&schema))
            .await
        {
            Ok(reply) => reply,
            Err(AgentRagError::MalformedModelOutput(e)) => {
                tracing::warn!("Unusable query analysis reply: {}, using fallback", e);
                state.query_analysis = QueryAnalysis::fallback(&state.original_query);
                return Ok(state);
            }
            Err(e) => return Err(e),
        };
        tracing::debug!("Query analysis reply: {}", reply);

        state.query_analysis = match serde_json::from_str::<QueryAnalysis>(extract_json(&reply)) {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!("Failed to parse query analysis: {}, using fallback", e);
                QueryAnalysis::fallback(&state.original_query)
            }
        };
        Ok(state)
    }

    async fn plan_retrieval(&self, index: &VectorIndex, mut state: GraphState) -> Result<GraphState> {
        state.selected_files = self
            .planner
            .plan(
                index,
                self.embedder.as_ref(),
                &state.original_query,
                &state.query_analysis,
            )
            .await?;
        Ok(state)
    }

    async fn gather_evidence(&self, index: &VectorIndex, state: GraphState) -> Result<GraphState> {
        if index.is_empty() {
            tracing::info!("Index is empty, nothing to gather");
            return Ok(state);
        }
        self.gatherer.gather(index, state).await
    }

    async fn synthesize(
        &self,
        index: &VectorIndex,
        mut state: GraphState,
    ) -> Result<(GraphState, Verdict)> {
        if index.is_empty() {
            state.reasoning_trace = "The document collection is empty.".to_string();
            state.final_answer = NO_INFORMATION_ANSWER.to_string();
            return Ok((state, Verdict::Sufficient));
        }

        let allow_more = state.regather_count < self.max_regathers;
        tracing::info!(
            "Synthesizing from {} evidence items citing {:?}",
            state.evidence.len(),
            state.cited_files()
        );
        let messages = synthesis_messages(
            &state.original_query,
            &state.query_analysis,
            &state.evidence,
            allow_more,
        );
        let synthesis = match self.model.generate(messages, None).await {
            Ok(reply) => {
                tracing::debug!("Synthesis reply: {}", reply);
                parse_synthesis(&reply)
            }
            Err(AgentRagError::MalformedModelOutput(e)) => {
                tracing::warn!("Unusable synthesis reply: {}", e);
                Synthesis::Answer {
                    reasoning: NO_REASONING_NOTE.to_string(),
                    answer: String::new(),
                }
            }
            Err(e) => return Err(e),
        };

        match synthesis {
            Synthesis::NeedMore if allow_more => Ok((state, Verdict::NeedMoreEvidence)),
            Synthesis::NeedMore => {
                tracing::warn!("Evidence still insufficient after re-gathering");
                state.reasoning_trace =
                    "Synthesis judged the evidence insufficient after re-gathering.".to_string();
                state.final_answer = INSUFFICIENT_EVIDENCE_ANSWER.to_string();
                Ok((state, Verdict::NeedMoreEvidence))
            }
            Synthesis::Answer { answer, .. } if answer.is_empty() => {
                tracing::warn!("Synthesis returned an empty answer");
                state.reasoning_trace = NO_REASONING_NOTE.to_string();
                state.final_answer = INSUFFICIENT_EVIDENCE_ANSWER.to_string();
                Ok((state, Verdict::Sufficient))
            }
            Synthesis::Answer { reasoning, answer } => {
                state.reasoning_trace = reasoning;
                state.final_answer = answer;
                Ok((state, Verdict::Sufficient))
            }
        }
    }
}
