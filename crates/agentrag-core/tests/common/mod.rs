//! Shared fixtures for integration tests

#![allow(dead_code)]

use agentrag_core::config::EmbeddingProviderKind;
use agentrag_core::{
    AgentRagError, ChatMessage, Config, Document, DocumentSource, HashEmbedder, LanguageModel,
    OutputSchema, RagEngine, Result, StaticSource,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Scripted model that answers by workflow stage.
///
/// The stage is recognised from the system prompt. Each stage replays its
/// queue, then repeats the last reply forever.
#[derive(Default)]
pub struct StageModel {
    analysis: Mutex<VecDeque<String>>,
    gather: Mutex<VecDeque<String>>,
    synthesis: Mutex<VecDeque<String>>,
    pub calls: Mutex<Vec<&'static str>>,
    delay: Option<Duration>,
    fail: bool,
    garbled: bool,
}

impl StageModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analysis(self, reply: &str) -> Self {
        self.analysis.lock().unwrap().push_back(reply.to_string());
        self
    }

    pub fn gather(self, replies: &[&str]) -> Self {
        self.gather
            .lock()
            .unwrap()
            .extend(replies.iter().map(|s| s.to_string()));
        self
    }

    pub fn synthesis(self, reply: &str) -> Self {
        self.synthesis.lock().unwrap().push_back(reply.to_string());
        self
    }

    /// Sleep before every reply
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call with `ModelUnavailable`
    pub fn unavailable(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Fail every call with `MalformedModelOutput`
    pub fn garbled(mut self) -> Self {
        self.garbled = true;
        self
    }

    pub fn count(&self, stage: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|s| **s == stage)
            .count()
    }

    fn next(queue: &Mutex<VecDeque<String>>) -> String {
        let mut q = queue.lock().unwrap();
        if q.len() > 1 {
            q.pop_front().unwrap()
        } else {
            q.front().cloned().unwrap_or_else(|| "done".to_string())
        }
    }
}

#[async_trait]
impl LanguageModel for StageModel {
    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        _schema: Option<&OutputSchema>,
    ) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(AgentRagError::ModelUnavailable("connection refused".into()));
        }

        let system = messages.first().map(|m| m.content.as_str()).unwrap_or("");
        let (stage, queue) = if system.contains("query analysis") {
            ("analysis", &self.analysis)
        } else if system.contains("evidence-gathering") {
            ("gather", &self.gather)
        } else {
            ("synthesis", &self.synthesis)
        };
        self.calls.lock().unwrap().push(stage);
        if self.garbled {
            return Err(AgentRagError::MalformedModelOutput(
                "No choices in LLM response".into(),
            ));
        }
        Ok(Self::next(queue))
    }

    fn model_name(&self) -> &str {
        "stage-model"
    }
}

pub const ANALYSIS: &str = r#"{
  "information_needed": ["Q1 budget change", "Christmas sales performance"],
  "time_periods": ["Q1", "Christmas"],
  "metrics_requested": ["budget", "sales"],
  "inference_required": true,
  "search_strategy": "look up the budget report and the sales report"
}"#;

pub fn scenario_docs() -> Vec<Document> {
    vec![
        Document::new("doc1.txt", "Q1 budget increased 10%"),
        Document::new("doc2.txt", "Christmas sales were strong"),
    ]
}

pub fn twenty_line_doc() -> Document {
    let lines: Vec<String> = (1..=20).map(|i| format!("budget line {i}")).collect();
    Document::new("doc1", lines.join("\n"))
}

pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.embedding.provider = EmbeddingProviderKind::Hash;
    config.embedding.hash_dimensions = 256;
    config.index.path = dir.path().join("index.sqlite");
    config.retry.initial_backoff_ms = 1;
    config
}

pub async fn engine(
    config: Config,
    model: Arc<StageModel>,
    docs: Vec<Document>,
) -> RagEngine {
    let embedder = Arc::new(HashEmbedder::new(config.embedding.hash_dimensions));
    let source: Arc<dyn DocumentSource> = Arc::new(StaticSource::new(docs));
    RagEngine::with_components(config, model, embedder, source)
        .await
        .unwrap()
}
