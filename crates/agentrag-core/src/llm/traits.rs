//! LLM trait definitions

use super::ChatMessage;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Embedding generation trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for batch of texts, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// JSON schema the model is asked to conform to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

impl OutputSchema {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// Text generation trait used by the workflow stages.
///
/// Implementations report transport failures (timeouts, rate limits,
/// network errors) as `ModelUnavailable`. Output validation is the
/// caller's job.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a reply, optionally constrained to a JSON schema
    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        schema: Option<&OutputSchema>,
    ) -> Result<String>;

    /// Get model name
    fn model_name(&self) -> &str;
}
