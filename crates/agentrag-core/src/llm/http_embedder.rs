//! Embedder backed by an OpenAI-compatible `/v1/embeddings` endpoint

use super::{Embedder, LLMClient};
use crate::config::LLMServiceConfig;
use crate::error::{AgentRagError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Embeds through an [`LLMClient`], rejecting vectors whose length does not
/// match the configured dimensions so a misconfigured service cannot corrupt
/// the index.
pub struct HttpEmbedder {
    client: Arc<dyn LLMClient>,
}

impl HttpEmbedder {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }

    pub fn from_config(config: LLMServiceConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(super::VLLMClient::new(config)?)))
    }

    fn check(&self, vector: &[f32]) -> Result<()> {
        let expected = self.client.embedding_dimensions();
        if vector.len() != expected {
            return Err(AgentRagError::SchemaMismatch {
                expected,
                found: vector.len(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.client.embed(text).await?;
        self.check(&vector)?;
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.client.embed_batch(texts).await?;
        for v in &vectors {
            self.check(v)?;
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.client.embedding_dimensions()
    }

    fn model_name(&self) -> &str {
        self.client.embedding_model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, OutputSchema};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedClient {
        dims: usize,
        returned: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LLMClient for FixedClient {
        async fn chat_completion(
            &self,
            _messages: Vec<ChatMessage>,
            _schema: Option<&OutputSchema>,
        ) -> Result<String> {
            Ok(String::new())
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0.5; self.returned])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|_| vec![0.5; self.returned]).collect())
        }

        fn embedding_dimensions(&self) -> usize {
            self.dims
        }

        fn model_name(&self) -> &str {
            "chat"
        }

        fn embedding_model_name(&self) -> &str {
            "embed"
        }
    }

    fn embedder(dims: usize, returned: usize) -> (HttpEmbedder, Arc<FixedClient>) {
        let client = Arc::new(FixedClient {
            dims,
            returned,
            calls: AtomicUsize::new(0),
        });
        (HttpEmbedder::new(client.clone()), client)
    }

    #[tokio::test]
    async fn test_matching_dimensions_pass_through() {
        let (embedder, _) = embedder(4, 4);
        let batch = embedder
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(embedder.model_name(), "embed");
    }

    #[tokio::test]
    async fn test_wrong_dimensions_rejected() {
        let (embedder, _) = embedder(4, 3);
        let err = embedder.embed("a").await.unwrap_err();
        assert!(matches!(
            err,
            AgentRagError::SchemaMismatch {
                expected: 4,
                found: 3
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let (embedder, client) = embedder(4, 4);
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }
}
