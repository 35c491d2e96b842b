//! HTTP client for external LLM services (vLLM, OpenAI, Ollama, etc.)

use super::cache::{chat_cache_key, embedding_cache_key, LLMCache};
use super::{LanguageModel, OutputSchema};
use crate::config::LLMServiceConfig;
use crate::error::{AgentRagError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Trait for LLM service clients
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate chat completion
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        schema: Option<&OutputSchema>,
    ) -> Result<String>;

    /// Generate embeddings for text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimensions
    fn embedding_dimensions(&self) -> usize;

    /// Get chat model name
    fn model_name(&self) -> &str;

    /// Get embedding model name
    fn embedding_model_name(&self) -> &str;
}

/// Chat message for completion requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// vLLM/OpenAI-compatible client
pub struct VLLMClient {
    http_client: reqwest::Client,
    config: LLMServiceConfig,
    embedding_dimensions: usize,
    cache: LLMCache,
}

impl VLLMClient {
    /// Create new vLLM client from configuration
    pub fn new(config: LLMServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        // all-MiniLM-L6-v2 produces 384-dimensional vectors
        let embedding_dimensions = config.embedding_dimensions.unwrap_or(384);

        Ok(Self {
            http_client,
            config,
            embedding_dimensions,
            cache: LLMCache::new(),
        })
    }

    /// Send a JSON POST and map transport failures to `ModelUnavailable`
    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        service: &str,
    ) -> Result<reqwest::Response> {
        let mut req = self.http_client.post(url).json(body);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await.map_err(|e| {
            AgentRagError::ModelUnavailable(format!("{} request failed: {}", service, e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentRagError::ModelUnavailable(format!(
                "{} error (HTTP {}): {}",
                service, status, body
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl LLMClient for VLLMClient {
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        schema: Option<&OutputSchema>,
    ) -> Result<String> {
        let start = Instant::now();
        let cache_input = serde_json::to_string(&(&messages, schema)).unwrap_or_default();
        let cache_key = chat_cache_key(&self.config.model, &cache_input);

        if let Some(cached) = self.cache.get(&cache_key) {
            tracing::debug!("Cache hit for chat completion");
            return Ok(cached);
        }

        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
            #[serde(skip_serializing_if = "Option::is_none")]
            response_format: Option<serde_json::Value>,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }

        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            response_format: schema.map(|s| {
                serde_json::json!({
                    "type": "json_schema",
                    "json_schema": { "name": s.name, "schema": s.schema },
                })
            }),
        };

        let url = format!("{}/v1/chat/completions", self.config.url);
        let response = self.post_json(&url, &request, "LLM service").await?;

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            AgentRagError::MalformedModelOutput(format!("Invalid chat response body: {}", e))
        })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                AgentRagError::MalformedModelOutput("No choices in LLM response".to_string())
            })?
            .message
            .content;

        self.cache.set(cache_key, content.clone());
        tracing::debug!(
            "Chat completion took {}ms",
            start.elapsed().as_millis()
        );

        Ok(content)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| AgentRagError::ModelUnavailable("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut uncached_texts = Vec::new();
        let mut uncached_indices = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let cache_key = embedding_cache_key(&self.config.embedding_model, text);
            if let Some(embedding) = self
                .cache
                .get(&cache_key)
                .and_then(|cached| serde_json::from_str::<Vec<f32>>(&cached).ok())
            {
                results.push(Some(embedding));
                continue;
            }
            results.push(None);
            uncached_texts.push(text.clone());
            uncached_indices.push(i);
        }

        if !uncached_texts.is_empty() {
            tracing::debug!(
                "Embedding batch: {} cached, {} to fetch",
                texts.len() - uncached_texts.len(),
                uncached_texts.len()
            );

            #[derive(Serialize)]
            struct EmbedRequest<'a> {
                model: &'a str,
                input: &'a [String],
            }

            #[derive(Deserialize)]
            struct EmbedResponse {
                data: Vec<EmbedData>,
            }

            #[derive(Deserialize)]
            struct EmbedData {
                embedding: Vec<f32>,
            }

            let request = EmbedRequest {
                model: &self.config.embedding_model,
                input: &uncached_texts,
            };

            let url = format!("{}/v1/embeddings", self.config.embeddings_url());
            let response = self.post_json(&url, &request, "Embedding service").await?;

            let embed_response: EmbedResponse = response.json().await.map_err(|e| {
                AgentRagError::ModelUnavailable(format!("Invalid embedding response: {}", e))
            })?;

            if embed_response.data.len() != uncached_texts.len() {
                return Err(AgentRagError::ModelUnavailable(format!(
                    "Embedding service returned {} vectors for {} inputs",
                    embed_response.data.len(),
                    uncached_texts.len()
                )));
            }

            for (i, data) in embed_response.data.into_iter().enumerate() {
                let cache_key =
                    embedding_cache_key(&self.config.embedding_model, &uncached_texts[i]);
                if let Ok(json) = serde_json::to_string(&data.embedding) {
                    self.cache.set(cache_key, json);
                }
                results[uncached_indices[i]] = Some(data.embedding);
            }
        }

        tracing::debug!(
            "Embedded {} texts in {}ms",
            texts.len(),
            start.elapsed().as_millis()
        );

        results
            .into_iter()
            .map(|r| {
                r.ok_or_else(|| AgentRagError::ModelUnavailable("Missing embedding".to_string()))
            })
            .collect()
    }

    fn embedding_dimensions(&self) -> usize {
        self.embedding_dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn embedding_model_name(&self) -> &str {
        &self.config.embedding_model
    }
}

#[async_trait]
impl LanguageModel for VLLMClient {
    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        schema: Option<&OutputSchema>,
    ) -> Result<String> {
        self.chat_completion(messages, schema).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Extract a JSON object from a model reply, tolerating code fences and prose
pub fn extract_json(response: &str) -> &str {
    let fenced = if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
    } else if response.contains("```") {
        response.split("```").nth(1)
    } else {
        None
    };
    let candidate = fenced.unwrap_or(response).trim();

    match (candidate.find('{'), candidate.rfind('}')) {
        (Some(start), Some(end)) if end > start => &candidate[start..=end],
        _ => candidate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_plain() {
        assert_eq!(extract_json(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn test_extract_json_fenced() {
        let reply = "Here you go:\n```json\n{\"a\": 1}\n```\nDone.";
        assert_eq!(extract_json(reply), r#"{"a": 1}"#);
    }

    #[test]
    fn test_extract_json_with_prose() {
        let reply = "Sure! {\"tool\": \"search\"} hope that helps";
        assert_eq!(extract_json(reply), r#"{"tool": "search"}"#);
    }

    #[test]
    fn test_extract_json_none() {
        assert_eq!(extract_json("no json here"), "no json here");
    }

    #[test]
    fn test_client_defaults() {
        let mut config = LLMServiceConfig::default();
        config.embedding_dimensions = None;
        let client = VLLMClient::new(config).unwrap();
        assert_eq!(client.embedding_dimensions(), 384);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_model_unavailable() {
        let mut config = LLMServiceConfig::default();
        config.url = "http://127.0.0.1:9".to_string();
        config.timeout_secs = 2;
        let client = VLLMClient::new(config).unwrap();

        let err = client
            .chat_completion(vec![ChatMessage::user("hi")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentRagError::ModelUnavailable(_)));
    }
}
