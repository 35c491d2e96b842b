//! Configuration management

use crate::error::{AgentRagError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM service configuration
    #[serde(default)]
    pub llm_service: LLMServiceConfig,

    /// Embedding provider selection
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking and retrieval parameters
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Evidence gathering and workflow bounds
    #[serde(default)]
    pub agent: AgentConfig,

    /// Retry policy for chat and embedding calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Document source
    #[serde(default)]
    pub documents: DocumentsConfig,

    /// Persisted index location
    #[serde(default)]
    pub index: IndexConfig,
}

/// LLM service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of the LLM service for chat/completions
    #[serde(default = "default_url")]
    pub url: String,

    /// Model name for chat completions
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Base URL for embeddings service (can be different from LLM URL)
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding dimensions
    #[serde(default)]
    pub embedding_dimensions: Option<usize>,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Sampling temperature; kept low for factual answers
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl LLMServiceConfig {
    /// Get the embeddings URL (falls back to main URL if not specified)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            model: default_chat_model(),
            embedding_url: std::env::var("AGENTRAG_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: std::env::var("AGENTRAG_EMBEDDING_DIMS")
                .ok()
                .and_then(|s| s.parse().ok()),
            api_key: std::env::var("AGENTRAG_LLM_API_KEY").ok(),
            timeout_secs: default_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_url() -> String {
    std::env::var("AGENTRAG_LLM_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

fn default_chat_model() -> String {
    std::env::var("AGENTRAG_LLM_MODEL")
        .unwrap_or_else(|_| "meta-llama/Llama-3.1-8B-Instruct".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("AGENTRAG_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "sentence-transformers/all-MiniLM-L6-v2".to_string())
}

fn default_timeout() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    1024
}

/// Which embedding backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    /// OpenAI-compatible `/v1/embeddings` endpoint
    #[default]
    Http,
    /// Local feature-hashing embedder, no network required
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,

    /// Vector size for the hash provider
    #[serde(default = "default_hash_dims")]
    pub hash_dimensions: usize,

    /// Texts per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Embedding requests in flight during index builds
    #[serde(default = "default_concurrency")]
    pub max_concurrent: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            hash_dimensions: default_hash_dims(),
            batch_size: default_batch_size(),
            max_concurrent: default_concurrency(),
        }
    }
}

fn default_hash_dims() -> usize {
    384
}

fn default_batch_size() -> usize {
    32
}

fn default_concurrency() -> usize {
    4
}

/// Chunking and retrieval parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default result count for the `search` tool
    #[serde(default = "default_top_k_chunks")]
    pub top_k_chunks: usize,

    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Number of files selected by the retrieval planner
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Chunk-level oversampling factor used by the planner (`k = max_files * oversample`)
    #[serde(default = "default_oversample")]
    pub oversample: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k_chunks: default_top_k_chunks(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_files: default_max_files(),
            oversample: default_oversample(),
        }
    }
}

fn default_top_k_chunks() -> usize {
    5
}

fn default_chunk_size() -> usize {
    crate::index::CHUNK_SIZE_CHARS
}

fn default_chunk_overlap() -> usize {
    crate::index::CHUNK_OVERLAP_CHARS
}

fn default_max_files() -> usize {
    3
}

fn default_oversample() -> usize {
    4
}

/// Evidence gathering and workflow bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Upper bound on tool-loop iterations per evidence-gathering pass
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// How many times synthesis may send the workflow back for more evidence
    #[serde(default = "default_max_regathers")]
    pub max_regathers: usize,

    /// Wall-clock limit for one `answer` call
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,

    /// Observations longer than this are truncated in evidence
    #[serde(default = "default_observation_chars")]
    pub observation_chars: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_regathers: default_max_regathers(),
            run_timeout_secs: None,
            observation_chars: default_observation_chars(),
        }
    }
}

fn default_max_iterations() -> usize {
    5
}

fn default_max_regathers() -> usize {
    1
}

fn default_observation_chars() -> usize {
    500
}

/// Bounded exponential backoff for chat and embedding calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

/// Where documents are read from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    #[serde(default = "default_documents_dir")]
    pub dir: PathBuf,

    /// Glob pattern for files to index
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            dir: default_documents_dir(),
            pattern: default_pattern(),
        }
    }
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("files_to_work_with")
}

fn default_pattern() -> String {
    "**/*.txt".to_string()
}

/// Persisted index location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_path")]
    pub path: PathBuf,

    /// Rebuild on every startup instead of loading the persisted index
    #[serde(default)]
    pub rebuild: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            rebuild: false,
        }
    }
}

fn default_index_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(crate::CACHE_DIR_NAME)
        .join("index.sqlite")
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from an explicit path, falling back to defaults if absent
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yaml::from_str(&content)?
        } else {
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Write config as YAML, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Reject values that would make retrieval or the tool loop meaningless
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.chunk_size == 0 {
            return Err(AgentRagError::Config("retrieval.chunk_size must be > 0".into()));
        }
        if self.retrieval.chunk_overlap >= self.retrieval.chunk_size {
            return Err(AgentRagError::Config(
                "retrieval.chunk_overlap must be smaller than chunk_size".into(),
            ));
        }
        if self.retrieval.max_files == 0 || self.retrieval.top_k_chunks == 0 {
            return Err(AgentRagError::Config(
                "retrieval.max_files and retrieval.top_k_chunks must be >= 1".into(),
            ));
        }
        if self.retrieval.oversample == 0 {
            return Err(AgentRagError::Config("retrieval.oversample must be >= 1".into()));
        }
        if self.agent.max_iterations == 0 {
            return Err(AgentRagError::Config("agent.max_iterations must be >= 1".into()));
        }
        if self.embedding.provider == EmbeddingProviderKind::Hash && self.embedding.hash_dimensions == 0 {
            return Err(AgentRagError::Config(
                "embedding.hash_dimensions must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieval.chunk_size, 1000);
        assert_eq!(config.retrieval.chunk_overlap, 150);
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.agent.max_regathers, 1);
        assert_eq!(config.documents.pattern, "**/*.txt");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
embedding:
  provider: hash
  hash_dimensions: 64
agent:
  max_iterations: 8
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.embedding.provider, EmbeddingProviderKind::Hash);
        assert_eq!(config.embedding.hash_dimensions, 64);
        assert_eq!(config.agent.max_iterations, 8);
        assert_eq!(config.retrieval.max_files, 3);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = Config::default();
        config.retrieval.chunk_overlap = config.retrieval.chunk_size;
        assert!(matches!(config.validate(), Err(AgentRagError::Config(_))));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = Config::load_from(&temp.path().join("nope.yml")).unwrap();
        assert_eq!(config.retrieval.top_k_chunks, 5);
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.yml");
        std::fs::write(&path, "retrieval:\n  max_files: 7\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.retrieval.max_files, 7);
    }

    #[test]
    fn test_save_then_load() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.yml");
        let mut config = Config::default();
        config.agent.run_timeout_secs = Some(30);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.agent.run_timeout_secs, Some(30));
        assert_eq!(loaded.llm_service.url, config.llm_service.url);
    }
}
