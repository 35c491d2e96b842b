//! Error types for agentrag

use thiserror::Error;

/// Result type alias using AgentRagError
pub type Result<T> = std::result::Result<T, AgentRagError>;

/// Error type alias for convenience
pub type Error = AgentRagError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
    pub const MODEL_UNAVAILABLE: i32 = 4;
    pub const TIMEOUT: i32 = 5;
}

/// Main error type for agentrag
#[derive(Debug, Error)]
pub enum AgentRagError {
    /// Bad caller input (e.g. `k == 0`). Never retried.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Persisted index is missing or corrupt. Callers recover by rebuilding.
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// Persisted vector dimension differs from the configured embedder.
    #[error("Index schema mismatch: expected {expected} dimensions, found {found}")]
    SchemaMismatch { expected: usize, found: usize },

    /// Language-model or embedding service failure (timeout, rate limit, network).
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Malformed model output: {0}")]
    MalformedModelOutput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AgentRagError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound(_) => exit_codes::NOT_FOUND,
            Self::InvalidArgument(_) | Self::Config(_) | Self::SchemaMismatch { .. } => {
                exit_codes::INVALID_INPUT
            }
            Self::ModelUnavailable(_) | Self::Http(_) => exit_codes::MODEL_UNAVAILABLE,
            Self::Timeout(_) => exit_codes::TIMEOUT,
            _ => exit_codes::GENERAL_ERROR,
        }
    }

    /// Whether a retry with backoff may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ModelUnavailable(_))
    }
}
