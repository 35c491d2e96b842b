//! Agentrag Core Library
//!
//! Question answering over a private collection of text documents.
//!
//! # Features
//! - Exact cosine-similarity vector index persisted to SQLite
//! - File-level retrieval planning by aggregating chunk similarities
//! - Bounded ReAct-style evidence gathering with `search` / `read_section` tools
//! - Staged workflow: analyze query, plan retrieval, gather evidence, synthesize

pub mod agent;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod llm;
pub mod retrieval;
pub mod vector;

pub use agent::{
    Answer, Evidence, EvidenceGatherer, FileScore, GraphState, ModelResponse, QueryAnalysis,
    Stage, ToolCall, ToolObservation, Workflow,
};
pub use config::{Config, EmbeddingProviderKind, LLMServiceConfig};
pub use engine::{IndexStatus, RagEngine};
pub use error::{AgentRagError, Error, Result};
pub use index::{Chunk, DirectorySource, Document, DocumentSource, StaticSource};
pub use llm::{
    ChatMessage, Embedder, HashEmbedder, HttpEmbedder, LLMClient, LanguageModel, OutputSchema,
    RetryingEmbedder, RetryingModel, VLLMClient,
};
pub use retrieval::RetrievalPlanner;
pub use vector::{IndexHandle, SearchHit, VectorIndex};

/// Default cache directory name
pub const CACHE_DIR_NAME: &str = "agentrag";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "agentrag";
