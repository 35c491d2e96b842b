//! LLM integration
//!
//! Provides traits and implementations for:
//! - Embedding generation via external services (vLLM, OpenAI, etc.)
//! - Local feature-hashing embeddings
//! - Chat completion with optional structured output
//! - Retry with bounded backoff

mod cache;
mod client;
mod hash_embedder;
mod http_embedder;
mod retry;
mod traits;

pub use client::{extract_json, ChatMessage, LLMClient, VLLMClient};
pub use hash_embedder::HashEmbedder;
pub use http_embedder::HttpEmbedder;
pub use retry::{Backoff, RetryingEmbedder, RetryingModel};
pub use traits::*;
