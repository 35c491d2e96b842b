//! Bounded exponential backoff around model and embedding calls

use super::{ChatMessage, Embedder, LanguageModel, OutputSchema};
use crate::config::RetryConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Retry policy: `ModelUnavailable` failures are retried up to `max_retries`
/// times, doubling the delay after each attempt. All other errors pass
/// through immediately.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    max_retries: u32,
    initial: Duration,
}

impl Backoff {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial: Duration::from_millis(config.initial_backoff_ms),
        }
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0;
        let mut delay = self.initial;

        loop {
            match op().await {
                Err(e) if e.is_transient() && retries < self.max_retries => {
                    retries += 1;
                    tracing::warn!(
                        "{}: {} (attempt {}/{}), retrying in {:?}",
                        what,
                        e,
                        retries,
                        self.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                other => return other,
            }
        }
    }
}

/// [`LanguageModel`] whose calls go through a [`Backoff`]
pub struct RetryingModel<M> {
    inner: M,
    backoff: Backoff,
}

impl<M: LanguageModel> RetryingModel<M> {
    pub fn new(inner: M, config: &RetryConfig) -> Self {
        Self {
            inner,
            backoff: Backoff::new(config),
        }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }
}

#[async_trait]
impl<M: LanguageModel> LanguageModel for RetryingModel<M> {
    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        schema: Option<&OutputSchema>,
    ) -> Result<String> {
        self.backoff
            .run("chat", || self.inner.generate(messages.clone(), schema))
            .await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// [`Embedder`] whose calls go through a [`Backoff`]
pub struct RetryingEmbedder<E> {
    inner: E,
    backoff: Backoff,
}

impl<E: Embedder> RetryingEmbedder<E> {
    pub fn new(inner: E, config: &RetryConfig) -> Self {
        Self {
            inner,
            backoff: Backoff::new(config),
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: Embedder> Embedder for RetryingEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.backoff.run("embed", || self.inner.embed(text)).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.backoff
            .run("embed batch", || self.inner.embed_batch(texts))
            .await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
