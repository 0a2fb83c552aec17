//! Boundaries to the external collaborators: partitioner, embedding function
//! and multimodal model.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::error::{CallError, ExtractionError};
use crate::types::{Fragment, Prompt};

pub trait FragmentExtractor: Send + Sync {
    /// Turn raw document bytes into fragments ordered by `origin_order`.
    fn extract(&self, document: &[u8]) -> Result<Vec<Fragment>, ExtractionError>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `hash:d768`).
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    /// Compute one vector per input text, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CallError>;
}

/// A text + vision capable model: consumes a multi-part prompt, returns text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_id(&self) -> &str;
    async fn generate(&self, prompt: &Prompt) -> Result<String, CallError>;
}

/// Bound an external call by `limit`; expiry becomes a retryable
/// [`CallError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, CallError>
where
    F: Future<Output = Result<T, CallError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CallError::Timeout(limit)),
    }
}
