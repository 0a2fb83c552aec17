//! mmrag-gemini
//!
//! Gemini-backed [`LanguageModel`] and [`Embedder`] over the REST API.

pub mod wire;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use mmrag_core::config::{EmbeddingSettings, GenerationSettings};
use mmrag_core::{CallError, Embedder, LanguageModel, Prompt};

use crate::wire::{model_path, BatchEmbedRequest, BatchEmbedResponse, GenerateRequest, GenerateResponse};

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("GOOGLE_API_KEY is not set")]
    MissingApiKey,

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Shared HTTP client and credentials.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Result<Self, GeminiError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    /// Read the API key from `GOOGLE_API_KEY`.
    pub fn from_env() -> Result<Self, GeminiError> {
        let key = std::env::var(API_KEY_VAR).ok().filter(|k| !k.trim().is_empty()).ok_or(GeminiError::MissingApiKey)?;
        Self::new(key, None)
    }

    pub fn model(&self, settings: &GenerationSettings) -> GeminiModel {
        GeminiModel::new(self.clone(), &settings.model, settings.temperature, settings.max_output_tokens)
    }

    /// Model used for fragment summaries and image transcription.
    pub fn summary_model(&self, settings: &GenerationSettings) -> GeminiModel {
        GeminiModel::new(self.clone(), &settings.summary_model, settings.temperature, settings.max_output_tokens)
    }

    pub fn embedder(&self, settings: &EmbeddingSettings) -> GeminiEmbedder {
        GeminiEmbedder::new(self.clone(), &settings.model, settings.dim)
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, method: &str, body: &B) -> Result<R, CallError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| CallError::failed(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, method, "gemini request rejected");
            return Err(CallError::failed(format!("API error {status}: {body}")));
        }

        response.json().await.map_err(|e| CallError::failed(format!("failed to parse response: {e}")))
    }
}

pub struct GeminiModel {
    client: GeminiClient,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiModel {
    pub fn new(client: GeminiClient, model: &str, temperature: f32, max_output_tokens: u32) -> Self {
        Self { client, model: model_path(model), temperature, max_output_tokens }
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, CallError> {
        let request = GenerateRequest::from_prompt(prompt, self.temperature, self.max_output_tokens);
        let response: GenerateResponse =
            self.client.post(&format!("{}:generateContent", self.model), &request).await?;
        response.into_text()
    }
}

pub struct GeminiEmbedder {
    client: GeminiClient,
    model: String,
    dim: usize,
}

impl GeminiEmbedder {
    const BATCH_SIZE: usize = 100;

    pub fn new(client: GeminiClient, model: &str, dim: usize) -> Self {
        Self { client, model: model_path(model), dim }
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn embedder_id(&self) -> &str {
        &self.model
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CallError> {
        let mut all = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(Self::BATCH_SIZE) {
            let request = BatchEmbedRequest::new(&self.model, chunk);
            let response: BatchEmbedResponse =
                self.client.post(&format!("{}:batchEmbedContents", self.model), &request).await?;
            if response.embeddings.len() != chunk.len() {
                return Err(CallError::failed(format!(
                    "expected {} embeddings, got {}",
                    chunk.len(),
                    response.embeddings.len()
                )));
            }
            for e in response.embeddings {
                if e.values.len() != self.dim {
                    return Err(CallError::failed(format!(
                        "embedding has {} dimensions, configured {}",
                        e.values.len(),
                        self.dim
                    )));
                }
                all.push(e.values);
            }
        }
        Ok(all)
    }
}
