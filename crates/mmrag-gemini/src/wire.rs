//! Request and response bodies of the Generative Language REST API.
use serde::{Deserialize, Serialize};

use mmrag_core::{CallError, Prompt, PromptPart};

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: Blob },
    /// Function calls, executable code and other part types we don't consume.
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BatchEmbedRequest {
    pub requests: Vec<EmbedRequest>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct EmbedRequest {
    pub model: String,
    pub content: Content,
}

#[derive(Debug, Deserialize)]
pub struct BatchEmbedResponse {
    #[serde(default)]
    pub embeddings: Vec<Embedding>,
}

#[derive(Debug, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

/// Prefix bare model names with `models/`.
pub fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

impl GenerateRequest {
    /// One user turn with the prompt parts in order.
    pub fn from_prompt(prompt: &Prompt, temperature: f32, max_output_tokens: u32) -> Self {
        let parts = prompt
            .parts
            .iter()
            .map(|p| match p {
                PromptPart::Text { text } => Part::Text { text: text.clone() },
                PromptPart::Image { media_type, data } => {
                    Part::InlineData { inline_data: Blob { mime_type: media_type.clone(), data: data.clone() } }
                }
            })
            .collect();
        Self {
            contents: vec![Content { role: Some("user".to_string()), parts }],
            generation_config: GenerationConfig { temperature, max_output_tokens },
        }
    }
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    pub fn into_text(self) -> Result<String, CallError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| CallError::failed("response has no candidates"))?;
        let text: String = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| match p {
                        Part::Text { text } => Some(text),
                        Part::InlineData { .. } | Part::Other(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        if text.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
            return Err(CallError::failed(format!("candidate has no text (finish reason: {reason})")));
        }
        Ok(text)
    }
}

impl BatchEmbedRequest {
    pub fn new(model: &str, texts: &[String]) -> Self {
        let model = model_path(model);
        Self {
            requests: texts
                .iter()
                .map(|t| EmbedRequest {
                    model: model.clone(),
                    content: Content { role: None, parts: vec![Part::Text { text: t.clone() }] },
                })
                .collect(),
        }
    }
}
