#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use mmrag_core::{CallError, Embedder, FragmentExtractor, JsonElementExtractor, LanguageModel, Prompt, Settings};
use mmrag_embed::HashEmbedder;
use mmrag_rag::Session;

type DelayFn = Box<dyn Fn(&str) -> Duration + Send + Sync>;

/// Language model fake: echoes the chunk for summary prompts, describes
/// images, and answers from whatever context it was given.
pub struct ScriptedModel {
    calls: AtomicUsize,
    prompts: Mutex<Vec<Prompt>>,
    fail_on: Option<String>,
    delay: Option<DelayFn>,
    answer: Option<String>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self { calls: AtomicUsize::new(0), prompts: Mutex::new(Vec::new()), fail_on: None, delay: None, answer: None }
    }

    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn with_delay(mut self, delay: impl Fn(&str) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    pub fn answering(mut self, answer: &str) -> Self {
        self.answer = Some(answer.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, CallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        let text = prompt.text_parts().collect::<Vec<_>>().join("\n");
        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(&text)).await;
        }
        if let Some(needle) = &self.fail_on {
            if text.contains(needle.as_str()) {
                return Err(CallError::failed("scripted failure"));
            }
        }
        if let Some(answer) = &self.answer {
            return Ok(answer.clone());
        }
        if text.contains("describing images") {
            return Ok("Bar chart of revenue by year".to_string());
        }
        if let Some((_, chunk)) = text.split_once("Table or text chunk: ") {
            return Ok(chunk.to_string());
        }
        if text.contains("sky is blue") {
            Ok("The sky is blue.".to_string())
        } else {
            Ok("No information about that was found in the document.".to_string())
        }
    }
}

pub const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk";

pub fn sky_document() -> Vec<u8> {
    br#"[
        {"type": "NarrativeText", "text": "The sky is blue."},
        {"type": "Table", "text": "Revenue | 2023 | 100"}
    ]"#
    .to_vec()
}

pub fn chart_document() -> Vec<u8> {
    format!(
        r#"[
            {{"type": "NarrativeText", "text": "The sky is blue."}},
            {{"type": "Image", "text": "", "metadata": {{"image_base64": "{PNG_B64}"}}}}
        ]"#
    )
    .into_bytes()
}

pub fn embedder() -> Arc<dyn Embedder> {
    Arc::new(HashEmbedder::new(256))
}

pub fn extractor() -> Arc<dyn FragmentExtractor> {
    Arc::new(JsonElementExtractor::default())
}

pub fn session(settings: &Settings, summary: &Arc<ScriptedModel>, answer: &Arc<ScriptedModel>) -> Session {
    Session::new(settings, extractor(), summary.clone(), answer.clone(), embedder())
}
