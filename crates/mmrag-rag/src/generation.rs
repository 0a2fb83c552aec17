use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use mmrag_core::{with_timeout, GenerationError, LanguageModel, Prompt};

/// Sends an assembled prompt to the reasoning model. No automatic retry.
#[derive(Clone)]
pub struct GenerationChain {
    model: Arc<dyn LanguageModel>,
    call_timeout: Duration,
}

impl GenerationChain {
    pub fn new(model: Arc<dyn LanguageModel>, call_timeout: Duration) -> Self {
        Self { model, call_timeout }
    }

    pub async fn generate(&self, question: &str, prompt: &Prompt) -> Result<String, GenerationError> {
        debug!(model = self.model.model_id(), images = prompt.image_count(), "generating answer");
        let answer = with_timeout(self.call_timeout, self.model.generate(prompt))
            .await
            .map_err(|e| GenerationError::from_call(question, &e))?;
        if answer.trim().is_empty() {
            return Err(GenerationError {
                question: question.to_string(),
                diagnostic: "model returned an empty answer".to_string(),
                retryable: false,
            });
        }
        Ok(answer)
    }
}
