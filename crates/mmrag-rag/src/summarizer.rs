//! Per-fragment summarization through the language-model boundary.
//!
//! Text and table fragments get one summarization call. Image fragments are
//! first transcribed (a call carrying the image) and the transcript is then
//! summarized by the same text call, so every modality ends in one contract.
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use mmrag_core::config::SummarizeSettings;
use mmrag_core::{with_timeout, Fragment, FragmentKind, LanguageModel, Prompt, SummarizationError, SummarizedFragment};

const SUMMARY_INSTRUCTION: &str = "You are an assistant tasked with summarizing tables and text for retrieval. \
These summaries will be embedded and used to retrieve the raw text or table elements. \
Give a concise summary of the table or text that is well optimized for retrieval.";

const TRANSCRIPTION_INSTRUCTION: &str = "You are an assistant tasked with describing images for retrieval. \
Describe the image in detail. Transcribe any visible text, numbers, axis labels and legends. \
For charts and graphs state what is plotted and the main trends.";

/// Result of summarizing a whole document.
#[derive(Debug, Default)]
pub struct SummaryBatch {
    /// Successfully summarized fragments, in input order.
    pub summarized: Vec<SummarizedFragment>,
    pub failures: Vec<SummarizationError>,
    /// Fragments left out before any call: empty payloads and text fragments
    /// beyond `max_text_fragments`.
    pub skipped: usize,
}

#[derive(Clone)]
pub struct Summarizer {
    model: Arc<dyn LanguageModel>,
    settings: SummarizeSettings,
    call_timeout: Duration,
}

impl Summarizer {
    pub fn new(model: Arc<dyn LanguageModel>, settings: SummarizeSettings, call_timeout: Duration) -> Self {
        Self { model, settings, call_timeout }
    }

    /// Summary text for a text or table fragment.
    pub async fn summarize(&self, fragment: &Fragment) -> Result<String, SummarizationError> {
        let origin_order = fragment.origin_order;
        if fragment.is_empty() {
            return Err(SummarizationError::EmptyPayload { origin_order });
        }
        let prompt = Prompt::text(format!("{SUMMARY_INSTRUCTION} Table or text chunk: {}", fragment.payload));
        self.call(&prompt, origin_order).await
    }

    /// Transcribe an image fragment, then summarize the transcript.
    pub async fn summarize_image(&self, fragment: &Fragment) -> Result<String, SummarizationError> {
        let origin_order = fragment.origin_order;
        if fragment.is_empty() {
            return Err(SummarizationError::EmptyPayload { origin_order });
        }
        let prompt =
            Prompt::text(TRANSCRIPTION_INSTRUCTION).with_image(fragment.image_media_type(), fragment.payload.trim());
        let transcript = self.call(&prompt, origin_order).await?;
        let transcript = Fragment::text(transcript, origin_order);
        self.summarize(&transcript).await
    }

    /// Dispatch on kind. With `summarize_texts` off, text fragments are their
    /// own summary.
    pub async fn summarize_fragment(&self, fragment: &Fragment) -> Result<String, SummarizationError> {
        match fragment.kind {
            FragmentKind::Text if !self.settings.summarize_texts => {
                if fragment.is_empty() {
                    return Err(SummarizationError::EmptyPayload { origin_order: fragment.origin_order });
                }
                Ok(fragment.payload.clone())
            }
            FragmentKind::Text | FragmentKind::Table => self.summarize(fragment).await,
            FragmentKind::Image => self.summarize_image(fragment).await,
        }
    }

    /// Summarize every fragment independently, at most `concurrency` calls in
    /// flight. One fragment failing never stops the rest.
    pub async fn summarize_all(&self, fragments: Vec<Fragment>) -> SummaryBatch {
        let mut batch = SummaryBatch::default();
        let mut texts_taken = 0usize;
        let mut pending = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            if fragment.is_empty() {
                debug!(origin_order = fragment.origin_order, "skipping empty fragment");
                batch.skipped += 1;
                continue;
            }
            if fragment.kind == FragmentKind::Text {
                if let Some(cap) = self.settings.max_text_fragments {
                    if texts_taken >= cap {
                        debug!(origin_order = fragment.origin_order, cap, "text fragment over cap, not summarized");
                        batch.skipped += 1;
                        continue;
                    }
                }
                texts_taken += 1;
            }
            pending.push(fragment);
        }

        let concurrency = self.settings.concurrency.max(1);
        let results: Vec<(Fragment, Result<String, SummarizationError>)> = stream::iter(pending)
            .map(|fragment| async move {
                let result = self.summarize_fragment(&fragment).await;
                (fragment, result)
            })
            .buffered(concurrency)
            .collect()
            .await;

        for (fragment, result) in results {
            match result {
                Ok(summary) => batch.summarized.push(SummarizedFragment::new(fragment, summary)),
                Err(e) => {
                    warn!(origin_order = e.origin_order(), error = %e, "summarization failed, fragment skipped");
                    batch.failures.push(e);
                }
            }
        }
        info!(
            summarized = batch.summarized.len(),
            failed = batch.failures.len(),
            skipped = batch.skipped,
            "summarization finished"
        );
        batch
    }

    async fn call(&self, prompt: &Prompt, origin_order: usize) -> Result<String, SummarizationError> {
        let text = with_timeout(self.call_timeout, self.model.generate(prompt))
            .await
            .map_err(|source| SummarizationError::Call { origin_order, source })?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SummarizationError::EmptySummary { origin_order });
        }
        Ok(text.to_string())
    }
}
