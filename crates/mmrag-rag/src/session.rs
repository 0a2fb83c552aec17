//! Load-once / query-many lifecycle for one document.
//!
//! Every `load` builds a brand-new index; the previous document's stores are
//! dropped before extraction starts, so a failed load leaves the session
//! not ready rather than answering from stale content.
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use mmrag_core::{
    Embedder, FragmentExtractor, IndexWriteError, LanguageModel, LoadError, NotReadyError, QueryError,
    RetrievalResult, Settings, SummarizationError,
};
use mmrag_index::{DualStoreIndex, SummaryBackend};

use crate::assembler::assemble;
use crate::generation::GenerationChain;
use crate::retriever::Retriever;
use crate::summarizer::Summarizer;

/// What a successful `load` did.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// blake3 hex digest of the document bytes.
    pub digest: String,
    pub loaded_at: DateTime<Utc>,
    pub fragments: usize,
    pub skipped: usize,
    pub indexed: usize,
    pub summarization_failures: Vec<SummarizationError>,
    pub index_failures: Vec<IndexWriteError>,
}

#[derive(Debug, Clone)]
pub struct QueryAnswer {
    pub question: String,
    pub answer: String,
    pub retrieved: RetrievalResult,
}

struct Loaded {
    index: DualStoreIndex,
    report: LoadReport,
}

pub struct Session {
    extractor: Arc<dyn FragmentExtractor>,
    summarizer: Summarizer,
    embedder: Arc<dyn Embedder>,
    backend: SummaryBackend,
    retriever: Retriever,
    generation: GenerationChain,
    call_timeout: Duration,
    loaded: Option<Loaded>,
}

impl Session {
    pub fn new(
        settings: &Settings,
        extractor: Arc<dyn FragmentExtractor>,
        summary_model: Arc<dyn LanguageModel>,
        answer_model: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let call_timeout = settings.timeouts.call_timeout();
        Self {
            extractor,
            summarizer: Summarizer::new(summary_model, settings.summarize.clone(), call_timeout),
            embedder,
            backend: SummaryBackend::from_settings(&settings.index),
            retriever: Retriever::new(settings.retrieval.k),
            generation: GenerationChain::new(answer_model, call_timeout),
            call_timeout,
            loaded: None,
        }
    }

    pub fn with_backend(mut self, backend: SummaryBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn report(&self) -> Option<&LoadReport> {
        self.loaded.as_ref().map(|l| &l.report)
    }

    pub fn index(&self) -> Option<&DualStoreIndex> {
        self.loaded.as_ref().map(|l| &l.index)
    }

    /// Discard the loaded document.
    pub fn reset(&mut self) {
        if self.loaded.take().is_some() {
            info!("session reset");
        }
    }

    /// Extract, summarize and index `document`, replacing whatever was loaded.
    pub async fn load(&mut self, document: &[u8]) -> Result<LoadReport, LoadError> {
        self.reset();
        let digest = blake3::hash(document).to_hex().to_string();
        let fragments = self.extractor.extract(document)?;
        let fragment_count = fragments.len();
        info!(%digest, fragments = fragment_count, "document extracted");

        let batch = self.summarizer.summarize_all(fragments).await;
        let store = self.backend.open(self.embedder.dim()).await?;
        let mut index = DualStoreIndex::new(store, Arc::clone(&self.embedder), self.call_timeout)?;
        let added = index.add(batch.summarized).await;

        let report = LoadReport {
            digest,
            loaded_at: Utc::now(),
            fragments: fragment_count,
            skipped: batch.skipped,
            indexed: added.indexed.len(),
            summarization_failures: batch.failures,
            index_failures: added.failures,
        };
        info!(
            indexed = report.indexed,
            summarization_failures = report.summarization_failures.len(),
            index_failures = report.index_failures.len(),
            embedder = index.embedder_id(),
            "document ready"
        );
        self.loaded = Some(Loaded { index, report: report.clone() });
        Ok(report)
    }

    pub async fn query(&self, question: &str) -> Result<QueryAnswer, QueryError> {
        self.query_with_k(question, self.retriever.k()).await
    }

    pub async fn query_with_k(&self, question: &str, k: usize) -> Result<QueryAnswer, QueryError> {
        let retrieved = self.retrieve(question, k).await?;
        let prompt = assemble(question, &retrieved);
        let answer = self.generation.generate(question, &prompt).await?;
        info!(texts = retrieved.texts.len(), images = retrieved.images.len(), "question answered");
        Ok(QueryAnswer { question: question.to_string(), answer, retrieved })
    }

    /// Retrieval only; no generation call.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<RetrievalResult, QueryError> {
        let loaded = self.loaded.as_ref().ok_or(NotReadyError)?;
        if question.trim().is_empty() {
            return Err(QueryError::EmptyQuestion);
        }
        Ok(self.retriever.retrieve_k(&loaded.index, question, k).await?)
    }
}
