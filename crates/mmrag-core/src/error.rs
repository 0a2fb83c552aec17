//! Error taxonomy. One type per operation so callers match on kind, never on
//! message text.

use std::time::Duration;
use thiserror::Error;

use crate::types::Identifier;

/// Failure of a single external call (model, embedding, generation).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("call failed: {0}")]
    Failed(String),
}

impl CallError {
    pub fn failed(msg: impl Into<String>) -> Self {
        CallError::Failed(msg.into())
    }

    /// Timeouts are transient; the caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CallError::Timeout(_))
    }
}

/// The source document could not be turned into fragments. Fatal to `load`.
#[derive(Debug, Clone, Error)]
#[error("could not extract fragments: {0}")]
pub struct ExtractionError(pub String);

/// Per-fragment summarization failure. The fragment is skipped.
#[derive(Debug, Clone, Error)]
pub enum SummarizationError {
    #[error("fragment {origin_order} has an empty payload")]
    EmptyPayload { origin_order: usize },

    #[error("summarizing fragment {origin_order} failed: {source}")]
    Call {
        origin_order: usize,
        #[source]
        source: CallError,
    },

    #[error("model returned an empty summary for fragment {origin_order}")]
    EmptySummary { origin_order: usize },
}

impl SummarizationError {
    pub fn origin_order(&self) -> usize {
        match self {
            SummarizationError::EmptyPayload { origin_order }
            | SummarizationError::Call { origin_order, .. }
            | SummarizationError::EmptySummary { origin_order } => *origin_order,
        }
    }
}

/// Failure inside a summary store backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("summary store backend error: {0}")]
    Backend(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },
}

/// A single (fragment, summaries) pair could not be committed. Neither half
/// of the pair is left in the index.
#[derive(Debug, Clone, Error)]
pub enum IndexWriteError {
    #[error("fragment {origin_order} has no summaries")]
    NoSummaries { origin_order: usize },

    #[error("embedding summaries of fragment {origin_order} failed: {source}")]
    Embedding {
        origin_order: usize,
        #[source]
        source: CallError,
    },

    #[error("embedder returned {actual} vectors for {expected} summaries of fragment {origin_order}")]
    EmbeddingCount { origin_order: usize, expected: usize, actual: usize },

    #[error("writing fragment {origin_order} to the summary store failed: {source}")]
    Store {
        origin_order: usize,
        #[source]
        source: StoreError,
    },
}

/// `query` was called before a successful `load`.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("no document is loaded; load a document before asking questions")]
pub struct NotReadyError;

/// A summary hit whose identifier has no content-store entry. Non-fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("identifier {id} has no entry in the content store")]
pub struct RetrievalGapError {
    pub id: Identifier,
}

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("embedding the question failed: {0}")]
    Embedding(#[source] CallError),

    #[error("summary search failed: {0}")]
    Store(#[from] StoreError),
}

/// The reasoning model failed or timed out. Carries the question so the
/// caller can retry it.
#[derive(Debug, Clone, Error)]
#[error("generation failed for question {question:?}: {diagnostic}")]
pub struct GenerationError {
    pub question: String,
    pub diagnostic: String,
    pub retryable: bool,
}

impl GenerationError {
    pub fn from_call(question: &str, err: &CallError) -> Self {
        Self { question: question.to_string(), diagnostic: err.to_string(), retryable: err.is_retryable() }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("could not open the summary store: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    NotReady(#[from] NotReadyError),

    #[error("question is empty")]
    EmptyQuestion,

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
