//! The dual-store index: a similarity-searchable summary store coupled to an
//! exact-key content store through a minted [`Identifier`].
//!
//! Invariant: every identifier in the summary store has a content entry.
//! `add` stages the content entry, writes the summaries, and un-stages the
//! content entry if the summary write fails or is cancelled.
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use mmrag_core::{
    with_timeout, CallError, Embedder, Fragment, Identifier, IndexWriteError, RetrievalGapError, StoreError,
    SummarizedFragment, Summary,
};

use crate::content::{ContentStore, PendingContent};
use crate::flat::FlatSummaryStore;
use crate::store::{SummaryEntry, SummaryStore};

/// Outcome of a batch `add`: identifiers of committed pairs in input order,
/// plus one error per pair that was not committed.
#[derive(Debug, Default)]
pub struct AddReport {
    pub indexed: Vec<Identifier>,
    pub failures: Vec<IndexWriteError>,
}

/// A deduplicated search result with the distance of its nearest summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub id: Identifier,
    pub distance: f32,
}

pub struct DualStoreIndex {
    embedder: Arc<dyn Embedder>,
    summaries: Box<dyn SummaryStore>,
    content: ContentStore,
    call_timeout: Duration,
    /// Largest number of summaries any one fragment holds.
    fanout: usize,
}

impl DualStoreIndex {
    pub fn new(
        summaries: Box<dyn SummaryStore>,
        embedder: Arc<dyn Embedder>,
        call_timeout: Duration,
    ) -> Result<Self, StoreError> {
        if summaries.dim() != embedder.dim() {
            return Err(StoreError::Dimension { expected: summaries.dim(), actual: embedder.dim() });
        }
        Ok(Self { embedder, summaries, content: ContentStore::new(), call_timeout, fanout: 0 })
    }

    /// Index over an exact in-memory summary store.
    pub fn in_memory(embedder: Arc<dyn Embedder>, call_timeout: Duration) -> Self {
        let summaries = Box::new(FlatSummaryStore::new(embedder.dim()));
        Self { embedder, summaries, content: ContentStore::new(), call_timeout, fanout: 0 }
    }

    pub fn embedder_id(&self) -> &str {
        self.embedder.embedder_id()
    }

    /// Number of indexed fragments.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn summary_count(&self) -> usize {
        self.summaries.len()
    }

    /// Index every pair independently; a failed pair does not stop the batch.
    pub async fn add(&mut self, batch: Vec<SummarizedFragment>) -> AddReport {
        let mut report = AddReport::default();
        for item in batch {
            match self.add_one(item).await {
                Ok(id) => report.indexed.push(id),
                Err(e) => {
                    warn!(error = %e, "fragment not indexed");
                    report.failures.push(e);
                }
            }
        }
        debug!(indexed = report.indexed.len(), failed = report.failures.len(), "index add finished");
        report
    }

    /// Commit one fragment and its summaries, or nothing.
    pub async fn add_one(&mut self, item: SummarizedFragment) -> Result<Identifier, IndexWriteError> {
        let SummarizedFragment { fragment, summaries } = item;
        let origin_order = fragment.origin_order;
        let texts: Vec<String> = summaries.into_iter().filter(|s| !s.trim().is_empty()).collect();
        if texts.is_empty() {
            return Err(IndexWriteError::NoSummaries { origin_order });
        }

        let vectors = with_timeout(self.call_timeout, self.embedder.embed_batch(&texts))
            .await
            .map_err(|source| IndexWriteError::Embedding { origin_order, source })?;
        if vectors.len() != texts.len() {
            return Err(IndexWriteError::EmbeddingCount { origin_order, expected: texts.len(), actual: vectors.len() });
        }

        let id = Identifier::mint();
        let count = texts.len();
        let entries: Vec<SummaryEntry> = texts
            .into_iter()
            .zip(vectors)
            .map(|(text, vector)| SummaryEntry { summary: Summary { text, source_id: id }, vector })
            .collect();

        let pending = PendingContent::stage(&mut self.content, id, fragment);
        self.summaries
            .insert(entries)
            .await
            .map_err(|source| IndexWriteError::Store { origin_order, source })?;
        pending.commit();

        self.fanout = self.fanout.max(count);
        debug!(%id, origin_order, summaries = count, "indexed fragment");
        Ok(id)
    }

    /// Embed a question with the embedder the summaries were indexed with.
    pub async fn embed_query(&self, question: &str) -> Result<Vec<f32>, CallError> {
        let mut vectors = with_timeout(self.call_timeout, self.embedder.embed_batch(&[question.to_string()])).await?;
        match vectors.pop() {
            Some(v) if vectors.is_empty() => Ok(v),
            _ => Err(CallError::failed("embedder did not return exactly one vector for the question")),
        }
    }

    /// Identifiers of the `k` nearest distinct fragments, nearest first.
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<Identifier>, StoreError> {
        Ok(self.search_scored(query, k).await?.into_iter().map(|h| h.id).collect())
    }

    pub async fn search_scored(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, StoreError> {
        if query.len() != self.summaries.dim() {
            return Err(StoreError::Dimension { expected: self.summaries.dim(), actual: query.len() });
        }
        if k == 0 || self.summaries.is_empty() {
            return Ok(Vec::new());
        }
        // Enough summaries to cover k fragments even if each nearest
        // fragment contributes all of its summaries.
        let limit = k.saturating_mul(self.fanout.max(1));
        let neighbors = self.summaries.nearest(query, limit).await?;
        let mut seen = HashSet::new();
        let mut hits = Vec::with_capacity(k);
        for n in neighbors {
            if seen.insert(n.source_id) {
                hits.push(SearchHit { id: n.source_id, distance: n.distance });
                if hits.len() == k {
                    break;
                }
            }
        }
        Ok(hits)
    }

    /// Look up the original fragment for an identifier.
    pub fn resolve(&self, id: &Identifier) -> Result<&Fragment, RetrievalGapError> {
        self.content.get(id).ok_or(RetrievalGapError { id: *id })
    }

    /// Summary-store identifiers without a content entry. Empty while the
    /// coupling invariant holds.
    pub async fn dangling_ids(&self) -> Result<Vec<Identifier>, StoreError> {
        let mut seen = HashSet::new();
        Ok(self
            .summaries
            .source_ids()
            .await?
            .into_iter()
            .filter(|id| !self.content.contains(id) && seen.insert(*id))
            .collect())
    }
}
