use tracing::{debug, warn};

use mmrag_core::{FragmentKind, Identifier, RetrievalError, RetrievalResult, Retrieved};
use mmrag_index::DualStoreIndex;

/// Top-k retrieval over summaries, returning the original fragments.
#[derive(Debug, Clone, Copy)]
pub struct Retriever {
    k: usize,
}

impl Retriever {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub async fn retrieve(&self, index: &DualStoreIndex, question: &str) -> Result<RetrievalResult, RetrievalError> {
        self.retrieve_k(index, question, self.k).await
    }

    /// The question is embedded by the index itself, so query and summaries
    /// always share one embedding space.
    pub async fn retrieve_k(
        &self,
        index: &DualStoreIndex,
        question: &str,
        k: usize,
    ) -> Result<RetrievalResult, RetrievalError> {
        let query = index.embed_query(question).await.map_err(RetrievalError::Embedding)?;
        let ids = index.search(&query, k).await?;
        debug!(k, hits = ids.len(), "summary search");
        Ok(partition(index, &ids))
    }
}

/// Resolve identifiers and split them by modality, keeping nearest-first
/// order inside each group. Unresolvable identifiers are logged and recorded
/// as gaps.
pub fn partition(index: &DualStoreIndex, ids: &[Identifier]) -> RetrievalResult {
    let mut result = RetrievalResult::default();
    for id in ids {
        match index.resolve(id) {
            Ok(fragment) => {
                let retrieved = Retrieved { id: *id, fragment: fragment.clone() };
                match fragment.kind {
                    FragmentKind::Text | FragmentKind::Table => result.texts.push(retrieved),
                    FragmentKind::Image => result.images.push(retrieved),
                }
            }
            Err(gap) => {
                warn!(%id, "dropping dangling summary hit");
                result.gaps.push(gap);
            }
        }
    }
    result
}
