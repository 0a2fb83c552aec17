use async_trait::async_trait;

use mmrag_core::{Identifier, StoreError, Summary};

/// A summary and its embedding, ready to be written.
#[derive(Debug, Clone)]
pub struct SummaryEntry {
    pub summary: Summary,
    pub vector: Vec<f32>,
}

/// One nearest-neighbour result. `seq` is the store-assigned insertion number.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub source_id: Identifier,
    pub distance: f32,
    pub seq: u64,
}

/// Similarity-searchable store of summary embeddings.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    fn dim(&self) -> usize;

    /// Number of summary entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write all entries or none of them.
    async fn insert(&mut self, entries: Vec<SummaryEntry>) -> Result<(), StoreError>;

    /// Up to `limit` entries by ascending distance; equal distances keep
    /// insertion order.
    async fn nearest(&self, query: &[f32], limit: usize) -> Result<Vec<Neighbor>, StoreError>;

    /// Source identifiers of every stored summary.
    async fn source_ids(&self) -> Result<Vec<Identifier>, StoreError>;
}

pub(crate) fn check_dim(expected: usize, actual: usize) -> Result<(), StoreError> {
    if expected == actual {
        Ok(())
    } else {
        Err(StoreError::Dimension { expected, actual })
    }
}

pub(crate) fn sort_neighbors(neighbors: &mut [Neighbor]) {
    neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.seq.cmp(&b.seq)));
}
