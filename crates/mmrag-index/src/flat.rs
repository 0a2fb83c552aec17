use async_trait::async_trait;

use mmrag_core::{Identifier, StoreError};

use crate::store::{check_dim, sort_neighbors, Neighbor, SummaryEntry, SummaryStore};

struct Row {
    seq: u64,
    source_id: Identifier,
    vector: Vec<f32>,
    norm: f32,
}

/// Exact in-memory cosine-distance store.
pub struct FlatSummaryStore {
    dim: usize,
    rows: Vec<Row>,
    next_seq: u64,
}

impl FlatSummaryStore {
    pub fn new(dim: usize) -> Self {
        Self { dim, rows: Vec::new(), next_seq: 0 }
    }
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine_distance(query: &[f32], query_norm: f32, row: &Row) -> f32 {
    if query_norm == 0.0 || row.norm == 0.0 {
        return 1.0;
    }
    let dot: f32 = query.iter().zip(&row.vector).map(|(a, b)| a * b).sum();
    1.0 - dot / (query_norm * row.norm)
}

#[async_trait]
impl SummaryStore for FlatSummaryStore {
    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    async fn insert(&mut self, entries: Vec<SummaryEntry>) -> Result<(), StoreError> {
        for e in &entries {
            check_dim(self.dim, e.vector.len())?;
        }
        for e in entries {
            let norm = norm(&e.vector);
            self.rows.push(Row { seq: self.next_seq, source_id: e.summary.source_id, vector: e.vector, norm });
            self.next_seq += 1;
        }
        Ok(())
    }

    async fn nearest(&self, query: &[f32], limit: usize) -> Result<Vec<Neighbor>, StoreError> {
        check_dim(self.dim, query.len())?;
        let query_norm = norm(query);
        let mut neighbors: Vec<Neighbor> = self
            .rows
            .iter()
            .map(|row| Neighbor { source_id: row.source_id, distance: cosine_distance(query, query_norm, row), seq: row.seq })
            .collect();
        sort_neighbors(&mut neighbors);
        neighbors.truncate(limit);
        Ok(neighbors)
    }

    async fn source_ids(&self) -> Result<Vec<Identifier>, StoreError> {
        Ok(self.rows.iter().map(|r| r.source_id).collect())
    }
}
