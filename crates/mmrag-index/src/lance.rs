//! LanceDB-backed summary store.
//!
//! Each store owns a private directory under the configured root that is
//! removed when the store is dropped, so a reload never sees stale rows.
use arrow_array::{Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, DistanceType, Table};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::debug;

use mmrag_core::{Identifier, StoreError};

use crate::schema::{build_summary_schema, SUMMARY_TABLE};
use crate::store::{check_dim, sort_neighbors, Neighbor, SummaryEntry, SummaryStore};

fn backend<E: std::fmt::Display>(e: E) -> StoreError {
	StoreError::Backend(e.to_string())
}

pub struct LanceSummaryStore {
	table: Table,
	dim: usize,
	rows: usize,
	next_seq: u64,
	// Dropped last: the table must be released before its directory goes.
	dir: TempDir,
}

impl LanceSummaryStore {
	pub async fn create(root: &Path, dim: usize) -> Result<Self, StoreError> {
		std::fs::create_dir_all(root).map_err(backend)?;
		let dir = tempfile::Builder::new().prefix("summaries-").tempdir_in(root).map_err(backend)?;
		let db = connect(dir.path().to_string_lossy().as_ref()).execute().await.map_err(backend)?;
		let schema = build_summary_schema(dim);
		// create empty table with 0 rows
		let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
		let table = db.create_table(SUMMARY_TABLE, Box::new(iter)).execute().await.map_err(backend)?;
		debug!(path = %dir.path().display(), dim, "created lance summary table");
		Ok(Self { table, dim, rows: 0, next_seq: 0, dir })
	}

	pub fn path(&self) -> &Path {
		self.dir.path()
	}

	fn entries_to_record_batch(&self, entries: &[SummaryEntry]) -> Result<RecordBatch, StoreError> {
		let mut seqs = Vec::with_capacity(entries.len());
		let mut source_ids = Vec::with_capacity(entries.len());
		let mut texts = Vec::with_capacity(entries.len());
		let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(entries.len());
		for (i, e) in entries.iter().enumerate() {
			seqs.push((self.next_seq + i as u64) as i64);
			source_ids.push(e.summary.source_id.to_string());
			texts.push(e.summary.text.clone());
			vectors.push(Some(e.vector.iter().map(|&x| Some(x)).collect()));
		}
		RecordBatch::try_new(
			build_summary_schema(self.dim),
			vec![
				Arc::new(Int64Array::from(seqs)),
				Arc::new(StringArray::from(source_ids)),
				Arc::new(StringArray::from(texts)),
				Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
					vectors.into_iter(),
					self.dim as i32,
				)),
			],
		)
		.map_err(backend)
	}
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, StoreError> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<StringArray>())
		.ok_or_else(|| StoreError::Backend(format!("summaries.{name} column missing")))
}

fn parse_source_id(raw: &str) -> Result<Identifier, StoreError> {
	Identifier::parse(raw).ok_or_else(|| StoreError::Backend(format!("malformed source_id {raw:?}")))
}

#[async_trait]
impl SummaryStore for LanceSummaryStore {
	fn dim(&self) -> usize {
		self.dim
	}

	fn len(&self) -> usize {
		self.rows
	}

	async fn insert(&mut self, entries: Vec<SummaryEntry>) -> Result<(), StoreError> {
		if entries.is_empty() {
			return Ok(());
		}
		for e in &entries {
			check_dim(self.dim, e.vector.len())?;
		}
		let record_batch = self.entries_to_record_batch(&entries)?;
		let schema = record_batch.schema();
		// A single batch is committed as one table version.
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
		self.table.add(reader).execute().await.map_err(backend)?;
		self.rows += entries.len();
		self.next_seq += entries.len() as u64;
		Ok(())
	}

	async fn nearest(&self, query: &[f32], limit: usize) -> Result<Vec<Neighbor>, StoreError> {
		check_dim(self.dim, query.len())?;
		if self.rows == 0 || limit == 0 {
			return Ok(Vec::new());
		}
		// Scan every row: LanceDB's own top-k picks arbitrarily among tied
		// distances, and ties must resolve by insertion order.
		let mut stream = self
			.table
			.vector_search(query.to_vec())
			.map_err(backend)?
			.distance_type(DistanceType::Cosine)
			.limit(self.rows)
			.execute()
			.await
			.map_err(backend)?;
		let mut neighbors = Vec::new();
		while let Some(batch) = TryStreamExt::try_next(&mut stream).await.map_err(backend)? {
			let ids = string_column(&batch, "source_id")?;
			let seqs = batch
				.column_by_name("seq")
				.and_then(|c| c.as_any().downcast_ref::<Int64Array>())
				.ok_or_else(|| StoreError::Backend("summaries.seq column missing".into()))?;
			let distances = batch
				.column_by_name("_distance")
				.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
				.ok_or_else(|| StoreError::Backend("_distance column missing".into()))?;
			for i in 0..batch.num_rows() {
				let distance = if distances.is_null(i) { 1.0 } else { distances.value(i) };
				neighbors.push(Neighbor {
					source_id: parse_source_id(ids.value(i))?,
					distance,
					seq: seqs.value(i) as u64,
				});
			}
		}
		sort_neighbors(&mut neighbors);
		neighbors.truncate(limit);
		Ok(neighbors)
	}

	async fn source_ids(&self) -> Result<Vec<Identifier>, StoreError> {
		let mut stream = self.table.query().execute().await.map_err(backend)?;
		let mut ids = Vec::with_capacity(self.rows);
		while let Some(batch) = TryStreamExt::try_next(&mut stream).await.map_err(backend)? {
			let col = string_column(&batch, "source_id")?;
			for i in 0..batch.num_rows() {
				ids.push(parse_source_id(col.value(i))?);
			}
		}
		Ok(ids)
	}
}
