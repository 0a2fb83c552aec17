use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const SUMMARY_TABLE: &str = "summaries";

/// Summary rows: insertion sequence, owning fragment, summary text, embedding.
pub fn build_summary_schema(dim: usize) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("seq", DataType::Int64, false),
		Field::new("source_id", DataType::Utf8, false),
		Field::new("text", DataType::Utf8, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim as i32), true),
	]))
}
