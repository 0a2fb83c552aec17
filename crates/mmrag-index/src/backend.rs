use std::path::PathBuf;

use mmrag_core::config::{resolve_with_base, IndexBackend, IndexSettings};
use mmrag_core::StoreError;

use crate::flat::FlatSummaryStore;
use crate::lance::LanceSummaryStore;
use crate::store::SummaryStore;

/// Which summary store a fresh index is built on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryBackend {
	Memory,
	Lance { root: PathBuf },
}

impl SummaryBackend {
	pub fn from_settings(settings: &IndexSettings) -> Self {
		match settings.backend {
			IndexBackend::Memory => SummaryBackend::Memory,
			IndexBackend::Lance => {
				SummaryBackend::Lance { root: resolve_with_base(&std::env::temp_dir(), &settings.lance_dir) }
			}
		}
	}

	pub async fn open(&self, dim: usize) -> Result<Box<dyn SummaryStore>, StoreError> {
		match self {
			SummaryBackend::Memory => Ok(Box::new(FlatSummaryStore::new(dim))),
			SummaryBackend::Lance { root } => Ok(Box::new(LanceSummaryStore::create(root, dim).await?)),
		}
	}
}
