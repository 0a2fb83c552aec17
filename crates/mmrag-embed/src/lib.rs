//! mmrag-embed
//!
//! Local embedding functions behind [`mmrag_core::Embedder`]: a deterministic
//! hashing embedder and a candle BGE-M3 model.

use std::sync::Arc;
use thiserror::Error;

use mmrag_core::config::{EmbeddingProvider, EmbeddingSettings};
use mmrag_core::Embedder;

mod bge;
mod hash;
pub mod pool;
pub mod tokenize;

pub use bge::BgeM3Embedder;
pub use hash::HashEmbedder;
pub use pool::masked_mean_l2;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("unexpected tensor shape: {0}")]
    Shape(String),

    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("provider {0:?} is not a local embedder")]
    NotLocal(EmbeddingProvider),
}

/// Build the local embedder named by `settings.provider`.
pub fn local_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>, EmbedError> {
    match settings.provider {
        EmbeddingProvider::Hash => Ok(Arc::new(HashEmbedder::new(settings.dim))),
        EmbeddingProvider::BgeM3 => Ok(Arc::new(BgeM3Embedder::load(settings.model_dir.as_deref())?)),
        other => Err(EmbedError::NotLocal(other)),
    }
}
