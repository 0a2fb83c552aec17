//! mmrag-core
//!
//! Domain types, error taxonomy, configuration and the boundary traits shared
//! by the index, the embedders and the question pipeline.

pub mod config;
pub mod elements;
pub mod error;
pub mod extract;
pub mod traits;
pub mod types;

pub use config::{ChunkingConfig, Config, Settings};
pub use error::{
    CallError, ExtractionError, GenerationError, IndexWriteError, LoadError, NotReadyError, QueryError,
    RetrievalError, RetrievalGapError, StoreError, SummarizationError,
};
pub use extract::JsonElementExtractor;
pub use traits::{with_timeout, Embedder, FragmentExtractor, LanguageModel};
pub use types::{
    Fragment, FragmentKind, Identifier, Prompt, PromptPart, RetrievalResult, Retrieved, SummarizedFragment, Summary,
};
