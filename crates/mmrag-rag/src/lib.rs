//! mmrag-rag
//!
//! The question pipeline over a loaded document: summarize fragments, index
//! the summaries, retrieve originals by modality, assemble a multimodal
//! prompt and generate an answer.

pub mod assembler;
pub mod generation;
pub mod retriever;
pub mod session;
pub mod summarizer;

pub use assembler::assemble;
pub use generation::GenerationChain;
pub use retriever::{partition, Retriever};
pub use session::{LoadReport, QueryAnswer, Session};
pub use summarizer::{SummaryBatch, Summarizer};
