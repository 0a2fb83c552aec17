//! mmrag-index
//!
//! Dual-store index: summary embeddings in a similarity-searchable store
//! (exact in-memory or LanceDB), original fragments in an exact-key store.

pub mod backend;
pub mod content;
pub mod dual;
pub mod flat;
pub mod lance;
pub mod schema;
pub mod store;

pub use backend::SummaryBackend;
pub use content::ContentStore;
pub use dual::{AddReport, DualStoreIndex, SearchHit};
pub use flat::FlatSummaryStore;
pub use lance::LanceSummaryStore;
pub use store::{Neighbor, SummaryEntry, SummaryStore};
