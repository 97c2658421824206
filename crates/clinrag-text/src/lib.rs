//! clinrag-text
//!
//! Tantivy-backed BM25 keyword index over chunk records. `index` builds the
//! index (on disk or in RAM), `search` answers `SparseIndex` queries.
pub mod tantivy_utils;
pub mod index;
pub mod search;

pub use index::TantivyChunkIndexer;
pub use search::TantivySparseIndex;
