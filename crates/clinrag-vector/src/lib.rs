//! clinrag-vector
//!
//! LanceDB-backed dense index over chunk embeddings: `writer` stores chunk
//! records with their vectors, `search` answers `DenseIndex` queries with
//! cosine similarity.
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use search::LanceDenseIndex;
pub use writer::LanceChunkWriter;
