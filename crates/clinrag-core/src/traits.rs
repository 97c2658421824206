//! Seams to the external collaborators of the query pipeline.
//!
//! Every collaborator is read-only at query time, so implementations may be
//! shared across concurrent queries without locking.

use std::future::Future;

use crate::error::GenerationError;
use crate::types::ScoredHit;

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for query"))
    }
}

/// Nearest-neighbour search over chunk embeddings. Scores are similarities.
pub trait DenseIndex: Send + Sync {
    fn query(&self, vector: &[f32], limit: usize) -> impl Future<Output = anyhow::Result<Vec<ScoredHit>>> + Send;
}

/// Keyword ranking over the chunk corpus. Scores are unnormalized BM25.
pub trait SparseIndex: Send + Sync {
    fn query(&self, text: &str, limit: usize) -> anyhow::Result<Vec<ScoredHit>>;
}

/// A language model constrained to reply with a JSON object.
///
/// The returned value is untrusted; callers must validate it before use.
pub trait Generator: Send + Sync {
    fn complete(&self, system: &str, user: &str) -> impl Future<Output = Result<serde_json::Value, GenerationError>> + Send;
}
