use std::collections::{HashMap, HashSet};
use tracing::debug;

use clinrag_core::config::RetrievalSettings;
use clinrag_core::error::{Error, Result};
use clinrag_core::traits::{DenseIndex, Embedder, SparseIndex};
use clinrag_core::types::{FusedHit, ScoredHit, SourceKind};

use crate::normalize::max_normalize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuseParams {
    pub k_vec: usize,
    pub k_bm25: usize,
    pub k_final: usize,
    /// Dense weight in [0,1]; BM25 gets `1 - alpha`.
    pub alpha: f32,
}

impl Default for FuseParams {
    fn default() -> Self { Self::from(&RetrievalSettings::default()) }
}

impl From<&RetrievalSettings> for FuseParams {
    fn from(r: &RetrievalSettings) -> Self {
        Self { k_vec: r.k_vec, k_bm25: r.k_bm25, k_final: r.k_final, alpha: r.alpha }
    }
}

/// Dense hits without a chunk id cannot be joined against BM25 results; they
/// are kept under their dense rank instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MergeKey {
    Chunk(String),
    AnonymousDense(usize),
}

/// Merge one dense and one sparse result list into a ranked fused list.
///
/// Each list is max-normalized on its own. Entries are seeded from the dense
/// list in rank order; sparse hits either fill in `bm25_n` of an existing
/// entry or append a new one with `vec_n = 0`. Sparse hits with an empty
/// `chunk_id` are dropped. The final sort is stable, so ties keep
/// dense-then-sparse insertion order.
pub fn fuse_hits(dense: Vec<ScoredHit>, sparse: Vec<ScoredHit>, alpha: f32, k_final: usize) -> Vec<FusedHit> {
    let dense_n = max_normalize(&dense.iter().map(|h| h.score).collect::<Vec<_>>());
    let sparse_n = max_normalize(&sparse.iter().map(|h| h.score).collect::<Vec<_>>());

    let mut fused: Vec<FusedHit> = Vec::with_capacity(dense.len() + sparse.len());
    let mut slot: HashMap<MergeKey, usize> = HashMap::new();

    for (rank, (hit, vec_n)) in dense.into_iter().zip(dense_n).enumerate() {
        let key = if hit.chunk.chunk_id.is_empty() { MergeKey::AnonymousDense(rank) } else { MergeKey::Chunk(hit.chunk.chunk_id.clone()) };
        // A repeated id within one signal keeps its best-ranked occurrence.
        if slot.contains_key(&key) { continue; }
        slot.insert(key, fused.len());
        fused.push(FusedHit::from_chunk(hit.chunk, vec_n, 0.0));
    }

    let mut sparse_seen: HashSet<String> = HashSet::new();
    for (hit, bm25_n) in sparse.into_iter().zip(sparse_n) {
        if hit.chunk.chunk_id.is_empty() { continue; }
        if !sparse_seen.insert(hit.chunk.chunk_id.clone()) { continue; }
        let key = MergeKey::Chunk(hit.chunk.chunk_id.clone());
        match slot.get(&key) {
            Some(&i) => fused[i].bm25_n = bm25_n,
            None => {
                slot.insert(key, fused.len());
                fused.push(FusedHit::from_chunk(hit.chunk, 0.0, bm25_n));
            }
        }
    }

    for h in &mut fused { h.score = alpha * h.vec_n + (1.0 - alpha) * h.bm25_n; }
    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    fused.truncate(k_final);
    fused
}

/// Runs both retrieval signals for a question and fuses them.
pub struct HybridFuser<D, S> where D: DenseIndex, S: SparseIndex {
    dense: D,
    sparse: S,
    embedder: Box<dyn Embedder>,
}

impl<D, S> HybridFuser<D, S> where D: DenseIndex, S: SparseIndex {
    pub fn new(dense: D, sparse: S, embedder: Box<dyn Embedder>) -> Self { Self { dense, sparse, embedder } }

    async fn dense_hits(&self, question: &str, k: usize) -> Result<Vec<ScoredHit>> {
        if k == 0 { return Ok(Vec::new()); }
        let q_vec = self.embedder.embed_query(question).map_err(|e| Error::retrieval(SourceKind::Dense, e))?;
        self.dense.query(&q_vec, k).await.map_err(|e| Error::retrieval(SourceKind::Dense, e))
    }

    async fn sparse_hits(&self, question: &str, k: usize) -> Result<Vec<ScoredHit>> {
        if k == 0 { return Ok(Vec::new()); }
        self.sparse.query(question, k).map_err(|e| Error::retrieval(SourceKind::Sparse, e))
    }

    /// Fused, ranked evidence candidates for `question`, at most `k_final`.
    ///
    /// An empty result means no evidence, not an error. Index failures
    /// surface as `Error::Retrieval`.
    pub async fn fuse(&self, question: &str, params: &FuseParams) -> Result<Vec<FusedHit>> {
        let (dense, sparse) = tokio::join!(self.dense_hits(question, params.k_vec), self.sparse_hits(question, params.k_bm25));
        let (dense, sparse) = (dense?, sparse?);
        debug!(dense = dense.len(), sparse = sparse.len(), "retrieval signals collected");
        let fused = fuse_hits(dense, sparse, params.alpha, params.k_final);
        debug!(fused = fused.len(), top_score = fused.first().map(|h| h.score), "fused");
        Ok(fused)
    }
}
