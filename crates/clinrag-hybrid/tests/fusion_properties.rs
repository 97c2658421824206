use std::collections::HashSet;

use clinrag_core::error::Error;
use clinrag_core::traits::{DenseIndex, Embedder, SparseIndex};
use clinrag_core::types::{ChunkRecord, ScoredHit, SourceKind};
use clinrag_hybrid::{fuse_hits, max_normalize, FuseParams, HybridFuser};
use proptest::prelude::*;

fn chunk(id: &str) -> ChunkRecord {
    ChunkRecord { doc_id: "guide.pdf".to_string(), title: "guide".to_string(), page: 4, chunk_id: id.to_string(), text: format!("body {id}") }
}

fn hits(raw: &[(u8, f32)], dense: bool) -> Vec<ScoredHit> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter(|(id, _)| seen.insert(*id))
        .map(|(id, s)| { let c = chunk(&format!("c{id}")); if dense { ScoredHit::dense(c, *s) } else { ScoredHit::sparse(c, *s) } })
        .collect()
}

proptest! {
    #[test]
    fn normalize_keeps_length_and_unit_range(scores in proptest::collection::vec(-5.0f32..50.0, 0..30)) {
        let n = max_normalize(&scores);
        prop_assert_eq!(n.len(), scores.len());
        prop_assert!(n.iter().all(|v| (0.0..=1.0).contains(v)));
        let max_in = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if !scores.is_empty() {
            let max_out = n.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            if max_in > 0.0 { prop_assert_eq!(max_out, 1.0); } else { prop_assert!(n.iter().all(|v| *v == 0.0)); }
        }
    }

    #[test]
    fn single_signal_entries_score_from_one_component(
        dense in proptest::collection::vec((0u8..20, 0.0f32..1.0), 0..12),
        sparse in proptest::collection::vec((0u8..20, 0.0f32..30.0), 0..12),
        alpha in 0.0f32..=1.0,
        k_final in 1usize..15,
    ) {
        let dense = hits(&dense, true);
        let sparse = hits(&sparse, false);
        let dense_ids: HashSet<String> = dense.iter().map(|h| h.chunk.chunk_id.clone()).collect();
        let sparse_ids: HashSet<String> = sparse.iter().map(|h| h.chunk.chunk_id.clone()).collect();
        let fused = fuse_hits(dense, sparse, alpha, k_final);

        prop_assert!(fused.len() <= k_final);
        for w in fused.windows(2) { prop_assert!(w[0].score >= w[1].score); }
        for h in &fused {
            match (dense_ids.contains(&h.chunk_id), sparse_ids.contains(&h.chunk_id)) {
                (true, false) => { prop_assert_eq!(h.bm25_n, 0.0); prop_assert_eq!(h.score, alpha * h.vec_n); }
                (false, true) => { prop_assert_eq!(h.vec_n, 0.0); prop_assert_eq!(h.score, (1.0 - alpha) * h.bm25_n); }
                (true, true) => prop_assert_eq!(h.score, alpha * h.vec_n + (1.0 - alpha) * h.bm25_n),
                (false, false) => prop_assert!(false, "fused entry {} came from nowhere", h.chunk_id),
            }
        }
        let unique: HashSet<&str> = fused.iter().map(|h| h.chunk_id.as_str()).collect();
        prop_assert_eq!(unique.len(), fused.len());
    }

    #[test]
    fn fusion_is_deterministic(
        dense in proptest::collection::vec((0u8..10, 0.0f32..1.0), 0..10),
        sparse in proptest::collection::vec((0u8..10, 0.0f32..30.0), 0..10),
    ) {
        let a = fuse_hits(hits(&dense, true), hits(&sparse, false), 0.6, 5);
        let b = fuse_hits(hits(&dense, true), hits(&sparse, false), 0.6, 5);
        prop_assert_eq!(a, b);
    }
}

struct StaticDense(anyhow::Result<Vec<ScoredHit>>);

impl DenseIndex for StaticDense {
    async fn query(&self, _vector: &[f32], limit: usize) -> anyhow::Result<Vec<ScoredHit>> {
        match &self.0 {
            Ok(h) => Ok(h.iter().take(limit).cloned().collect()),
            Err(e) => Err(anyhow::anyhow!("{e}")),
        }
    }
}

struct StaticSparse(Vec<ScoredHit>);

impl SparseIndex for StaticSparse {
    fn query(&self, _text: &str, limit: usize) -> anyhow::Result<Vec<ScoredHit>> { Ok(self.0.iter().take(limit).cloned().collect()) }
}

struct UnitEmbedder;

impl Embedder for UnitEmbedder {
    fn dim(&self) -> usize { 2 }
    fn max_len(&self) -> usize { 64 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> { Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect()) }
}

#[tokio::test]
async fn fuser_respects_per_signal_limits() {
    let dense = StaticDense(Ok(vec![ScoredHit::dense(chunk("a"), 0.9), ScoredHit::dense(chunk("b"), 0.3)]));
    let sparse = StaticSparse(vec![ScoredHit::sparse(chunk("b"), 4.0), ScoredHit::sparse(chunk("c"), 2.0)]);
    let fuser = HybridFuser::new(dense, sparse, Box::new(UnitEmbedder));

    let params = FuseParams { k_vec: 1, k_bm25: 2, k_final: 5, alpha: 0.6 };
    let fused = fuser.fuse("question", &params).await.expect("fuse");
    let ids: Vec<&str> = fused.iter().map(|h| h.chunk_id.as_str()).collect();
    // a: 0.6, b: 0.4 (sparse only, dense limited to 1), c: 0.2
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(fused[1].vec_n, 0.0);
}

#[tokio::test]
async fn fuser_repeats_identically() {
    let fuser = HybridFuser::new(
        StaticDense(Ok(vec![ScoredHit::dense(chunk("x"), 0.5), ScoredHit::dense(chunk("y"), 0.5)])),
        StaticSparse(vec![ScoredHit::sparse(chunk("y"), 1.0), ScoredHit::sparse(chunk("z"), 1.0)]),
        Box::new(UnitEmbedder),
    );
    let first = fuser.fuse("q", &FuseParams::default()).await.expect("fuse");
    for _ in 0..5 { assert_eq!(fuser.fuse("q", &FuseParams::default()).await.expect("fuse"), first); }
}

#[tokio::test]
async fn dense_failure_surfaces_as_retrieval_error() {
    let fuser = HybridFuser::new(StaticDense(Err(anyhow::anyhow!("connection refused"))), StaticSparse(vec![]), Box::new(UnitEmbedder));
    let err = fuser.fuse("q", &FuseParams::default()).await.unwrap_err();
    assert!(matches!(err, Error::Retrieval { signal: SourceKind::Dense, ref message } if message.contains("connection refused")));
}
