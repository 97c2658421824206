//! Domain types shared by the retrieval and answering crates.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type ChunkId = String;

/// A chunk of a source document as produced by ingestion.
///
/// - `doc_id`: source document identity (e.g. the PDF file name)
/// - `title`: human readable document title
/// - `page`: 1-based page the chunk was extracted from
/// - `chunk_id`: corpus-unique identifier; the join key between the sparse
///   and dense indexes, which must store identical values for the same chunk
/// - `text`: the chunk payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub doc_id: String,
    #[serde(default)]
    pub title: String,
    pub page: u32,
    pub chunk_id: ChunkId,
    pub text: String,
}

/// Indicates which retrieval signal produced a hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Dense,
    Sparse,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Dense => f.write_str("dense"),
            SourceKind::Sparse => f.write_str("sparse"),
        }
    }
}

/// One raw hit from a single retrieval signal.
///
/// `score` is on the signal's own scale (cosine similarity, BM25, ...);
/// higher is always better. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredHit {
    pub chunk: ChunkRecord,
    pub score: f32,
    pub source: SourceKind,
}

impl ScoredHit {
    pub fn dense(chunk: ChunkRecord, score: f32) -> Self { Self { chunk, score, source: SourceKind::Dense } }
    pub fn sparse(chunk: ChunkRecord, score: f32) -> Self { Self { chunk, score, source: SourceKind::Sparse } }
}

/// A chunk after both signals have been normalized and mixed.
///
/// `vec_n` and `bm25_n` lie in [0,1]; a signal that did not return the chunk
/// contributes 0. `score = alpha * vec_n + (1 - alpha) * bm25_n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedHit {
    pub chunk_id: ChunkId,
    pub doc_id: String,
    pub title: String,
    pub page: u32,
    pub text: String,
    pub vec_n: f32,
    pub bm25_n: f32,
    pub score: f32,
}

impl FusedHit {
    pub fn from_chunk(chunk: ChunkRecord, vec_n: f32, bm25_n: f32) -> Self {
        Self {
            chunk_id: chunk.chunk_id,
            doc_id: chunk.doc_id,
            title: chunk.title,
            page: chunk.page,
            text: chunk.text,
            vec_n,
            bm25_n,
            score: 0.0,
        }
    }
}
