//! clinrag-hybrid
//!
//! Fuses dense (vector) and sparse (BM25) retrieval into one ranked list:
//! `normalize` rescales each signal onto [0,1], `fuse` merges by chunk id and
//! mixes the two components with a fixed weight.
pub mod fuse;
pub mod normalize;

pub use fuse::{fuse_hits, FuseParams, HybridFuser};
pub use normalize::max_normalize;
