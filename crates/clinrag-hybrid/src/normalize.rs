//! Per-signal score normalization.

/// Max-normalize raw scores of one retrieval signal onto [0,1].
///
/// The top positive score maps to exactly 1.0 and zero stays zero. If the
/// maximum is not positive (e.g. BM25 with no token overlap) every output is
/// 0.0. Output length always equals input length.
pub fn max_normalize(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() || max <= 0.0 {
        return vec![0.0; scores.len()];
    }
    scores.iter().map(|s| { let n = s / max; if n.is_nan() { 0.0 } else { n.clamp(0.0, 1.0) } }).collect()
}
