//! Cosine similarity and deterministic top-k selection

use super::sparse::SparseVec;
use std::cmp::Ordering;

/// Cosine similarity between two sparse vectors of the same space.
///
/// Zero when either vector has zero norm. Clamped to [-1, 1] to absorb
/// rounding.
pub fn sparse_cosine(a: &SparseVec<'_>, b: &SparseVec<'_>) -> f64 {
    let norm_a = a.norm();
    let norm_b = b.norm();
    cosine_from_parts(a.dot(b), norm_a, norm_b)
}

/// Cosine from a precomputed dot product and norms
pub fn cosine_from_parts(dot: f64, norm_a: f64, norm_b: f64) -> f64 {
    if norm_a == 0.0 || norm_b == 0.0 || !dot.is_finite() {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// The `k` highest-scoring `(index, score)` pairs.
///
/// Ordered by score descending, then index ascending, so equal inputs always
/// give equal outputs regardless of iteration order.
pub fn top_k(scores: impl IntoIterator<Item = (usize, f64)>, k: usize) -> Vec<(usize, f64)> {
    let mut scored: Vec<(usize, f64)> = scores
        .into_iter()
        .filter(|(_, s)| s.is_finite())
        .collect();
    scored.sort_by(rank_desc);
    scored.truncate(k);
    scored
}

fn rank_desc(a: &(usize, f64), b: &(usize, f64)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(&b.0))
}
