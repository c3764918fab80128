//! Map augmented-space results back to original inner products.

use crate::matrix::Matrix;
use crate::simd;
use crate::topk::{BoundedTopK, Neighbor};

/// Turn a finished queue into a ranked list of exact original-space scores.
///
/// Scores are recomputed as `<user, items[id]>` from the untransformed
/// vectors rather than rescaled, so the normalization constants add no
/// rounding error. Output is ordered by descending score, ties by ascending
/// id, and holds at most `queue.capacity()` entries: near misses kept by a
/// slack queue compete on their exact scores and the losers are cut.
pub fn recover(queue: BoundedTopK, user: &[f64], items: &Matrix) -> Vec<Neighbor> {
    let k = queue.capacity();
    let mut ranked: Vec<Neighbor> = queue
        .into_sorted_vec()
        .into_iter()
        .map(|n| Neighbor::new(n.id, simd::dot(user, items.row(n.id as usize))))
        .collect();
    ranked.sort_by(Neighbor::rank_cmp);
    ranked.truncate(k);
    ranked
}

/// Like [`recover`], but for callers that no longer hold the original items.
///
/// Multiplies each augmented score by `scale = max_user_norm * max_item_norm`.
/// The result carries the rounding of the normalization on top of the
/// search's own arithmetic.
pub fn recover_rescaled(queue: BoundedTopK, scale: f64) -> Vec<Neighbor> {
    let k = queue.capacity();
    let mut ranked: Vec<Neighbor> = queue
        .into_sorted_vec()
        .into_iter()
        .map(|n| Neighbor::new(n.id, n.score * scale))
        .collect();
    ranked.sort_by(Neighbor::rank_cmp);
    ranked.truncate(k);
    ranked
}
