//! Agreement metrics between an index and exact ground truth.
//!
//! The ball tree is exact, so on any input these should be 1.0; they exist
//! to verify that claim on real data (`ipball --verify`) and in benches.

use std::collections::HashSet;

/// Fraction of the true top-k ids that were retrieved.
///
/// recall@k = |retrieved ∩ ground_truth| / min(k, |ground_truth|)
///
/// Dividing by `min(k, |ground_truth|)` keeps recall at 1.0 when fewer than
/// `k` items exist.
pub fn recall_at_k(ground_truth: &[u32], retrieved: &[u32], k: usize) -> f64 {
    let denom = k.min(ground_truth.len());
    if denom == 0 {
        return if retrieved.is_empty() { 1.0 } else { 0.0 };
    }

    let gt_set: HashSet<u32> = ground_truth.iter().take(k).copied().collect();
    let hits = retrieved
        .iter()
        .take(k)
        .filter(|id| gt_set.contains(id))
        .count();
    hits as f64 / denom as f64
}

/// Mean recall@k over paired ground-truth / retrieved lists.
pub fn mean_recall(ground_truths: &[Vec<u32>], retrievals: &[Vec<u32>], k: usize) -> f64 {
    if ground_truths.is_empty() {
        return 0.0;
    }
    let total: f64 = ground_truths
        .iter()
        .zip(retrievals)
        .map(|(gt, ret)| recall_at_k(gt, ret, k))
        .sum();
    total / ground_truths.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_and_partial_recall() {
        assert_eq!(recall_at_k(&[1, 2, 3], &[3, 2, 1], 3), 1.0);
        assert!((recall_at_k(&[1, 2, 3, 4], &[1, 2, 9, 8], 4) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn short_ground_truth() {
        assert_eq!(recall_at_k(&[7], &[7], 10), 1.0);
        assert_eq!(recall_at_k(&[], &[], 10), 1.0);
    }

    #[test]
    fn mean_over_queries() {
        let gt = vec![vec![1, 2], vec![3, 4]];
        let ret = vec![vec![1, 2], vec![3, 9]];
        assert!((mean_recall(&gt, &ret, 2) - 0.75).abs() < 1e-12);
    }
}
