//! Exact brute-force MIPS.
//!
//! Scores every item against every user in the original space. Serves as the
//! ground truth for the ball tree and as a baseline in benchmarks; for small
//! item sets it is also simply the faster choice.

use std::time::Instant;

use tracing::info;

use crate::ann::{IndexStats, MipsIndex};
use crate::matrix::Matrix;
use crate::mips::{check_dimensions, StageTimings, TopKLists};
use crate::simd;
use crate::topk::{BoundedTopK, Neighbor};
use crate::{MipsError, Result};

/// Top-k items for one query by exhaustive scan.
///
/// Same ordering contract as the tree path: descending score, ties by
/// ascending id.
pub fn top_k_naive(query: &[f64], items: &Matrix, k: usize) -> Vec<Neighbor> {
    let mut queue = BoundedTopK::new(k);
    for item in items.vectors() {
        queue.push(item.id, simd::dot(query, item.values));
    }
    queue.into_sorted_vec()
}

/// Exhaustive top-k for every user row.
///
/// Same argument checks and empty-family behavior as
/// [`compute_top_k`](crate::mips::compute_top_k), but never fails on
/// degenerate norms since nothing is normalized.
pub fn compute_top_k_naive(k: usize, users: &Matrix, items: &Matrix) -> Result<TopKLists> {
    if k == 0 {
        return Err(MipsError::InvalidArgument("k must be positive".to_string()));
    }
    if users.is_empty() {
        return Ok(TopKLists::default());
    }
    if items.is_empty() {
        return Ok(TopKLists::empty_lists(users.num_rows()));
    }
    check_dimensions(users, items)?;

    let start = Instant::now();
    let lists = users
        .vectors()
        .map(|u| Ok(top_k_naive(u.values, items, k)))
        .collect();
    let search = start.elapsed();
    info!(
        secs = search.as_secs_f64(),
        users = users.num_rows(),
        items = items.num_rows(),
        "scanned all pairs"
    );

    let mut results = TopKLists::from_lists(lists);
    results.timings = StageTimings {
        search,
        ..StageTimings::default()
    };
    Ok(results)
}

/// Brute-force index over a borrowed item matrix.
pub struct NaiveMips<'a> {
    items: &'a Matrix,
}

impl<'a> NaiveMips<'a> {
    pub fn new(items: &'a Matrix) -> Self {
        Self { items }
    }
}

impl MipsIndex for NaiveMips<'_> {
    fn search(&self, query: &[f64], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Err(MipsError::InvalidArgument("k must be positive".to_string()));
        }
        if query.len() != self.items.dimension() {
            return Err(MipsError::DimensionMismatch {
                user_dim: query.len(),
                item_dim: self.items.dimension(),
            });
        }
        if query.iter().any(|v| !v.is_finite()) {
            return Err(MipsError::InvalidArgument(
                "query contains non-finite values".to_string(),
            ));
        }
        Ok(top_k_naive(query, self.items, k))
    }

    fn num_items(&self) -> usize {
        self.items.num_rows()
    }

    fn dimension(&self) -> usize {
        self.items.dimension()
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            num_items: self.items.num_rows(),
            dimension: self.items.dimension(),
            size_bytes: self.items.as_slice().len() * std::mem::size_of::<f64>(),
            algorithm: "Naive".to_string(),
            tree: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concrete_scenario() {
        let items = Matrix::from_rows(vec![vec![4.0, 0.0], vec![0.0, 3.0], vec![2.0, 2.0]]).unwrap();
        let result = NaiveMips::new(&items).search(&[1.0, 1.0], 2).unwrap();
        assert_eq!(result, vec![Neighbor::new(0, 4.0), Neighbor::new(2, 4.0)]);
    }

    #[test]
    fn fewer_items_than_k() {
        let items = Matrix::from_rows(vec![vec![1.0], vec![-1.0]]).unwrap();
        let result = top_k_naive(&[2.0], &items, 10);
        assert_eq!(result, vec![Neighbor::new(0, 2.0), Neighbor::new(1, -2.0)]);
    }

    #[test]
    fn batch_checks_arguments() {
        let items = Matrix::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        let users = Matrix::from_rows(vec![vec![1.0, 2.0, 3.0]]).unwrap();
        assert!(compute_top_k_naive(1, &users, &items).is_err());
        assert!(compute_top_k_naive(0, &items, &items).is_err());
        let ok = compute_top_k_naive(1, &items, &items).unwrap();
        assert_eq!(ok.ids(0), Some(vec![0]));
    }

    #[test]
    fn empty_families_ignore_dimension() {
        let items = Matrix::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        let no_rows = Matrix::from_rows(vec![]).unwrap();
        assert!(compute_top_k_naive(2, &no_rows, &items).unwrap().is_empty());
        let lists = compute_top_k_naive(2, &items, &no_rows).unwrap();
        assert_eq!(lists.ids(0), Some(Vec::new()));
    }

    #[test]
    fn validates_query() {
        let items = Matrix::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        let index = NaiveMips::new(&items);
        assert!(index.search(&[1.0], 1).is_err());
        assert!(index.search(&[1.0, 1.0], 0).is_err());
    }
}
