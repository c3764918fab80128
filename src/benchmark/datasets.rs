//! Synthetic user/item datasets for MIPS benchmarking.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::matrix::Matrix;
use crate::naive::top_k_naive;
use crate::Result;

/// A user (query) family and an item (database) family of equal dimension.
#[derive(Debug, Clone)]
pub struct MipsDataset {
    pub users: Matrix,
    pub items: Matrix,
}

impl MipsDataset {
    pub fn dimension(&self) -> usize {
        self.items.dimension()
    }

    /// Total memory footprint of raw vectors in bytes.
    pub fn memory_bytes(&self) -> usize {
        (self.users.as_slice().len() + self.items.as_slice().len()) * std::mem::size_of::<f64>()
    }
}

/// Uniform vectors in `[-1, 1]^d`.
///
/// Item norms vary naturally, which is what separates MIPS from cosine
/// search: long items win more queries.
pub fn create_uniform_dataset(
    n_users: usize,
    n_items: usize,
    dimension: usize,
    seed: u64,
) -> Result<MipsDataset> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sample = |n: usize| -> Vec<f64> {
        (0..n * dimension)
            .map(|_| rng.random::<f64>() * 2.0 - 1.0)
            .collect()
    };
    let users = sample(n_users);
    let items = sample(n_items);
    Ok(MipsDataset {
        users: Matrix::new(n_users, dimension, users)?,
        items: Matrix::new(n_items, dimension, items)?,
    })
}

/// Clustered vectors, closer to real embedding / factor-model data.
///
/// Draws `n_clusters` centers, samples points around them with Gaussian
/// noise (`cluster_std`), and scales each item by a random factor in
/// `[0.5, 2.0)` so item norms differ.
pub fn create_clustered_dataset(
    n_users: usize,
    n_items: usize,
    dimension: usize,
    n_clusters: usize,
    cluster_std: f64,
    seed: u64,
) -> Result<MipsDataset> {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_clusters = n_clusters.max(1);

    let centers: Vec<Vec<f64>> = (0..n_clusters)
        .map(|_| (0..dimension).map(|_| rng.random::<f64>() * 2.0 - 1.0).collect())
        .collect();

    let sample_near_center = |rng: &mut StdRng, center: &[f64]| -> Vec<f64> {
        center
            .iter()
            .map(|&c| {
                // Box-Muller for Gaussian
                let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
                let u2: f64 = rng.random();
                let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
                c + z * cluster_std
            })
            .collect()
    };

    let items: Vec<Vec<f64>> = (0..n_items)
        .map(|_| {
            let cluster = rng.random_range(0..n_clusters);
            let scale = 0.5 + rng.random::<f64>() * 1.5;
            sample_near_center(&mut rng, &centers[cluster])
                .into_iter()
                .map(|x| x * scale)
                .collect()
        })
        .collect();

    let users: Vec<Vec<f64>> = (0..n_users)
        .map(|_| {
            let cluster = rng.random_range(0..n_clusters);
            sample_near_center(&mut rng, &centers[cluster])
        })
        .collect();

    Ok(MipsDataset {
        users: Matrix::from_rows_with_dimension(users, dimension)?,
        items: Matrix::from_rows_with_dimension(items, dimension)?,
    })
}

/// Exact top-k item ids for every user, by brute force.
pub fn compute_ground_truth(dataset: &MipsDataset, k: usize) -> Vec<Vec<u32>> {
    dataset
        .users
        .vectors()
        .map(|u| {
            top_k_naive(u.values, &dataset.items, k)
                .into_iter()
                .map(|n| n.id)
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_shapes() {
        let ds = create_uniform_dataset(10, 100, 8, 42).unwrap();
        assert_eq!(ds.users.num_rows(), 10);
        assert_eq!(ds.items.num_rows(), 100);
        assert_eq!(ds.dimension(), 8);
        assert_eq!(ds.memory_bytes(), 110 * 8 * 8);
    }

    #[test]
    fn clustered_is_reproducible() {
        let a = create_clustered_dataset(5, 50, 4, 3, 0.1, 7).unwrap();
        let b = create_clustered_dataset(5, 50, 4, 3, 0.1, 7).unwrap();
        assert_eq!(a.items, b.items);
        assert_eq!(a.users, b.users);
    }

    #[test]
    fn ground_truth_has_k_per_user() {
        let ds = create_uniform_dataset(4, 30, 3, 1).unwrap();
        let gt = compute_ground_truth(&ds, 5);
        assert_eq!(gt.len(), 4);
        assert!(gt.iter().all(|ids| ids.len() == 5));
    }
}
