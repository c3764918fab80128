//! Benchmark utilities: synthetic MIPS datasets, brute-force ground truth,
//! and recall metrics.

pub mod datasets;
pub mod metrics;

pub use datasets::{
    compute_ground_truth, create_clustered_dataset, create_uniform_dataset, MipsDataset,
};
pub use metrics::{mean_recall, recall_at_k};
