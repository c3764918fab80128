//! Angular ball tree over unit-sphere item vectors.
//!
//! **Technical Name**: Ball Tree with two-farthest-point angular splits
//!
//! Each node bounds its members by a centroid and a radius. For a unit query
//! `q` and any member `p`:
//!
//! ```text
//! <q, p> = <q, mean> + <q, p - mean> <= <q, mean> + |p - mean| <= <q, mean> + radius
//! ```
//!
//! so `<q, mean> + radius` is an admissible upper bound on the best score in
//! a subtree, and branch-and-bound search over it is exact.
//!
//! Nodes live in a flat arena (`Vec<Node>`) addressed by `u32` index. Leaf
//! members are stored contiguously in leaf order, so a leaf scan is a
//! sequential read of `len * dimension` floats.
//!
//! # References
//!
//! - Omohundro (1989): "Five balltree construction algorithms"
//! - Ram & Gray (2012): "Maximum inner-product search using cone trees"
//! - Bachrach et al. (2014): "Speeding up the Xbox recommender system using a
//!   Euclidean transformation for inner-product spaces"

mod construction;
mod search;

pub use search::SearchStats;

use serde::{Deserialize, Serialize};

use crate::{MipsError, Result};

/// Ball tree construction parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallTreeParams {
    /// Nodes with at most this many points become leaves.
    pub leaf_capacity: usize,

    /// Smallest acceptable share of points on either side of a split.
    ///
    /// When the farthest-point split is more lopsided than this, the node is
    /// re-split at the median instead. `0.0` disables the fallback.
    pub min_split_fraction: f64,

    /// Seed for pivot selection. `None` draws one from OS entropy per build.
    pub seed: Option<u64>,
}

impl Default for BallTreeParams {
    fn default() -> Self {
        Self {
            leaf_capacity: 20,
            min_split_fraction: 0.05,
            seed: None,
        }
    }
}

impl BallTreeParams {
    /// Configure a deterministic seed.
    ///
    /// Builds with the same seed over the same input produce identical trees.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_leaf_capacity(mut self, leaf_capacity: usize) -> Self {
        self.leaf_capacity = leaf_capacity;
        self
    }

    #[must_use]
    pub fn with_min_split_fraction(mut self, fraction: f64) -> Self {
        self.min_split_fraction = fraction;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.leaf_capacity == 0 {
            return Err(MipsError::InvalidArgument(
                "leaf_capacity must be at least 1".to_string(),
            ));
        }
        if !(0.0..0.5).contains(&self.min_split_fraction) {
            return Err(MipsError::InvalidArgument(format!(
                "min_split_fraction must be in [0, 0.5), got {}",
                self.min_split_fraction
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    /// Members are `ids[start..start + len]` / the matching rows of `points`.
    Leaf { start: u32, len: u32 },
    Internal { left: u32, right: u32 },
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) mean: Vec<f64>,
    pub(crate) radius: f64,
    pub(crate) kind: NodeKind,
}

/// Shape summary of a built tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub num_points: usize,
    pub num_nodes: usize,
    pub num_leaves: usize,
    pub max_depth: usize,
    pub min_leaf_size: usize,
    pub max_leaf_size: usize,
    /// Splits that fell back to the median rule.
    pub median_splits: usize,
}

/// Immutable ball tree over augmented item vectors.
///
/// Built once by [`AngularBallTree::build`]; afterwards it is only read, so
/// one tree can serve any number of concurrent queries.
#[derive(Debug, Clone)]
pub struct AngularBallTree {
    pub(crate) nodes: Vec<Node>,
    /// Original row id of each stored point, in leaf order.
    pub(crate) ids: Vec<u32>,
    /// Point coordinates in leaf order (`ids.len() * dimension`).
    pub(crate) points: Vec<f64>,
    pub(crate) dimension: usize,
    pub(crate) stats: TreeStats,
}

impl AngularBallTree {
    pub(crate) const ROOT: u32 = 0;

    /// Point dimension (the augmented `d + 2`).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn num_points(&self) -> usize {
        self.ids.len()
    }

    pub fn stats(&self) -> &TreeStats {
        &self.stats
    }

    #[inline]
    pub(crate) fn node(&self, idx: u32) -> &Node {
        &self.nodes[idx as usize]
    }

    #[inline]
    pub(crate) fn point(&self, slot: usize) -> &[f64] {
        let start = slot * self.dimension;
        &self.points[start..start + self.dimension]
    }

    /// Approximate heap footprint in bytes.
    pub fn size_bytes(&self) -> usize {
        let f = std::mem::size_of::<f64>();
        self.points.len() * f
            + self.ids.len() * std::mem::size_of::<u32>()
            + self
                .nodes
                .iter()
                .map(|n| std::mem::size_of::<Node>() + n.mean.len() * f)
                .sum::<usize>()
    }
}
