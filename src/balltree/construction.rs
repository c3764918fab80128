//! Ball tree construction.
//!
//! Per node with more than `leaf_capacity` points:
//!
//! 1. pick a random pivot,
//! 2. seed A = point angularly farthest from the pivot,
//! 3. seed B = point angularly farthest from A,
//! 4. send every other point to whichever seed it is angularly closer to
//!    (A's side on `cos(A, p) > cos(B, p)`).
//!
//! Three linear scans per node, no iterative refinement. The heuristic has
//! no balance guarantee, so construction runs off an explicit work stack and
//! falls back to a median split when a partition is too lopsided.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{AngularBallTree, BallTreeParams, Node, NodeKind, TreeStats};
use crate::simd;
use crate::transform::AugmentedMatrix;
use crate::{MipsError, Result};

/// Added to every radius so that rounding in the bound arithmetic never puts
/// a node's bound below a member's exactly computed score.
const RADIUS_SLACK: f64 = 1e-12;

/// Pending node: `ids[start..end]` are its members.
struct Task {
    node: u32,
    start: usize,
    end: usize,
    depth: usize,
}

impl AngularBallTree {
    /// Build a tree over every row of `items`.
    ///
    /// Rows must be unit vectors (as produced by
    /// [`augment`](crate::transform::augment)). The random source is created
    /// once per call and threaded through every split.
    pub fn build(items: &AugmentedMatrix, params: &BallTreeParams) -> Result<Self> {
        params.validate()?;
        if items.num_rows() == 0 {
            return Err(MipsError::InvalidArgument(
                "cannot build a ball tree over zero points".to_string(),
            ));
        }

        // Use an explicit seed when configured; otherwise derive one from entropy.
        let seed = params.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);

        let dimension = items.dimension();
        let mut ids: Vec<u32> = (0..items.num_rows() as u32).collect();
        let mut nodes: Vec<Node> = vec![placeholder()];
        let mut stats = TreeStats {
            num_points: ids.len(),
            min_leaf_size: usize::MAX,
            ..TreeStats::default()
        };

        let mut stack = vec![Task {
            node: AngularBallTree::ROOT,
            start: 0,
            end: ids.len(),
            depth: 0,
        }];

        while let Some(task) = stack.pop() {
            let members = &mut ids[task.start..task.end];
            let mean = centroid(items, members);
            let radius = ball_radius(items, members, &mean) + RADIUS_SLACK;
            stats.max_depth = stats.max_depth.max(task.depth);

            let kind = if members.len() <= params.leaf_capacity {
                stats.num_leaves += 1;
                stats.min_leaf_size = stats.min_leaf_size.min(members.len());
                stats.max_leaf_size = stats.max_leaf_size.max(members.len());
                NodeKind::Leaf {
                    start: task.start as u32,
                    len: members.len() as u32,
                }
            } else {
                let (mid, fell_back) =
                    split(items, members, params.min_split_fraction, &mut rng);
                if fell_back {
                    stats.median_splits += 1;
                }

                let left = nodes.len() as u32;
                let right = left + 1;
                nodes.push(placeholder());
                nodes.push(placeholder());

                let mid = task.start + mid;
                stack.push(Task {
                    node: right,
                    start: mid,
                    end: task.end,
                    depth: task.depth + 1,
                });
                stack.push(Task {
                    node: left,
                    start: task.start,
                    end: mid,
                    depth: task.depth + 1,
                });
                NodeKind::Internal { left, right }
            };

            nodes[task.node as usize] = Node { mean, radius, kind };
        }

        // Leaves own disjoint, contiguous ranges of `ids`; gather points in that order.
        let mut points = Vec::with_capacity(ids.len() * dimension);
        for &id in &ids {
            points.extend_from_slice(items.row(id as usize));
        }

        stats.num_nodes = nodes.len();
        debug!(
            seed,
            nodes = stats.num_nodes,
            leaves = stats.num_leaves,
            max_depth = stats.max_depth,
            median_splits = stats.median_splits,
            "ball tree built"
        );

        Ok(Self {
            nodes,
            ids,
            points,
            dimension,
            stats,
        })
    }
}

fn placeholder() -> Node {
    Node {
        mean: Vec::new(),
        radius: 0.0,
        kind: NodeKind::Leaf { start: 0, len: 0 },
    }
}

/// Arithmetic mean of the member rows.
fn centroid(items: &AugmentedMatrix, members: &[u32]) -> Vec<f64> {
    let mut mean = vec![0.0; items.dimension()];
    for &id in members {
        for (m, x) in mean.iter_mut().zip(items.row(id as usize)) {
            *m += x;
        }
    }
    let count = members.len() as f64;
    for m in &mut mean {
        *m /= count;
    }
    mean
}

/// Largest Euclidean distance from `mean` to any member.
fn ball_radius(items: &AugmentedMatrix, members: &[u32], mean: &[f64]) -> f64 {
    members
        .iter()
        .map(|&id| simd::l2_distance(items.row(id as usize), mean))
        .fold(0.0, f64::max)
}

/// Position (within `members`) of the point least similar to `anchor`,
/// skipping position `skip`. Rows are unit length, so the dot product is the
/// cosine.
fn farthest_from(items: &AugmentedMatrix, members: &[u32], anchor: &[f64], skip: usize) -> usize {
    let mut best = usize::MAX;
    let mut min_cos = f64::INFINITY;
    for (pos, &id) in members.iter().enumerate() {
        if pos == skip {
            continue;
        }
        let cos = simd::dot(anchor, items.row(id as usize));
        if cos < min_cos || best == usize::MAX {
            best = pos;
            min_cos = cos;
        }
    }
    best
}

/// Partition `members` in place: left side first. Returns the split point
/// and whether the median fallback was used.
///
/// Requires `members.len() >= 2`; both sides always end up non-empty.
fn split(
    items: &AugmentedMatrix,
    members: &mut [u32],
    min_split_fraction: f64,
    rng: &mut StdRng,
) -> (usize, bool) {
    let n = members.len();
    let pivot = rng.random_range(0..n);
    let a = farthest_from(items, members, items.row(members[pivot] as usize), pivot);
    let b = farthest_from(items, members, items.row(members[a] as usize), a);

    let seed_a = items.row(members[a] as usize);
    let seed_b = items.row(members[b] as usize);

    // Preference for A's side; the seeds themselves are pinned to their side.
    let mut keyed: Vec<(f64, u32)> = Vec::with_capacity(n);
    let mut left_count = 0;
    for (pos, &id) in members.iter().enumerate() {
        let key = if pos == a {
            f64::INFINITY
        } else if pos == b {
            f64::NEG_INFINITY
        } else {
            let row = items.row(id as usize);
            simd::dot(seed_a, row) - simd::dot(seed_b, row)
        };
        if key > 0.0 {
            left_count += 1;
        }
        keyed.push((key, id));
    }

    let min_side = ((min_split_fraction * n as f64).ceil() as usize).max(1);
    let lopsided = left_count < min_side || n - left_count < min_side;

    let mid = if lopsided {
        keyed.sort_by(|x, y| y.0.total_cmp(&x.0).then_with(|| x.1.cmp(&y.1)));
        n / 2
    } else {
        // Stable partition: A-side first, original order within each side.
        keyed.sort_by_key(|&(key, _)| !(key > 0.0));
        left_count
    };

    for (slot, (_, id)) in members.iter_mut().zip(keyed) {
        *slot = id;
    }
    (mid, lopsided)
}
