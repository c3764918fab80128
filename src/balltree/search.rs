//! Branch-and-bound top-k search.

use smallvec::SmallVec;

use super::{AngularBallTree, NodeKind};
use crate::simd;
use crate::topk::BoundedTopK;
use crate::{MipsError, Result};

/// Work counters for one or more searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes_visited: usize,
    pub leaves_visited: usize,
    pub points_scored: usize,
    pub subtrees_pruned: usize,
    /// Prunes of a second child that was admissible when its parent was
    /// expanded and failed the re-check after its sibling's subtree.
    pub deferred_pruned: usize,
}

impl std::ops::AddAssign for SearchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes_visited += rhs.nodes_visited;
        self.leaves_visited += rhs.leaves_visited;
        self.points_scored += rhs.points_scored;
        self.subtrees_pruned += rhs.subtrees_pruned;
        self.deferred_pruned += rhs.deferred_pruned;
    }
}

enum Frame {
    /// Already admitted: expand unconditionally.
    Visit(u32),
    /// Second child of an expanded node. Its bound is re-tested against the
    /// threshold as it stands once the first child's subtree is done.
    Deferred { node: u32, bound: f64 },
}

impl AngularBallTree {
    /// Upper bound on `<query, p>` over every point `p` under `node`.
    #[inline]
    fn bound(&self, query: &[f64], node: u32) -> f64 {
        let n = self.node(node);
        simd::dot(query, &n.mean) + n.radius
    }

    /// Accumulate the best `queue.capacity()` points for `query` into `queue`.
    ///
    /// `query` must be a unit vector in the tree's (augmented) space. Scores
    /// pushed into the queue are augmented-space inner products. The queue
    /// may already hold candidates; they tighten pruning from the start.
    ///
    /// Depth-first, higher-bound child first. A child is skipped when the
    /// queue is full and its bound is below [`BoundedTopK::cutoff`]. The
    /// sibling visited second is checked only after the first subtree has
    /// been searched, so it benefits from everything found there.
    pub fn search(&self, query: &[f64], queue: &mut BoundedTopK) -> Result<SearchStats> {
        if query.len() != self.dimension {
            return Err(MipsError::InvalidArgument(format!(
                "query has {} dimensions, tree has {}",
                query.len(),
                self.dimension
            )));
        }

        let mut stats = SearchStats::default();
        let mut stack: SmallVec<[Frame; 64]> = SmallVec::new();
        stack.push(Frame::Visit(Self::ROOT));

        while let Some(frame) = stack.pop() {
            let node = match frame {
                Frame::Visit(node) => node,
                Frame::Deferred { node, bound } => {
                    if queue.is_full() && bound < queue.cutoff() {
                        stats.subtrees_pruned += 1;
                        stats.deferred_pruned += 1;
                        continue;
                    }
                    node
                }
            };
            stats.nodes_visited += 1;

            match self.node(node).kind {
                NodeKind::Leaf { start, len } => {
                    stats.leaves_visited += 1;
                    stats.points_scored += len as usize;
                    for slot in start as usize..(start + len) as usize {
                        let score = simd::dot(query, self.point(slot));
                        queue.push(self.ids[slot], score);
                    }
                }
                NodeKind::Internal { left, right } => {
                    let left_bound = self.bound(query, left);
                    let right_bound = self.bound(query, right);
                    let (first, second, second_bound) = if left_bound >= right_bound {
                        (left, right, right_bound)
                    } else {
                        (right, left, left_bound)
                    };
                    let first_bound = left_bound.max(right_bound);

                    if queue.is_full() && first_bound < queue.cutoff() {
                        // The better bound fails, so both children do.
                        stats.subtrees_pruned += 2;
                        continue;
                    }
                    stack.push(Frame::Deferred {
                        node: second,
                        bound: second_bound,
                    });
                    stack.push(Frame::Visit(first));
                }
            }
        }

        Ok(stats)
    }
}
