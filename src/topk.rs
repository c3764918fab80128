//! Fixed-capacity top-k accumulator.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

/// A scored item in a ranked result list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: u32,
    pub score: f64,
}

impl Neighbor {
    pub fn new(id: u32, score: f64) -> Self {
        Self { id, score }
    }

    /// Ranking order: higher score first, ties by ascending id.
    ///
    /// Scores are finite by construction; `-0.0` and `0.0` compare equal so
    /// the sign of a zero product never decides a tie.
    #[inline]
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Heap entry whose `Ord` puts the worst candidate on top of the max-heap.
#[derive(Clone, Copy)]
struct Worst(Neighbor);

impl PartialEq for Worst {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Worst {}

impl Ord for Worst {
    fn cmp(&self, other: &Self) -> Ordering {
        // Worse = lower score, then higher id. Same as rank order.
        self.0.rank_cmp(&other.0)
    }
}

impl PartialOrd for Worst {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Keeps the `k` best `(id, score)` pairs seen so far.
///
/// Backed by a binary heap with the current worst entry on top, so
/// [`threshold`](Self::threshold) is O(1) and insertion is O(log k).
/// Among equal scores the lower id wins, which makes the retained set
/// independent of insertion order.
///
/// With a positive slack the queue also holds on to candidates that miss
/// the heap by at most `slack`. Scores that are equal in exact arithmetic
/// can land on either side of the k-th score after rounding; the caller
/// re-ranks the whole band on exact scores and cuts it back to `k`.
#[derive(Clone)]
pub struct BoundedTopK {
    k: usize,
    heap: BinaryHeap<Worst>,
    slack: f64,
    near: Vec<Neighbor>,
    near_limit: usize,
}

impl BoundedTopK {
    pub fn new(k: usize) -> Self {
        Self::with_slack(k, 0.0)
    }

    /// A queue that also keeps near misses within `slack` of the k-th score.
    ///
    /// A negative or non-finite slack is treated as zero.
    pub fn with_slack(k: usize, slack: f64) -> Self {
        let slack = if slack.is_finite() { slack.max(0.0) } else { 0.0 };
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1 << 16)),
            slack,
            near: Vec::new(),
            near_limit: k.clamp(16, 1 << 16),
        }
    }

    /// Offer a candidate. Returns `true` if it was retained.
    ///
    /// Non-finite scores are never retained.
    pub fn push(&mut self, id: u32, score: f64) -> bool {
        if !score.is_finite() || self.k == 0 {
            return false;
        }
        let entry = Worst(Neighbor { id, score });
        if self.heap.len() < self.k {
            self.heap.push(entry);
            return true;
        }
        let evicted = match self.heap.peek_mut() {
            Some(mut worst) if entry < *worst => Some(std::mem::replace(&mut *worst, entry)),
            _ => None,
        };
        match evicted {
            Some(old) => {
                self.keep_near(old.0);
                true
            }
            None => {
                self.keep_near(entry.0);
                false
            }
        }
    }

    fn keep_near(&mut self, candidate: Neighbor) {
        if self.slack == 0.0 || candidate.score < self.cutoff() {
            return;
        }
        self.near.push(candidate);
        if self.near.len() > self.near_limit {
            let cutoff = self.cutoff();
            self.near.retain(|n| n.score >= cutoff);
            self.near_limit = self.near_limit.max(self.near.len() * 2);
        }
    }

    /// Score a candidate must reach to possibly enter the set.
    ///
    /// `-inf` while fewer than `k` entries are held.
    #[inline]
    pub fn threshold(&self) -> f64 {
        if self.heap.len() < self.k {
            return f64::NEG_INFINITY;
        }
        self.heap.peek().map_or(f64::INFINITY, |w| w.0.score)
    }

    /// Lowest score that can still matter: the threshold less the slack.
    ///
    /// Subtrees whose bound falls below this can be skipped.
    #[inline]
    pub fn cutoff(&self) -> f64 {
        self.threshold() - self.slack
    }

    #[inline]
    pub fn slack(&self) -> f64 {
        self.slack
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.k
    }

    /// Drain into a list ordered best first.
    ///
    /// Holds the `k` heap entries followed by any near misses still within
    /// the slack, so it may be longer than `k` when the slack is positive.
    pub fn into_sorted_vec(self) -> Vec<Neighbor> {
        let cutoff = self.cutoff();
        let mut out: Vec<Neighbor> = self.heap.into_iter().map(|w| w.0).collect();
        out.extend(self.near.into_iter().filter(|n| n.score >= cutoff));
        out.sort_by(Neighbor::rank_cmp);
        out
    }

    /// Ids currently in the heap, unordered.
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.heap.iter().map(|w| w.0.id)
    }
}

impl std::fmt::Debug for BoundedTopK {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedTopK")
            .field("k", &self.k)
            .field("len", &self.heap.len())
            .field("threshold", &self.threshold())
            .field("slack", &self.slack)
            .field("near", &self.near.len())
            .finish()
    }
}
