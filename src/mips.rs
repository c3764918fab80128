//! The MIPS pipeline: normalize, build, search, recover.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ann::{IndexStats, MipsIndex};
use crate::balltree::{AngularBallTree, BallTreeParams, SearchStats};
use crate::matrix::Matrix;
use crate::recover::recover;
use crate::simd;
use crate::topk::{BoundedTopK, Neighbor};
use crate::transform::{augment, Side};
use crate::{MipsError, Result};

/// Augmented-space band kept around the k-th score.
///
/// Items whose exact scores tie can round to slightly different augmented
/// scores; everything inside the band is re-ranked on exact scores so ties
/// still resolve by ascending id. Must exceed the rounding error of a
/// unit-vector dot product.
pub const TIE_SLACK: f64 = 1e-9;

/// Pipeline parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MipsParams {
    pub tree: BallTreeParams,
}

impl MipsParams {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.tree.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_leaf_capacity(mut self, leaf_capacity: usize) -> Self {
        self.tree.leaf_capacity = leaf_capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.tree.validate()
    }
}

/// Wall-clock time spent in each pipeline stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub map: Duration,
    pub build: Duration,
    pub search: Duration,
    pub recover: Duration,
}

/// Per-user ranked lists from a batch call.
///
/// Entry `u` is user row `u`'s result. A row whose normalized vector is not
/// finite fails on its own; the rest of the batch is unaffected.
#[derive(Debug, Default)]
pub struct TopKLists {
    lists: Vec<Result<Vec<Neighbor>>>,
    pub timings: StageTimings,
    pub search_stats: SearchStats,
}

impl TopKLists {
    pub(crate) fn from_lists(lists: Vec<Result<Vec<Neighbor>>>) -> Self {
        Self {
            lists,
            ..Self::default()
        }
    }

    /// One empty list per user.
    pub(crate) fn empty_lists(num_users: usize) -> Self {
        Self::from_lists((0..num_users).map(|_| Ok(Vec::new())).collect())
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn get(&self, user: usize) -> Option<&Result<Vec<Neighbor>>> {
        self.lists.get(user)
    }

    /// Item ids for `user`, best first. `None` if the row failed or is out of range.
    pub fn ids(&self, user: usize) -> Option<Vec<u32>> {
        match self.lists.get(user)? {
            Ok(list) => Some(list.iter().map(|n| n.id).collect()),
            Err(_) => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Result<Vec<Neighbor>>)> + '_ {
        self.lists.iter().enumerate()
    }

    /// Number of user rows that failed.
    pub fn num_failed(&self) -> usize {
        self.lists.iter().filter(|r| r.is_err()).count()
    }

    pub fn into_inner(self) -> Vec<Result<Vec<Neighbor>>> {
        self.lists
    }
}

/// Ball tree MIPS index over a borrowed item matrix.
///
/// Keeps the original items for exact score recovery; the tree holds its own
/// copy of the normalized points.
pub struct BallTreeMips<'a> {
    items: &'a Matrix,
    item_max_norm: f64,
    tree: AngularBallTree,
}

impl<'a> BallTreeMips<'a> {
    /// Normalize `items` and build the tree.
    pub fn new(items: &'a Matrix, params: &MipsParams) -> Result<Self> {
        Ok(Self::build_timed(items, params)?.0)
    }

    fn build_timed(items: &'a Matrix, params: &MipsParams) -> Result<(Self, Duration, Duration)> {
        params.validate()?;

        let start = Instant::now();
        let augmented = augment(items, Side::Item)?;
        let map = start.elapsed();

        let start = Instant::now();
        let tree = AngularBallTree::build(&augmented, &params.tree)?;
        let build = start.elapsed();
        info!(
            secs = build.as_secs_f64(),
            items = items.num_rows(),
            nodes = tree.stats().num_nodes,
            max_depth = tree.stats().max_depth,
            "built ball tree"
        );

        let index = Self {
            items,
            item_max_norm: augmented.max_norm(),
            tree,
        };
        Ok((index, map, build))
    }

    pub fn tree(&self) -> &AngularBallTree {
        &self.tree
    }

    pub fn item_max_norm(&self) -> f64 {
        self.item_max_norm
    }

    /// Search with an already augmented (user-side, unit-norm) query.
    ///
    /// Returns the raw queue with augmented-space scores, for callers that
    /// recover scores themselves. The queue carries [`TIE_SLACK`], so it may
    /// hold more than `k` candidates; [`recover`] cuts it back.
    pub fn search_augmented(
        &self,
        query: &[f64],
        k: usize,
    ) -> Result<(BoundedTopK, SearchStats)> {
        let mut queue = BoundedTopK::with_slack(k, TIE_SLACK);
        let stats = self.tree.search(query, &mut queue)?;
        Ok((queue, stats))
    }

    /// Augment a standalone query.
    ///
    /// Ranking is invariant to scaling the query, so a lone query is scaled
    /// by its own norm; a zero query becomes the pure residual vector and
    /// scores every item 0.
    fn augment_query(&self, query: &[f64]) -> Vec<f64> {
        let d = query.len();
        let mut out = vec![0.0; d + 2];
        let n = simd::norm(query);
        if n > 0.0 && n.is_finite() {
            for (o, x) in out.iter_mut().zip(query) {
                *o = x / n;
            }
        } else {
            out[d + 1] = 1.0;
        }
        out
    }
}

impl MipsIndex for BallTreeMips<'_> {
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
        let augmented = self.augment_query(query);
        let (queue, _) = self.search_augmented(&augmented, k)?;
        Ok(recover(queue, query, self.items))
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
            size_bytes: self.tree.size_bytes(),
            algorithm: "AngularBallTree".to_string(),
            tree: Some(self.tree.stats().clone()),
        }
    }
}

/// Top-k items by inner product for every user, with default parameters.
///
/// See [`compute_top_k_with`].
pub fn compute_top_k(k: usize, users: &Matrix, items: &Matrix) -> Result<TopKLists> {
    compute_top_k_with(k, users, items, &MipsParams::default())
}

/// Top-k items by inner product for every user row.
///
/// The tree is built once and shared by all user searches. Each list holds
/// `min(k, items)` entries ordered by descending exact score, ties broken by
/// ascending item id.
///
/// - No users: empty result.
/// - No items: an empty list per user.
///
/// An empty family has no meaningful dimension (a matrix read from an empty
/// file reports 0), so dimensions are only compared when both sides have
/// rows.
///
/// # Errors
///
/// `k == 0`, mismatched dimensions, invalid parameters, or an all-zero
/// family abort the whole call.
pub fn compute_top_k_with(
    k: usize,
    users: &Matrix,
    items: &Matrix,
    params: &MipsParams,
) -> Result<TopKLists> {
    if k == 0 {
        return Err(MipsError::InvalidArgument("k must be positive".to_string()));
    }
    params.validate()?;

    if users.is_empty() {
        debug!("no users, nothing to search");
        return Ok(TopKLists::default());
    }
    if items.is_empty() {
        debug!(users = users.num_rows(), "no items, returning empty lists");
        return Ok(TopKLists::empty_lists(users.num_rows()));
    }
    check_dimensions(users, items)?;

    let start = Instant::now();
    let augmented_users = augment(users, Side::User)?;
    let map_users = start.elapsed();

    let (index, map_items, build) = BallTreeMips::build_timed(items, params)?;
    let map = map_users + map_items;
    info!(
        secs = map.as_secs_f64(),
        users = users.num_rows(),
        items = items.num_rows(),
        "mapped vectors onto unit sphere"
    );

    let start = Instant::now();
    let mut search_stats = SearchStats::default();
    let mut queues = Vec::with_capacity(users.num_rows());
    for u in 0..augmented_users.num_rows() {
        let row = match finite_row(augmented_users.row(u), u) {
            Ok(row) => row,
            Err(err) => {
                warn!(user = u, "normalized user vector is not finite, skipping row");
                queues.push(Err(err));
                continue;
            }
        };
        let (queue, stats) = index.search_augmented(row, k)?;
        search_stats += stats;
        queues.push(Ok(queue));
    }
    let search = start.elapsed();
    info!(secs = search.as_secs_f64(), "searched ball tree");
    debug!(
        nodes_visited = search_stats.nodes_visited,
        points_scored = search_stats.points_scored,
        subtrees_pruned = search_stats.subtrees_pruned,
        deferred_pruned = search_stats.deferred_pruned,
        "search work"
    );

    let start = Instant::now();
    let lists = queues
        .into_iter()
        .enumerate()
        .map(|(u, q)| q.map(|queue| recover(queue, users.row(u), items)))
        .collect();
    let recover_time = start.elapsed();
    info!(secs = recover_time.as_secs_f64(), "recovered original scores");

    Ok(TopKLists {
        lists,
        timings: StageTimings {
            map,
            build,
            search,
            recover: recover_time,
        },
        search_stats,
    })
}

pub(crate) fn check_dimensions(users: &Matrix, items: &Matrix) -> Result<()> {
    if users.dimension() != items.dimension() {
        return Err(MipsError::DimensionMismatch {
            user_dim: users.dimension(),
            item_dim: items.dimension(),
        });
    }
    Ok(())
}

/// Guard against NaN propagation into a ranking.
///
/// `augment` keeps every row finite once the family's max norm is finite and
/// positive, so this only trips if that contract is broken; the row then
/// fails on its own instead of returning a silently wrong list.
fn finite_row(row: &[f64], user: usize) -> Result<&[f64]> {
    if row.iter().all(|v| v.is_finite()) {
        Ok(row)
    } else {
        Err(MipsError::DegenerateRow { row: user })
    }
}
