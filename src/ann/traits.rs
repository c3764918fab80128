//! Unified trait for MIPS engines.

use serde::Serialize;

use crate::balltree::TreeStats;
use crate::topk::Neighbor;
use crate::Result;

/// An index answering top-k maximum inner product queries.
///
/// Implementations are read-only after construction, so `&self` searches can
/// run concurrently.
pub trait MipsIndex {
    /// Top-k items by inner product with `query` (original space), ordered
    /// by descending score with ties broken by ascending id.
    fn search(&self, query: &[f64], k: usize) -> Result<Vec<Neighbor>>;

    /// Number of indexed items.
    fn num_items(&self) -> usize;

    /// Dimension of item and query vectors.
    fn dimension(&self) -> usize;

    /// Index statistics.
    fn stats(&self) -> IndexStats;
}

/// Statistics about a MIPS index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub num_items: usize,
    pub dimension: usize,
    pub size_bytes: usize,
    pub algorithm: String,
    pub tree: Option<TreeStats>,
}
