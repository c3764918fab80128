//! ipball: exact Maximum Inner Product Search with angular ball trees.
//!
//! Given user (query) vectors and item vectors, returns for each user the
//! `k` items with the largest raw inner product, without scoring every pair.
//!
//! ```rust
//! use ipball::{compute_top_k, Matrix};
//!
//! let items = Matrix::from_rows(vec![vec![4.0, 0.0], vec![0.0, 3.0], vec![2.0, 2.0]])?;
//! let users = Matrix::from_rows(vec![vec![1.0, 1.0]])?;
//!
//! let results = compute_top_k(2, &users, &items)?;
//! assert_eq!(results.ids(0), Some(vec![0, 2]));
//! # Ok::<(), ipball::MipsError>(())
//! ```
//!
//! # Pipeline
//!
//! 1. [`transform`]: scale each family by its maximum norm and append a
//!    residual coordinate, so every vector sits on the unit sphere and inner
//!    products are preserved up to a constant.
//! 2. [`balltree`]: build a binary ball tree over the items once, splitting
//!    on two angularly distant seeds.
//! 3. Branch-and-bound search per user with a bounded top-k queue
//!    ([`topk`]), pruning subtrees whose `<q, mean> + radius` cannot beat the
//!    current k-th score.
//! 4. [`recover`]: recompute exact original-space scores for the winners.
//!
//! # Critical Nuances
//!
//! ## Why not plain cosine search?
//!
//! MIPS is not a metric problem: an item need not be its own best match, and
//! long items dominate. Appending the residual `sqrt(1 - |x|^2 / M^2)` keeps
//! the norm information in a coordinate the query never touches, so angular
//! order on the augmented sphere equals inner-product order.
//!
//! ## When the tree does not help
//!
//! Pruning power decays with intrinsic dimensionality. On uniform
//! high-dimensional data the search degrades towards scoring every item
//! (still exact, just not faster). [`naive::NaiveMips`] is the baseline to
//! compare against.
//!
//! ## Determinism
//!
//! Tree shape depends on the build seed ([`BallTreeParams::seed`]); results
//! do not. Ties are broken by ascending item id everywhere.

pub mod ann;
pub mod balltree;
pub mod benchmark;
pub mod io;
pub mod matrix;
pub mod mips;
pub mod naive;
pub mod recover;
pub mod simd;
pub mod topk;
pub mod transform;

pub mod error;

// Re-exports
pub use ann::{IndexStats, MipsIndex};
pub use balltree::{AngularBallTree, BallTreeParams, SearchStats, TreeStats};
pub use error::{ErrorKind, MipsError, Result};
pub use matrix::{Matrix, Vector};
pub use mips::{compute_top_k, compute_top_k_with, BallTreeMips, MipsParams, StageTimings, TopKLists};
pub use naive::{compute_top_k_naive, NaiveMips};
pub use topk::{BoundedTopK, Neighbor};
pub use transform::{augment, AugmentedMatrix, Side};
