//! Common interface over MIPS engines.
//!
//! - [`BallTreeMips`](crate::mips::BallTreeMips): normalization + angular
//!   ball tree + branch-and-bound (exact, sub-linear on clustered data)
//! - [`NaiveMips`](crate::naive::NaiveMips): exhaustive scan

pub mod traits;

pub use traits::{IndexStats, MipsIndex};
