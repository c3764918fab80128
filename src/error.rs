//! Error types for ipball.

use thiserror::Error;

/// Coarse classification of failures.
///
/// Several [`MipsError`] variants describe the same kind of problem in more
/// detail (a dimension mismatch is an invalid argument, for example).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller passed something unusable: `k == 0`, ragged or non-finite
    /// matrices, mismatched dimensions, bad parameters.
    InvalidArgument,
    /// Norm-based normalization is undefined for the input
    /// (all-zero family, overflowing norms).
    DegenerateInput,
    /// Reading inputs or writing results failed.
    Io,
}

/// Errors that can occur while building or querying a MIPS index.
#[derive(Debug, Error)]
pub enum MipsError {
    /// Invalid parameter or input value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// User and item vectors do not share a dimension.
    #[error("dimension mismatch: users have {user_dim} dimensions, items have {item_dim}")]
    DimensionMismatch { user_dim: usize, item_dim: usize },

    /// A whole vector family cannot be mapped onto the unit sphere.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// A single query row produced non-finite values after normalization.
    #[error("degenerate query row {row}: normalized vector is not finite")]
    DegenerateRow { row: usize },

    /// I/O error while loading matrices or writing results.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed matrix text.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Result serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl MipsError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MipsError::InvalidArgument(_)
            | MipsError::DimensionMismatch { .. }
            | MipsError::Parse { .. } => ErrorKind::InvalidArgument,
            MipsError::DegenerateInput(_) | MipsError::DegenerateRow { .. } => {
                ErrorKind::DegenerateInput
            }
            MipsError::Io(_) | MipsError::Serialization(_) => ErrorKind::Io,
        }
    }
}

impl From<serde_json::Error> for MipsError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for ipball operations.
pub type Result<T> = std::result::Result<T, MipsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_is_invalid_argument() {
        let err = MipsError::DimensionMismatch {
            user_dim: 3,
            item_dim: 4,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("users have 3"));
    }

    #[test]
    fn degenerate_row_is_degenerate_input() {
        assert_eq!(
            MipsError::DegenerateRow { row: 7 }.kind(),
            ErrorKind::DegenerateInput
        );
    }
}
