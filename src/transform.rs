//! Norm-based reduction of MIPS to angular search on the unit sphere.
//!
//! Each family (users or items) is scaled by its own maximum norm, then two
//! coordinates are appended so every row has unit length:
//!
//! ```text
//! item x  ->  [ x / M_i,  sqrt(1 - (|x|/M_i)^2),  0 ]
//! user q  ->  [ q / M_u,  0,  sqrt(1 - (|q|/M_u)^2) ]
//! ```
//!
//! The residuals occupy disjoint slots, so `<q', x'> = <q, x> / (M_u * M_i)`.
//! Ranking items by `<q', x'>` is therefore ranking by `<q, x>`, and because
//! every augmented vector is a unit vector the ball-tree bound
//! `<q, p> <= <q, mean> + radius` applies.

use crate::matrix::Matrix;
use crate::{MipsError, Result};

/// Which vector family a matrix belongs to.
///
/// Determines which of the two appended slots carries the residual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Query side: residual in slot `d + 1`.
    User,
    /// Indexed side: residual in slot `d`.
    Item,
}

impl Side {
    fn residual_slot(self, dimension: usize) -> usize {
        match self {
            Side::Item => dimension,
            Side::User => dimension + 1,
        }
    }
}

/// Matrix of unit-norm augmented vectors (dimension `d + 2`).
#[derive(Debug, Clone)]
pub struct AugmentedMatrix {
    data: Vec<f64>,
    num_rows: usize,
    dimension: usize,
    max_norm: f64,
    side: Side,
}

impl AugmentedMatrix {
    #[inline]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Augmented dimension (`original_dimension() + 2`).
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn original_dimension(&self) -> usize {
        self.dimension - 2
    }

    /// Maximum norm of the source family, used as the scale factor.
    #[inline]
    pub fn max_norm(&self) -> f64 {
        self.max_norm
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        let start = i * self.dimension;
        &self.data[start..start + self.dimension]
    }
}

/// Map a vector family onto the unit sphere in `d + 2` dimensions.
///
/// # Errors
///
/// - [`MipsError::InvalidArgument`] if the matrix has no rows.
/// - [`MipsError::DegenerateInput`] if the maximum norm is zero (every row is
///   the zero vector) or not finite (a norm overflowed).
pub fn augment(matrix: &Matrix, side: Side) -> Result<AugmentedMatrix> {
    if matrix.is_empty() {
        return Err(MipsError::InvalidArgument(format!(
            "cannot normalize an empty {side:?} matrix"
        )));
    }

    let max_norm = matrix.max_norm();
    if max_norm <= 0.0 {
        return Err(MipsError::DegenerateInput(format!(
            "every {side:?} vector has zero norm"
        )));
    }
    if !max_norm.is_finite() {
        return Err(MipsError::DegenerateInput(format!(
            "{side:?} norms overflow f64"
        )));
    }

    let d = matrix.dimension();
    let dimension = d + 2;
    let slot = side.residual_slot(d);
    let mut data = vec![0.0; matrix.num_rows() * dimension];

    for (v, out) in matrix.vectors().zip(data.chunks_exact_mut(dimension)) {
        for (o, x) in out[..d].iter_mut().zip(v.values) {
            *o = x / max_norm;
        }
        // Rounding can push the ratio a hair above 1 for the longest row.
        let ratio = v.norm / max_norm;
        out[slot] = (1.0 - ratio * ratio).max(0.0).sqrt();
    }

    Ok(AugmentedMatrix {
        data,
        num_rows: matrix.num_rows(),
        dimension,
        max_norm,
        side,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd;

    fn items() -> Matrix {
        Matrix::from_rows(vec![vec![4.0, 0.0], vec![0.0, 3.0], vec![2.0, 2.0]]).unwrap()
    }

    #[test]
    fn augmented_rows_have_unit_norm() {
        let aug = augment(&items(), Side::Item).unwrap();
        assert_eq!(aug.dimension(), 4);
        for i in 0..aug.num_rows() {
            assert!((simd::norm(aug.row(i)) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn residual_slots_are_disjoint() {
        let m = items();
        let item = augment(&m, Side::Item).unwrap();
        let user = augment(&m, Side::User).unwrap();
        // Row 1 is shorter than the max, so its residual is nonzero.
        assert!(item.row(1)[2] > 0.0);
        assert_eq!(item.row(1)[3], 0.0);
        assert_eq!(user.row(1)[2], 0.0);
        assert!(user.row(1)[3] > 0.0);
    }

    #[test]
    fn inner_product_scales_by_max_norms() {
        let items = items();
        let users = Matrix::from_rows(vec![vec![1.0, 1.0], vec![-3.0, 0.5]]).unwrap();
        let ai = augment(&items, Side::Item).unwrap();
        let au = augment(&users, Side::User).unwrap();
        let scale = ai.max_norm() * au.max_norm();
        for u in 0..users.num_rows() {
            for i in 0..items.num_rows() {
                let original = simd::dot(users.row(u), items.row(i));
                let augmented = simd::dot(au.row(u), ai.row(i));
                assert!((augmented * scale - original).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn all_zero_family_is_degenerate() {
        let zeros = Matrix::from_rows(vec![vec![0.0, 0.0], vec![0.0, 0.0]]).unwrap();
        let err = augment(&zeros, Side::Item).unwrap_err();
        assert!(matches!(err, MipsError::DegenerateInput(_)));
    }

    #[test]
    fn overflowing_norm_is_degenerate() {
        let huge = Matrix::from_rows(vec![vec![1e200, 1e200]]).unwrap();
        assert!(matches!(
            augment(&huge, Side::User),
            Err(MipsError::DegenerateInput(_))
        ));
    }

    #[test]
    fn zero_row_maps_to_pure_residual() {
        let m = Matrix::from_rows(vec![vec![0.0, 0.0], vec![1.0, 0.0]]).unwrap();
        let aug = augment(&m, Side::User).unwrap();
        assert_eq!(aug.row(0), &[0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn empty_matrix_rejected() {
        assert!(augment(&Matrix::empty(3), Side::Item).is_err());
    }
}
