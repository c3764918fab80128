//! Dense row-major matrices with cached row norms.

use crate::simd;
use crate::{MipsError, Result};

/// Dense row-major `f64` matrix.
///
/// Row `i` is the vector with id `i`. Norms are computed once on
/// construction; every later consumer reads the cached value.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    num_rows: usize,
    dimension: usize,
    norms: Vec<f64>,
}

/// Borrowed view of one matrix row.
#[derive(Debug, Clone, Copy)]
pub struct Vector<'a> {
    pub id: u32,
    pub values: &'a [f64],
    pub norm: f64,
}

impl Matrix {
    /// Create a matrix from a flat row-major buffer.
    ///
    /// Fails if `data.len() != num_rows * dimension` or any value is NaN or
    /// infinite.
    pub fn new(num_rows: usize, dimension: usize, data: Vec<f64>) -> Result<Self> {
        let expected = num_rows.checked_mul(dimension).ok_or_else(|| {
            MipsError::InvalidArgument(format!("{num_rows} x {dimension} overflows usize"))
        })?;
        if data.len() != expected {
            return Err(MipsError::InvalidArgument(format!(
                "buffer holds {} values, expected {num_rows} x {dimension} = {expected}",
                data.len()
            )));
        }
        if u32::try_from(num_rows).is_err() {
            return Err(MipsError::InvalidArgument(format!(
                "{num_rows} rows exceed the u32 id space"
            )));
        }
        if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
            return Err(MipsError::InvalidArgument(format!(
                "non-finite value at row {}, column {}",
                pos / dimension.max(1),
                pos % dimension.max(1)
            )));
        }

        let norms = if dimension == 0 {
            vec![0.0; num_rows]
        } else {
            data.chunks_exact(dimension).map(simd::norm).collect()
        };

        Ok(Self {
            data,
            num_rows,
            dimension,
            norms,
        })
    }

    /// Create a matrix from individual rows, which must all have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let dimension = rows.first().map_or(0, Vec::len);
        Self::from_rows_with_dimension(rows, dimension)
    }

    /// Like [`Matrix::from_rows`], with an explicit dimension so an empty
    /// row list still carries one.
    pub fn from_rows_with_dimension(rows: Vec<Vec<f64>>, dimension: usize) -> Result<Self> {
        let num_rows = rows.len();
        let mut data = Vec::with_capacity(num_rows * dimension);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != dimension {
                return Err(MipsError::InvalidArgument(format!(
                    "row {i} has {} values, expected {dimension}",
                    row.len()
                )));
            }
            data.extend(row);
        }
        Self::new(num_rows, dimension, data)
    }

    /// Matrix with zero rows.
    pub fn empty(dimension: usize) -> Self {
        Self {
            data: Vec::new(),
            num_rows: 0,
            dimension,
            norms: Vec::new(),
        }
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// Row `i` as a slice.
    ///
    /// # Panics
    ///
    /// Panics if `i >= num_rows()`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        let start = i * self.dimension;
        &self.data[start..start + self.dimension]
    }

    /// Cached Euclidean norm of row `i`.
    #[inline]
    pub fn norm(&self, i: usize) -> f64 {
        self.norms[i]
    }

    pub fn norms(&self) -> &[f64] {
        &self.norms
    }

    /// Largest row norm, or `0.0` for an empty matrix.
    pub fn max_norm(&self) -> f64 {
        self.norms.iter().copied().fold(0.0, f64::max)
    }

    /// Row `i` with its id and cached norm.
    pub fn vector(&self, i: usize) -> Vector<'_> {
        Vector {
            id: i as u32,
            values: self.row(i),
            norm: self.norms[i],
        }
    }

    /// Iterate over all rows in id order.
    pub fn vectors(&self) -> impl Iterator<Item = Vector<'_>> + '_ {
        (0..self.num_rows).map(move |i| self.vector(i))
    }

    /// Underlying row-major buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norms_are_cached_per_row() {
        let m = Matrix::from_rows(vec![vec![3.0, 4.0], vec![0.0, 2.0]]).unwrap();
        assert_eq!(m.num_rows(), 2);
        assert_eq!(m.dimension(), 2);
        assert!((m.norm(0) - 5.0).abs() < 1e-12);
        assert!((m.max_norm() - 5.0).abs() < 1e-12);
        assert_eq!(m.vector(1).id, 1);
        assert_eq!(m.row(1), &[0.0, 2.0]);
    }

    #[test]
    fn ragged_rows_rejected() {
        let err = Matrix::from_rows(vec![vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, MipsError::InvalidArgument(_)));
    }

    #[test]
    fn non_finite_rejected() {
        let err = Matrix::new(1, 2, vec![1.0, f64::NAN]).unwrap_err();
        assert!(err.to_string().contains("column 1"));
    }

    #[test]
    fn buffer_length_checked() {
        assert!(Matrix::new(2, 2, vec![1.0; 3]).is_err());
    }

    #[test]
    fn empty_keeps_dimension() {
        let m = Matrix::from_rows_with_dimension(Vec::new(), 5).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.dimension(), 5);
        assert_eq!(m.max_norm(), 0.0);
    }
}
