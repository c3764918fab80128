//! Dense vector kernels.
//!
//! All scoring in this crate runs in `f64`: recovered inner products are
//! compared against brute force at ~1e-9 relative tolerance, which `f32`
//! accumulation cannot meet on realistic dimensions.
//!
//! The loops are written so LLVM auto-vectorizes them (four independent
//! accumulators, no early exits).
//!
//! ```rust
//! use ipball::simd::{dot, cosine, norm};
//!
//! let a = [1.0_f64, 0.0, 0.0];
//! let b = [0.6_f64, 0.8, 0.0];
//!
//! assert!((dot(&a, &b) - 0.6).abs() < 1e-12);
//! assert!((cosine(&a, &b) - 0.6).abs() < 1e-12);
//! assert!((norm(&b) - 1.0).abs() < 1e-12);
//! ```

const NORM_EPSILON: f64 = 1e-300;

/// Dot product of two vectors.
///
/// Extra trailing elements of the longer slice are ignored.
#[inline]
#[must_use]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    let (a, b) = (&a[..n], &b[..n]);

    let mut acc = [0.0f64; 4];
    let chunks = n / 4;
    for i in 0..chunks {
        let j = i * 4;
        acc[0] += a[j] * b[j];
        acc[1] += a[j + 1] * b[j + 1];
        acc[2] += a[j + 2] * b[j + 2];
        acc[3] += a[j + 3] * b[j + 3];
    }
    let mut tail = 0.0;
    for j in chunks * 4..n {
        tail += a[j] * b[j];
    }
    (acc[0] + acc[1]) + (acc[2] + acc[3]) + tail
}

/// L2 norm of a vector.
#[inline]
#[must_use]
pub fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Cosine similarity between two vectors.
///
/// Returns `0.0` when either vector has (numerically) zero length.
#[inline]
#[must_use]
pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let na = norm(a);
    let nb = norm(b);
    if na > NORM_EPSILON && nb > NORM_EPSILON {
        dot(a, b) / (na * nb)
    } else {
        0.0
    }
}

/// L2 (Euclidean) distance between two vectors.
#[inline]
#[must_use]
pub fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    l2_distance_squared(a, b).sqrt()
}

/// L2 distance squared.
#[inline]
#[must_use]
pub fn l2_distance_squared(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
