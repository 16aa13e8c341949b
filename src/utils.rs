//! Numeric helpers shared by the scheduler and sampler.
//!
//! Grounded on the teacher's `outer` product helper and `NearestSPD`
//! conditioning routine (`src/utils/mod.rs`), adapted to the `f64`-only
//! needs of the covariance scheduler.

use alga::general::RealField;
use nalgebra::{Cholesky, DMatrix, DVector, Dynamic, Scalar};
use std::cmp::Ordering;

/// Outer product `left * right^T`, generic over any real scalar field --
/// kept generic (rather than narrowed to `f64`) to match the teacher's
/// `outer` helper exactly; every call site in this crate instantiates it
/// at `f64`.
pub fn outer<N: Scalar + RealField>(left: &DVector<N>, right: &DVector<N>) -> DMatrix<N> {
    let mut res = DMatrix::zeros(left.len(), right.len());
    for i in 0..left.len() {
        for j in 0..right.len() {
            res[(i, j)] = left[i] * right[j];
        }
    }
    res
}

/// Clamp `value` into `[lo, hi]`, generic over any float type. Used by
/// the sampler's scale adaptation (spec §4.3) instead of chained
/// `.max()/.min()` calls.
pub fn clamp<T: num_traits::Float>(value: T, lo: T, hi: T) -> T {
    if value < lo {
        lo
    } else if value > hi {
        hi
    } else {
        value
    }
}

/// Median of a slice of `f64`, via a sorted clone (no in-place mutation
/// of the caller's data -- mirrors `altar/bayesian/COV.py`'s
/// `dataLikelihood.clone().sort().median()`).
pub fn median(values: &DVector<f64>) -> f64 {
    let mut sorted: Vec<f64> = values.iter().cloned().collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Symmetrize a matrix by mirroring the lower triangle into the upper
/// triangle, matching the `computeCovariance` conditioning pass in
/// spec §4.2: "only the lower triangle is updated ... the upper
/// triangle is mirrored."
pub fn mirror_lower_to_upper(m: &mut DMatrix<f64>) {
    let n = m.nrows();
    for i in 0..n {
        for j in 0..i {
            m[(j, i)] = m[(i, j)];
        }
    }
}

/// Attempt a Cholesky factorization; used wherever spec §7 requires a
/// numerical-conditioning failure to be detected (non-SPD Σ_prop).
pub fn try_cholesky(m: &DMatrix<f64>) -> Option<Cholesky<f64, Dynamic>> {
    Cholesky::new(m.clone())
}
