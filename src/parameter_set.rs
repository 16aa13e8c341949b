//! `ParameterSet`: a contiguous block of columns in θ governed by one
//! prior distribution (spec §3).

use crate::distribution::{Distribution, DistributionOps};
use nalgebra::DMatrix;
use rand::RngCore;

/// A contiguous block of columns `[offset, offset + count)` in the
/// global θ matrix, governed by one prior distribution.
///
/// `offset` is assigned once by the owning [`crate::model::Model`] at
/// initialization; after that a `ParameterSet` is immutable, matching
/// the teacher's builder-then-immutable idiom.
#[derive(Clone, Debug)]
pub struct ParameterSet {
    pub name: String,
    /// Number of columns this set owns.
    pub count: usize,
    /// Starting column in the global θ matrix.
    pub offset: usize,
    /// Prior distribution shared by every parameter in this set.
    pub prior: Distribution,
}

impl ParameterSet {
    /// Construct a new parameter set. `offset` defaults to 0 and is
    /// patched once by `Model::new`.
    pub fn new(name: impl Into<String>, count: usize, prior: Distribution) -> Self {
        ParameterSet {
            name: name.into(),
            count,
            offset: 0,
            prior,
        }
    }

    /// Return a view of this set's columns within the global θ matrix.
    pub fn columns<'a>(&self, theta: &'a DMatrix<f64>) -> nalgebra::DMatrixSlice<'a, f64> {
        theta.columns(self.offset, self.count)
    }

    /// Draw a fresh row block for every sample from the prior, writing
    /// into `theta`'s `[offset, offset+count)` columns.
    pub fn initialize_sample(&self, theta: &mut DMatrix<f64>, rng: &mut dyn RngCore) {
        let samples = theta.nrows();
        for i in 0..samples {
            for j in 0..self.count {
                theta[(i, self.offset + j)] = self.prior.draw(rng);
            }
        }
    }

    /// Accumulate this set's contribution to the prior log-likelihood of
    /// every sample into `llk` (additive across parameter sets, per
    /// spec §4.5).
    pub fn prior_likelihood(&self, theta: &DMatrix<f64>, llk: &mut nalgebra::DVector<f64>) {
        let samples = theta.nrows();
        for i in 0..samples {
            let mut acc = 0.0;
            for j in 0..self.count {
                acc += self.prior.prior_ln_f(theta[(i, self.offset + j)]);
            }
            llk[i] += acc;
        }
    }

    /// Mark samples whose block violates this set's prior support.
    /// `mask[i]` is incremented (not overwritten) so that masks from
    /// multiple parameter sets compose additively, per spec §4.5
    /// ("Verify aggregates per-parameter-set masks by addition").
    pub fn verify(&self, theta: &DMatrix<f64>, mask: &mut nalgebra::DVector<u32>) {
        let samples = theta.nrows();
        for i in 0..samples {
            for j in 0..self.count {
                if !self.prior.in_support(theta[(i, self.offset + j)]) {
                    mask[i] += 1;
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn initialize_sample_stays_in_support() {
        let mut ps = ParameterSet::new("x", 2, Distribution::uniform(-1.0, 1.0));
        ps.offset = 1;
        let mut theta = DMatrix::zeros(5, 4);
        let mut rng = StdRng::seed_from_u64(1);
        ps.initialize_sample(&mut theta, &mut rng);
        for i in 0..5 {
            for j in 0..2 {
                let v = theta[(i, 1 + j)];
                assert!(v >= -1.0 && v <= 1.0);
            }
        }
    }

    #[test]
    fn verify_flags_out_of_support_rows() {
        let mut ps = ParameterSet::new("x", 1, Distribution::uniform(0.0, 1.0));
        ps.offset = 0;
        let theta = DMatrix::from_row_slice(3, 1, &[0.5, -0.2, 1.5]);
        let mut mask = DVector::zeros(3);
        ps.verify(&theta, &mut mask);
        assert_eq!(mask[0], 0);
        assert_eq!(mask[1], 1);
        assert_eq!(mask[2], 1);
    }

    #[test]
    fn prior_likelihood_accumulates_additively() {
        let mut ps = ParameterSet::new("x", 1, Distribution::gaussian(0.0, 1.0));
        ps.offset = 0;
        let theta = DMatrix::from_row_slice(2, 1, &[0.0, 1.0]);
        let mut llk = DVector::from_vec(vec![10.0, 10.0]);
        ps.prior_likelihood(&theta, &mut llk);
        assert!((llk[0] - (10.0 + ps.prior.prior_ln_f(0.0))).abs() < 1e-9);
        assert!((llk[1] - (10.0 + ps.prior.prior_ln_f(1.0))).abs() < 1e-9);
    }
}
