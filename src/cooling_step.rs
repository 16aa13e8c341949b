//! `CoolingStep`: the full state of the simulation at one inverse
//! temperature β (spec §3).

use nalgebra::{DMatrix, DVector};

/// Encapsulation of the state of the calculation at some particular β.
///
/// Invariants (checked by [`CoolingStep::assert_consistent`] and
/// exercised in this module's tests):
/// * `samples(theta) == prior.len() == data.len() == posterior.len()`
/// * `parameters(theta) == dim(sigma)`
/// * after `cool`, `posterior[i] == prior[i] + beta * data[i]` for all `i`
/// * `sigma` is symmetric after every write
#[derive(Clone, Debug)]
pub struct CoolingStep {
    /// Inverse temperature, in `[0, 1]`.
    pub beta: f64,
    /// `S x P` matrix; each row is one chain's parameter vector.
    pub theta: DMatrix<f64>,
    /// Prior log-likelihood per sample.
    pub prior: DVector<f64>,
    /// Data log-likelihood per sample.
    pub data: DVector<f64>,
    /// Posterior log-likelihood per sample (`prior + beta * data`).
    pub posterior: DVector<f64>,
    /// `P x P` symmetric positive-definite parameter covariance.
    pub sigma: DMatrix<f64>,
    /// Monotonically increasing step counter.
    pub iteration: usize,
}

impl CoolingStep {
    /// Allocate a new step with `samples` chains and `parameters`
    /// dimensions, all fields zeroed, β = 0.
    pub fn zeros(samples: usize, parameters: usize) -> Self {
        CoolingStep {
            beta: 0.0,
            theta: DMatrix::zeros(samples, parameters),
            prior: DVector::zeros(samples),
            data: DVector::zeros(samples),
            posterior: DVector::zeros(samples),
            sigma: DMatrix::identity(parameters, parameters),
            iteration: 0,
        }
    }

    /// Number of chains `S`.
    pub fn samples(&self) -> usize {
        self.theta.nrows()
    }

    /// Number of parameters `P`.
    pub fn parameters(&self) -> usize {
        self.theta.ncols()
    }

    /// Recompute `posterior = prior + beta * data` in place. This is the
    /// authoritative place where the posterior is combined -- the
    /// sampler must never recompute it itself (spec §9 Open Question:
    /// the model/step is authoritative, not the sampler).
    pub fn recompute_posterior(&mut self) {
        self.posterior = &self.prior + self.beta * &self.data;
    }

    /// Debug-only consistency check for the quantified invariants in
    /// spec §8.
    #[cfg(debug_assertions)]
    pub fn assert_consistent(&self) {
        let s = self.samples();
        assert_eq!(self.prior.len(), s);
        assert_eq!(self.data.len(), s);
        assert_eq!(self.posterior.len(), s);
        let p = self.parameters();
        assert_eq!(self.sigma.nrows(), p);
        assert_eq!(self.sigma.ncols(), p);
        for i in 0..p {
            for j in 0..p {
                assert!(
                    (self.sigma[(i, j)] - self.sigma[(j, i)]).abs() <= 1e-9 * (1.0 + self.sigma[(i, j)].abs()),
                    "sigma not symmetric at ({}, {})",
                    i,
                    j
                );
            }
        }
    }

    #[cfg(not(debug_assertions))]
    pub fn assert_consistent(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_has_expected_shape() {
        let step = CoolingStep::zeros(10, 3);
        assert_eq!(step.samples(), 10);
        assert_eq!(step.parameters(), 3);
        assert_eq!(step.beta, 0.0);
        step.assert_consistent();
    }

    #[test]
    fn recompute_posterior_matches_tempered_bayes() {
        let mut step = CoolingStep::zeros(4, 1);
        step.prior = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        step.data = DVector::from_vec(vec![0.5, 0.5, 0.5, 0.5]);
        step.beta = 0.5;
        step.recompute_posterior();
        for i in 0..4 {
            let expected = step.prior[i] + step.beta * step.data[i];
            assert!((step.posterior[i] - expected).abs() <= 1e-12);
        }
    }
}
