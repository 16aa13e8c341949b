//! The trivial null model (spec §8 scenario 1): `P = 1`, uniform prior,
//! data log-likelihood identically zero. Grounded on
//! `altar/models/Null.py`, whose purpose is exactly to exercise the
//! annealing machinery without a real forward model -- at β = 0 the
//! chains sample the prior, and since `data ≡ 0` the posterior equals
//! the prior at every β, so the scheduler should escalate straight to
//! β = 1 in a single step (COV(w) = 0 for any Δβ).
use crate::distribution::Distribution;
use crate::model::{assign_offsets, Model};
use crate::parameter_set::ParameterSet;
use nalgebra::{DMatrix, DVector};

/// A model whose data likelihood is identically zero, used to exercise
/// and test the annealing loop in isolation from any forward model.
pub struct NullModel {
    sets: Vec<ParameterSet>,
}

impl NullModel {
    /// Build a null model with a single uniform(`low`, `high`) parameter.
    pub fn new(low: f64, high: f64) -> Self {
        let mut sets = vec![ParameterSet::new(
            "theta",
            1,
            Distribution::uniform(low, high),
        )];
        assign_offsets(&mut sets);
        NullModel { sets }
    }
}

impl Model for NullModel {
    fn parameter_sets(&self) -> &[ParameterSet] {
        &self.sets
    }

    fn data_likelihood(&self, theta: &DMatrix<f64>, data: &mut DVector<f64>) {
        let _ = theta;
        data.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cooling_step::CoolingStep;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn data_likelihood_is_always_zero() {
        let model = NullModel::new(0.0, 1.0);
        let theta = DMatrix::from_row_slice(4, 1, &[0.1, 0.5, 0.9, 0.99]);
        let mut data = DVector::zeros(4);
        model.data_likelihood(&theta, &mut data);
        assert!(data.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn posterior_equals_prior_at_any_beta() {
        let model = NullModel::new(0.0, 1.0);
        let mut rng = StdRng::seed_from_u64(0);
        let mut step = CoolingStep::zeros(32, 1);
        model.initialize_sample(&mut step.theta, &mut rng);
        step.beta = 0.37;
        model.likelihoods(&mut step);
        for i in 0..step.samples() {
            assert!((step.posterior[i] - step.prior[i]).abs() < 1e-12);
        }
    }
}
