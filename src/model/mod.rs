//! The `Model` contract (spec §3, §4.5): an ordered collection of
//! [`ParameterSet`]s that produces prior, data, and posterior
//! log-likelihoods and enforces constraints on samples.

pub mod linear_gaussian;
pub mod null;

pub use linear_gaussian::LinearGaussianModel;
pub use null::NullModel;

use crate::cooling_step::CoolingStep;
use crate::parameter_set::ParameterSet;
use nalgebra::{DMatrix, DVector};
use rand::RngCore;

/// Assign cumulative column offsets to an ordered list of parameter
/// sets and return the total parameter count `P`. Mirrors
/// `altar/models/Bayesian.py`'s offset-patching at initialization:
/// a set claims `[offset, offset+count)`, and the offset is assigned
/// exactly once.
pub fn assign_offsets(sets: &mut [ParameterSet]) -> usize {
    let mut offset = 0;
    for set in sets.iter_mut() {
        set.offset = offset;
        offset += set.count;
    }
    offset
}

/// The Bayesian model contract: composes parameter sets, computes
/// prior/data/posterior log-likelihoods, and verifies samples.
pub trait Model: Send + Sync {
    /// The ordered parameter sets that partition θ's columns.
    fn parameter_sets(&self) -> &[ParameterSet];

    /// Total θ dimension `P`; must equal the sum of parameter-set
    /// counts.
    fn parameters(&self) -> usize {
        self.parameter_sets().iter().map(|ps| ps.count).sum()
    }

    /// Fill `theta` with an initial random sample from the prior.
    fn initialize_sample(&self, theta: &mut DMatrix<f64>, rng: &mut dyn RngCore) {
        for set in self.parameter_sets() {
            set.initialize_sample(theta, rng);
        }
    }

    /// Fill `prior` with the prior log-likelihood of every sample in
    /// `theta`.
    fn prior_likelihood(&self, theta: &DMatrix<f64>, prior: &mut DVector<f64>) {
        prior.fill(0.0);
        for set in self.parameter_sets() {
            set.prior_likelihood(theta, prior);
        }
    }

    /// Fill `data` with the data (forward-model) log-likelihood of every
    /// sample in `theta`. This is the one operation every concrete model
    /// must supply itself -- it is domain-specific.
    fn data_likelihood(&self, theta: &DMatrix<f64>, data: &mut DVector<f64>);

    /// Given `step.prior` and `step.data`, fill `step.posterior` using
    /// `step.beta`. The `CoolingStep`/`Model` pair, not the sampler, is
    /// authoritative for this combination (spec §9 Open Question).
    fn posterior_likelihood(&self, step: &mut CoolingStep) {
        step.recompute_posterior();
    }

    /// Convenience: compute all three likelihoods at once for `step`.
    fn likelihoods(&self, step: &mut CoolingStep) {
        self.prior_likelihood(&step.theta, &mut step.prior);
        self.data_likelihood(&step.theta, &mut step.data);
        self.posterior_likelihood(step);
    }

    /// Mark samples whose θ row violates any parameter set's prior
    /// support. `mask[i] != 0` means invalid.
    fn verify(&self, theta: &DMatrix<f64>, mask: &mut DVector<u32>) {
        mask.fill(0);
        for set in self.parameter_sets() {
            set.verify(theta, mask);
        }
    }

    /// Notification that a β step is about to start.
    fn top(&self, _step: &CoolingStep) {}

    /// Notification that a β step just ended.
    fn bottom(&self, _step: &CoolingStep) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::Distribution;

    #[test]
    fn assign_offsets_is_cumulative() {
        let mut sets = vec![
            ParameterSet::new("a", 2, Distribution::uniform(0.0, 1.0)),
            ParameterSet::new("b", 3, Distribution::uniform(0.0, 1.0)),
            ParameterSet::new("c", 1, Distribution::uniform(0.0, 1.0)),
        ];
        let total = assign_offsets(&mut sets);
        assert_eq!(total, 6);
        assert_eq!(sets[0].offset, 0);
        assert_eq!(sets[1].offset, 2);
        assert_eq!(sets[2].offset, 5);
    }
}
