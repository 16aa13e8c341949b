//! The Metropolis sampler (spec §4.3): a Cholesky-factored Gaussian
//! proposal walked across all chains in lockstep, with constraint
//! verification, log-domain accept/reject, and scale adaptation.
//! Grounded on `altar/bayesian/Metropolis.py`'s contract and on the
//! `rng.gen::<f64>().ln() < log_likelihood_delta` accept-rule idiom
//! from `steppers/helpers/mh_accept_reject.rs::metropolis_proposal`.

use crate::config::MetropolisConfig;
use crate::cooling_step::CoolingStep;
use crate::error::{CatmipError, Result};
use crate::model::Model;
use crate::utils::{clamp, try_cholesky};
use nalgebra::{Cholesky, DMatrix, DVector, Dynamic};
use rand::{Rng, RngCore};
use rv::dist::Gaussian;
use rv::traits::Rv;

/// Per-β-step accept/reject/invalid tallies, summed across every inner
/// `steps` iteration and (in threaded/distributed mode) across every
/// worker's slice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tallies {
    pub accepted: u64,
    pub rejected: u64,
    pub unlikely: u64,
}

impl Tallies {
    pub fn total(&self) -> u64 {
        self.accepted + self.rejected + self.unlikely
    }

    pub fn combine(&self, other: &Tallies) -> Tallies {
        Tallies {
            accepted: self.accepted + other.accepted,
            rejected: self.rejected + other.rejected,
            unlikely: self.unlikely + other.unlikely,
        }
    }
}

/// Covariance-guided Metropolis kernel.
pub struct MetropolisSampler {
    /// Current proposal scale `s`; `Σ_prop = s² · Σ`.
    pub scale: f64,
    pub acceptance_weight: f64,
    pub rejection_weight: f64,
    /// Number of lockstep chain-advance iterations per β-step.
    pub steps: usize,
}

impl MetropolisSampler {
    pub fn new(scale: f64, acceptance_weight: f64, rejection_weight: f64, steps: usize) -> Self {
        MetropolisSampler {
            scale,
            acceptance_weight,
            rejection_weight,
            steps,
        }
    }

    pub fn from_config(config: &MetropolisConfig, steps: usize) -> Self {
        MetropolisSampler::new(
            config.scaling,
            config.acceptance_weight,
            config.rejection_weight,
            steps,
        )
    }

    /// `Σ_prop = s² · Σ`; returns its lower Cholesky factor or a
    /// `NumericalConditioning` error if `Σ_prop` is not SPD.
    pub fn prepare_sampling_pdf(&self, sigma: &DMatrix<f64>) -> Result<Cholesky<f64, Dynamic>> {
        let scaled = sigma * (self.scale * self.scale);
        try_cholesky(&scaled).ok_or_else(|| {
            CatmipError::NumericalConditioning(
                "proposal covariance s^2 * Sigma is not positive definite".to_string(),
            )
        })
    }

    /// Walk every chain in `step` for `self.steps` lockstep iterations,
    /// mutating `step` in place and returning the summed tallies.
    pub fn walk_chains(
        &self,
        model: &dyn Model,
        step: &mut CoolingStep,
        rng: &mut dyn RngCore,
    ) -> Result<Tallies> {
        let chol = self.prepare_sampling_pdf(&step.sigma)?;
        let l = chol.l();
        let samples = step.samples();
        let parameters = step.parameters();
        let standard_normal = Gaussian::standard();

        let mut tallies = Tallies::default();

        for _ in 0..self.steps {
            let mut delta = DMatrix::<f64>::zeros(parameters, samples);
            for i in 0..parameters {
                for j in 0..samples {
                    delta[(i, j)] = standard_normal.draw(rng);
                }
            }
            let proposal = &l * delta;

            let mut theta_prime = step.theta.clone();
            for i in 0..samples {
                for j in 0..parameters {
                    theta_prime[(i, j)] += proposal[(j, i)];
                }
            }

            let mut mask = DVector::<u32>::zeros(samples);
            model.verify(&theta_prime, &mut mask);
            for i in 0..samples {
                if mask[i] != 0 {
                    for j in 0..parameters {
                        theta_prime[(i, j)] = step.theta[(i, j)];
                    }
                }
            }

            let mut prior_p = DVector::zeros(samples);
            let mut data_p = DVector::zeros(samples);
            model.prior_likelihood(&theta_prime, &mut prior_p);
            model.data_likelihood(&theta_prime, &mut data_p);
            let posterior_p = &prior_p + step.beta * &data_p;

            for i in 0..samples {
                if mask[i] != 0 {
                    tallies.rejected += 1;
                    continue;
                }
                let u: f64 = rng.gen();
                let log_alpha = posterior_p[i] - step.posterior[i];
                if u.ln() <= log_alpha {
                    for j in 0..parameters {
                        step.theta[(i, j)] = theta_prime[(i, j)];
                    }
                    step.prior[i] = prior_p[i];
                    step.data[i] = data_p[i];
                    step.posterior[i] = posterior_p[i];
                    tallies.accepted += 1;
                } else {
                    tallies.unlikely += 1;
                }
            }
        }

        Ok(tallies)
    }

    /// Adapt `self.scale` from the tallies of the β-step just walked.
    /// `s' = clamp((w_a·α + w_r) / (w_a + w_r), 0.1, 1.0)`; unchanged
    /// if no chain advances were tallied.
    pub fn resample(&mut self, tallies: &Tallies) {
        let total = tallies.total();
        if total == 0 {
            return;
        }
        let alpha = tallies.accepted as f64 / total as f64;
        let raw = (self.acceptance_weight * alpha + self.rejection_weight)
            / (self.acceptance_weight + self.rejection_weight);
        self.scale = clamp(raw, 0.1, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NullModel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn prepare_sampling_pdf_rejects_non_spd_sigma() {
        let sampler = MetropolisSampler::new(0.1, 8.0, 1.0, 20);
        let bad = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(sampler.prepare_sampling_pdf(&bad).is_err());
    }

    #[test]
    fn resample_clamps_scale_into_unit_interval() {
        let mut sampler = MetropolisSampler::new(0.1, 8.0, 1.0, 20);
        sampler.resample(&Tallies {
            accepted: 1000,
            rejected: 0,
            unlikely: 0,
        });
        assert!(sampler.scale <= 1.0 && sampler.scale >= 0.1);

        sampler.resample(&Tallies {
            accepted: 0,
            rejected: 1000,
            unlikely: 0,
        });
        assert!(sampler.scale >= 0.1);
    }

    #[test]
    fn resample_is_a_noop_with_zero_total() {
        let mut sampler = MetropolisSampler::new(0.4, 8.0, 1.0, 20);
        sampler.resample(&Tallies::default());
        assert_eq!(sampler.scale, 0.4);
    }

    #[test]
    fn walk_chains_tallies_sum_to_samples_times_steps() {
        let model = NullModel::new(-1.0, 1.0);
        let mut step = CoolingStep::zeros(32, 1);
        let mut rng = StdRng::seed_from_u64(11);
        model.initialize_sample(&mut step.theta, &mut rng);
        model.likelihoods(&mut step);

        let sampler = MetropolisSampler::new(0.2, 8.0, 1.0, 5);
        let tallies = sampler.walk_chains(&model, &mut step, &mut rng).unwrap();
        assert_eq!(tallies.total(), 32 * 5);
    }

    #[test]
    fn walk_chains_never_leaves_support() {
        let model = NullModel::new(-1.0, 1.0);
        let mut step = CoolingStep::zeros(16, 1);
        let mut rng = StdRng::seed_from_u64(5);
        model.initialize_sample(&mut step.theta, &mut rng);
        model.likelihoods(&mut step);

        let sampler = MetropolisSampler::new(0.3, 8.0, 1.0, 10);
        sampler.walk_chains(&model, &mut step, &mut rng).unwrap();
        for v in step.theta.iter() {
            assert!(*v >= -1.0 && *v <= 1.0);
        }
    }
}
