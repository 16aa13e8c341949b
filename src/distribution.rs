//! `Distribution`: the prior-family abstraction of spec §3.
//!
//! A closed set of variants over a small capability set
//! (`draw`, `prior_ln_f`, `in_support`, `density`), matching the
//! "protocol dispatch over distributions" strategy from spec §9: a
//! capability trait plus an enum of concrete implementations, no runtime
//! inheritance hierarchy.

use rand::Rng;
use rv::dist::{Gaussian, Uniform};
use rv::traits::Rv;

/// Capability set every prior family must provide.
pub trait DistributionOps {
    /// Draw a single value from this distribution.
    fn draw(&self, rng: &mut dyn rand::RngCore) -> f64;
    /// Log-density of `x` under this distribution (the "prior
    /// likelihood" of a single scalar value).
    fn prior_ln_f(&self, x: f64) -> f64;
    /// Whether `x` lies in this distribution's support.
    fn in_support(&self, x: f64) -> bool;
    /// Density of `x` under this distribution.
    fn density(&self, x: f64) -> f64;
}

/// A prior family, one of the closed set of variants the engine
/// recognizes.
#[derive(Clone, Debug)]
pub enum Distribution {
    /// Uniform over `[low, high]`.
    Uniform { low: f64, high: f64 },
    /// Gaussian with the given mean and standard deviation.
    Gaussian { mean: f64, std: f64 },
    /// Standard normal, `N(0, 1)`.
    UnitGaussian,
}

impl Distribution {
    /// A uniform distribution with the given bounds.
    pub fn uniform(low: f64, high: f64) -> Self {
        Distribution::Uniform { low, high }
    }

    /// A Gaussian distribution with the given mean and standard
    /// deviation.
    pub fn gaussian(mean: f64, std: f64) -> Self {
        Distribution::Gaussian { mean, std }
    }

    /// The standard normal distribution.
    pub fn unit_gaussian() -> Self {
        Distribution::UnitGaussian
    }
}

impl DistributionOps for Distribution {
    fn draw(&self, rng: &mut dyn rand::RngCore) -> f64 {
        match self {
            Distribution::Uniform { low, high } => {
                let dist = Uniform::new(*low, *high).expect("invalid uniform bounds");
                dist.draw(rng)
            }
            Distribution::Gaussian { mean, std } => {
                let dist = Gaussian::new(*mean, *std).expect("invalid gaussian parameters");
                dist.draw(rng)
            }
            Distribution::UnitGaussian => {
                let dist = Gaussian::standard();
                dist.draw(rng)
            }
        }
    }

    fn prior_ln_f(&self, x: f64) -> f64 {
        match self {
            Distribution::Uniform { low, high } => {
                if x < *low || x > *high {
                    std::f64::NEG_INFINITY
                } else {
                    Uniform::new(*low, *high)
                        .expect("invalid uniform bounds")
                        .ln_f(&x)
                }
            }
            Distribution::Gaussian { mean, std } => Gaussian::new(*mean, *std)
                .expect("invalid gaussian parameters")
                .ln_f(&x),
            Distribution::UnitGaussian => Gaussian::standard().ln_f(&x),
        }
    }

    fn in_support(&self, x: f64) -> bool {
        match self {
            Distribution::Uniform { low, high } => x >= *low && x <= *high,
            Distribution::Gaussian { .. } | Distribution::UnitGaussian => x.is_finite(),
        }
    }

    fn density(&self, x: f64) -> f64 {
        self.prior_ln_f(x).exp()
    }
}

/// Draw from a `Distribution` using a generic `Rng`, for call sites that
/// already hold a concrete RNG type and do not want to go through
/// `dyn RngCore`.
pub fn draw_with<R: Rng + ?Sized>(dist: &Distribution, rng: &mut R) -> f64 {
    dist.draw(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn uniform_support() {
        let d = Distribution::uniform(-1.0, 1.0);
        assert!(d.in_support(0.0));
        assert!(!d.in_support(2.0));
        assert!(d.prior_ln_f(2.0).is_infinite());
        assert!(d.prior_ln_f(2.0).is_sign_negative());
    }

    #[test]
    fn uniform_draw_stays_in_support() {
        let d = Distribution::uniform(-1.0, 1.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let x = draw_with(&d, &mut rng);
            assert!(d.in_support(x));
        }
    }

    #[test]
    fn unit_gaussian_matches_gaussian_zero_one() {
        let a = Distribution::unit_gaussian();
        let b = Distribution::gaussian(0.0, 1.0);
        assert!((a.prior_ln_f(0.3) - b.prior_ln_f(0.3)).abs() < 1e-12);
    }

    #[test]
    fn gaussian_is_always_in_support() {
        let d = Distribution::gaussian(0.0, 1.0);
        assert!(d.in_support(1000.0));
        assert!(d.in_support(-1000.0));
    }
}
