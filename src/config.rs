//! Configuration data (spec §6). This module holds plain, optionally
//! `serde`-deserializable structs mirroring the recognized configuration
//! surface. Loading a `Config` from a CLI or a config file is an
//! external concern and is not implemented here.

#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct CovConfig {
    /// Target coefficient of variation for the re-weighted likelihoods.
    pub target: f64,
    /// Fractional tolerance for attaining `target`.
    pub tolerance: f64,
    /// Maximum number of root-finder iterations.
    pub maxiter: usize,
}

impl Default for CovConfig {
    fn default() -> Self {
        CovConfig {
            target: 1.0,
            tolerance: 0.01,
            maxiter: 1_000,
        }
    }
}

#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct MetropolisConfig {
    /// Initial/current proposal scaling factor `s`.
    pub scaling: f64,
    /// Weight `w_a` applied to the acceptance ratio during adaptation.
    pub acceptance_weight: f64,
    /// Weight `w_r` applied to the previous scale during adaptation.
    pub rejection_weight: f64,
}

impl Default for MetropolisConfig {
    fn default() -> Self {
        MetropolisConfig {
            scaling: 0.1,
            acceptance_weight: 8.0,
            rejection_weight: 1.0,
        }
    }
}

#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RngAlgorithm {
    /// `rand::rngs::StdRng` (ChaCha-based).
    Standard,
    /// `rand_xoshiro::Xoshiro256StarStar`.
    Xoshiro256StarStar,
}

impl Default for RngAlgorithm {
    fn default() -> Self {
        RngAlgorithm::Standard
    }
}

#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct RngConfig {
    /// Base seed; per-worker streams are derived from this via
    /// [`crate::rng::partition_seed`].
    pub seed: u64,
    /// Which generator algorithm to use.
    pub algorithm: RngAlgorithm,
}

impl Default for RngConfig {
    fn default() -> Self {
        RngConfig {
            seed: 0,
            algorithm: RngAlgorithm::Standard,
        }
    }
}

#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobMode {
    /// Single process, no distributed transport.
    Local,
    /// Distributed execution across ranks via a `Communicator`.
    Mpi,
}

impl Default for JobMode {
    fn default() -> Self {
        JobMode::Local
    }
}

#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct JobConfig {
    /// Number of distributed hosts. [`crate::worker::build_worker`] sizes
    /// the MPI rank group to this value (`hosts.max(1)`); ignored outside
    /// `JobMode::Mpi`.
    pub hosts: usize,
    /// Number of worker tasks (threads) per rank.
    pub tasks: usize,
    /// Number of GPUs available per rank.
    pub gpus: usize,
    /// Execution mode.
    pub mode: JobMode,
}

impl Default for JobConfig {
    fn default() -> Self {
        JobConfig {
            hosts: 1,
            tasks: 1,
            gpus: 0,
            mode: JobMode::Local,
        }
    }
}

#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Number of Markov chains `S`.
    pub chains: usize,
    /// Total θ dimension `P`, verified against the sum of parameter-set
    /// counts at `Model` initialization.
    pub parameters: usize,
    /// Inner chain length per β-step.
    pub steps: usize,
    /// β-convergence tolerance.
    pub tolerance: f64,
    pub cov: CovConfig,
    pub metropolis: MetropolisConfig,
    pub rng: RngConfig,
    pub job: JobConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chains: 1_000,
            parameters: 1,
            steps: 20,
            tolerance: 1e-3,
            cov: CovConfig::default(),
            metropolis: MetropolisConfig::default(),
            rng: RngConfig::default(),
            job: JobConfig::default(),
        }
    }
}

impl Config {
    /// Validate the configuration against the boundary cases in spec §8:
    /// `S = 1` is rejected (the COV scheduler degenerates), `P = 0` is
    /// rejected, and `tolerance >= 1` is accepted (it just makes the
    /// cooling loop exit immediately).
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.chains <= 1 {
            return Err(crate::error::CatmipError::Config(format!(
                "chains must be greater than 1 for the COV scheduler to be well defined, got {}",
                self.chains
            )));
        }
        if self.parameters == 0 {
            return Err(crate::error::CatmipError::Config(
                "a model with zero parameters is not permitted".to_string(),
            ));
        }
        if self.steps == 0 {
            return Err(crate::error::CatmipError::Config(
                "steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn single_chain_is_rejected() {
        let cfg = Config {
            chains: 1,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_parameters_is_rejected() {
        let cfg = Config {
            parameters: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn tolerance_at_least_one_is_still_valid_config() {
        let cfg = Config {
            tolerance: 1.5,
            ..Config::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
