//! CATMIP: a parallel transitional Markov-chain Monte Carlo engine.
//!
//! This crate implements the core of a Bayesian inference engine that
//! approximates a posterior density over a real-valued parameter vector
//! θ ∈ ℝᴾ by transitional MCMC with an annealing schedule (the CATMIP /
//! Ching-Chen method). It orchestrates a tempered sequence of Markov
//! chains, a covariance-guided Metropolis kernel, a resampling scheduler
//! targeting a coefficient of variation of importance weights, and a
//! worker hierarchy that composes in-process concurrency with
//! distributed execution.

extern crate alga;
extern crate csv;
extern crate log;
extern crate nalgebra;
extern crate num_traits;
extern crate rand;
extern crate rand_xoshiro;
extern crate rayon;
extern crate rv;

#[cfg(feature = "serde_support")]
#[macro_use]
extern crate serde_derive;

pub mod annealer;
pub mod archiver;
pub mod config;
pub mod cooling_step;
pub mod dispatcher;
pub mod distribution;
pub mod error;
pub mod model;
pub mod monitor;
pub mod parameter_set;
pub mod rng;
pub mod sampler;
pub mod scheduler;
pub mod utils;
pub mod worker;

pub use annealer::Annealer;
pub use cooling_step::CoolingStep;
pub use distribution::Distribution;
pub use error::{CatmipError, Result};
pub use model::Model;
pub use parameter_set::ParameterSet;
