//! A weighted-least-squares ("linear Gaussian") reference model: `G θ = d`
//! with data covariance `C_d` (spec §4.5, scenario 3 of §8). Grounded on
//! the data-likelihood formula spelled out in `altar/models/Bayesian.py`.

use crate::distribution::Distribution;
use crate::error::{CatmipError, Result};
use crate::model::{assign_offsets, Model};
use crate::parameter_set::ParameterSet;
use nalgebra::{Cholesky, DMatrix, DVector, Dynamic};
use rayon::prelude::*;

/// `data_LLK_i = Z - 1/2 * ||G θ_i - d||^2_{C_d^-1}`, where
/// `Z = -1/2 * (N_obs * ln(2π) + ln det C_d)`.
pub struct LinearGaussianModel {
    sets: Vec<ParameterSet>,
    g: DMatrix<f64>,
    d: DVector<f64>,
    cd_chol: Cholesky<f64, Dynamic>,
    log_norm: f64,
}

impl LinearGaussianModel {
    /// Build a linear Gaussian model from a Green's-function-like
    /// matrix `g` (`N_obs x P`), a data vector `d` (`N_obs`), a data
    /// covariance `cd` (`N_obs x N_obs`, must be SPD), and a shared
    /// prior over every θ component.
    pub fn new(g: DMatrix<f64>, d: DVector<f64>, cd: DMatrix<f64>, prior: Distribution) -> Result<Self> {
        let n_obs = d.len();
        if g.nrows() != n_obs {
            return Err(CatmipError::Config(format!(
                "G has {} rows but d has {} entries",
                g.nrows(),
                n_obs
            )));
        }
        let p = g.ncols();
        let mut sets = vec![ParameterSet::new("theta", p, prior)];
        assign_offsets(&mut sets);

        let cd_chol = Cholesky::new(cd).ok_or_else(|| {
            CatmipError::NumericalConditioning("data covariance C_d is not SPD".to_string())
        })?;

        let log_det_cd: f64 = 2.0 * cd_chol.l().diagonal().iter().map(|v| v.ln()).sum::<f64>();
        if !log_det_cd.is_finite() {
            return Err(CatmipError::NumericalConditioning(
                "det(C_d) <= 0".to_string(),
            ));
        }
        let log_norm = -0.5 * (n_obs as f64 * (2.0 * std::f64::consts::PI).ln() + log_det_cd);

        Ok(LinearGaussianModel {
            sets,
            g,
            d,
            cd_chol,
            log_norm,
        })
    }
}

impl Model for LinearGaussianModel {
    fn parameter_sets(&self) -> &[ParameterSet] {
        &self.sets
    }

    fn data_likelihood(&self, theta: &DMatrix<f64>, data: &mut DVector<f64>) {
        let samples = theta.nrows();
        let values: Vec<f64> = (0..samples)
            .into_par_iter()
            .map(|i| {
                let theta_i = theta.row(i).transpose();
                let residual = &self.g * theta_i - &self.d;
                let solved = self.cd_chol.solve(&residual);
                let mahalanobis = residual.dot(&solved);
                self.log_norm - 0.5 * mahalanobis
            })
            .collect();
        for (i, v) in values.into_iter().enumerate() {
            data[i] = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_problem() -> LinearGaussianModel {
        let g = DMatrix::identity(4, 4);
        let d = DVector::from_vec(vec![0.1, -0.2, 0.3, -0.4]);
        let cd = DMatrix::from_diagonal(&DVector::from_vec(vec![1e-4, 1e-4, 1e-4, 1e-4]));
        LinearGaussianModel::new(g, d, cd, Distribution::uniform(-1.0, 1.0)).unwrap()
    }

    #[test]
    fn zero_residual_gives_maximum_likelihood() {
        let model = identity_problem();
        let theta = DMatrix::from_row_slice(1, 4, &[0.1, -0.2, 0.3, -0.4]);
        let mut data = DVector::zeros(1);
        model.data_likelihood(&theta, &mut data);
        assert!((data[0] - model.log_norm).abs() < 1e-9);
    }

    #[test]
    fn larger_residual_gives_lower_likelihood() {
        let model = identity_problem();
        let theta = DMatrix::from_row_slice(
            2,
            4,
            &[0.1, -0.2, 0.3, -0.4, 1.1, -1.2, 1.3, -1.4],
        );
        let mut data = DVector::zeros(2);
        model.data_likelihood(&theta, &mut data);
        assert!(data[0] > data[1]);
    }

    #[test]
    fn rejects_non_spd_covariance() {
        let g = DMatrix::identity(2, 2);
        let d = DVector::from_vec(vec![0.0, 0.0]);
        let bad_cd = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        let result = LinearGaussianModel::new(g, d, bad_cd, Distribution::uniform(-1.0, 1.0));
        assert!(result.is_err());
    }
}
