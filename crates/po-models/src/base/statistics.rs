//! Fit-level statistics attached to every summary

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use po_core::data::quantile_sorted;

/// Whole-model statistics. Each fitter fills what it defines: OLS the full
/// set, robust fits R² and the robust scale, Bayesian fits the posterior
/// mean of σ, path models the ML log-likelihood and information criteria.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelStatistics {
    pub r_squared: Option<f64>,
    pub adj_r_squared: Option<f64>,
    /// s for OLS, the final robust scale for M-estimators
    pub residual_std_error: Option<f64>,
    pub f_statistic: Option<f64>,
    pub f_p_value: Option<f64>,
    pub log_likelihood: Option<f64>,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
    pub df_residual: Option<usize>,
    pub df_model: Option<usize>,
    /// IRLS iterations; `None` for closed-form fits
    pub iterations: Option<usize>,
    pub converged: Option<bool>,
}

/// Five-number summary of the residuals plus their mean and spread
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResidualStatistics {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl ResidualStatistics {
    pub fn from_residuals(residuals: &Array1<f64>) -> Self {
        let n = residuals.len();
        if n == 0 {
            return Self::default();
        }

        let mut sorted = residuals.to_vec();
        sorted.sort_by(f64::total_cmp);

        Self {
            min: sorted[0],
            q1: quantile_sorted(&sorted, 0.25),
            median: quantile_sorted(&sorted, 0.5),
            q3: quantile_sorted(&sorted, 0.75),
            max: sorted[n - 1],
            mean: residuals.sum() / n as f64,
            std_dev: if n > 1 { residuals.std(1.0) } else { 0.0 },
        }
    }
}

/// Σ(eₜ − eₜ₋₁)² / Σeₜ² in case order. `None` below two cases or when
/// every residual is zero.
pub fn durbin_watson(residuals: &Array1<f64>) -> Option<f64> {
    let ss: f64 = residuals.dot(residuals);
    if residuals.len() < 2 || ss < 1e-20 {
        return None;
    }

    let successive: f64 = residuals
        .windows(2)
        .into_iter()
        .map(|pair| (pair[1] - pair[0]).powi(2))
        .sum();

    Some(successive / ss)
}
