//! Global fit of a path model
//!
//! Compares the implied covariance matrix with the sample covariance
//! through the ML discrepancy
//!
//! ```text
//! F = ln|Σ| + tr(S Σ⁻¹) − ln|S| − k
//! ```
//!
//! and derives χ² = N·F, CFI, TLI, RMSEA and SRMR. The baseline model keeps
//! the exogenous block saturated and makes every endogenous variable
//! uncorrelated with everything else.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::base::{ModelError, Result};
use crate::inference;
use crate::linalg;

/// Fit indices of a path model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitIndices {
    pub n_obs: usize,
    /// Free parameters: paths, disturbance variances and exogenous
    /// (co)variances
    pub n_parameters: usize,
    pub chi_square: f64,
    pub df: usize,
    /// `None` for a saturated model
    pub p_value: Option<f64>,
    pub baseline_chi_square: f64,
    pub baseline_df: usize,
    pub cfi: f64,
    pub tli: f64,
    pub rmsea: f64,
    pub srmr: f64,
    pub log_likelihood: f64,
    /// Log-likelihood of the saturated model
    pub unrestricted_log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
}

impl FitIndices {
    /// Fit of `implied` to `sample` for a model whose first `n_exogenous`
    /// variables are exogenous
    pub fn compute(
        sample: &Array2<f64>,
        implied: &Array2<f64>,
        n_obs: usize,
        n_paths: usize,
        n_exogenous: usize,
    ) -> Result<Self> {
        let k = sample.nrows();
        let n = n_obs as f64;
        let kx = n_exogenous;
        let n_endogenous = k - kx;
        let moments = k * (k + 1) / 2;
        let exogenous_moments = kx * (kx + 1) / 2;

        let n_parameters = n_paths + n_endogenous + exogenous_moments;
        let df = moments.saturating_sub(n_parameters);

        let log_det_s = linalg::log_det_spd(sample)
            .ok_or_else(|| ModelError::singular("sample covariance matrix"))?;
        let (f_model, log_det_sigma, trace) = discrepancy(sample, implied, log_det_s)?;
        let chi_square = (n * f_model).max(0.0);

        let baseline = baseline_covariance(sample, kx);
        let baseline_df = moments - (exogenous_moments + n_endogenous);
        let (f_baseline, _, _) = discrepancy(sample, &baseline, log_det_s)?;
        let baseline_chi_square = (n * f_baseline).max(0.0);

        let excess = (chi_square - df as f64).max(0.0);
        let baseline_excess = (baseline_chi_square - baseline_df as f64).max(0.0);
        let denominator = excess.max(baseline_excess);
        let cfi = if denominator > 0.0 {
            1.0 - excess / denominator
        } else {
            1.0
        };

        let tli = if df == 0 || baseline_df == 0 {
            1.0
        } else {
            let baseline_ratio = baseline_chi_square / baseline_df as f64;
            let ratio = chi_square / df as f64;
            if baseline_ratio - 1.0 > 0.0 {
                (baseline_ratio - ratio) / (baseline_ratio - 1.0)
            } else {
                1.0
            }
        };

        let rmsea = if df > 0 {
            (excess / (df as f64 * n)).sqrt()
        } else {
            0.0
        };

        let ln_2pi = (2.0 * std::f64::consts::PI).ln();
        let kf = k as f64;
        let log_likelihood = -0.5 * n * (kf * ln_2pi + log_det_sigma + trace);
        let unrestricted_log_likelihood = -0.5 * n * (kf * ln_2pi + log_det_s + kf);
        let q = n_parameters as f64;

        Ok(Self {
            n_obs,
            n_parameters,
            chi_square,
            df,
            p_value: (df > 0).then(|| inference::pvalue_chi2(chi_square, df as f64)),
            baseline_chi_square,
            baseline_df,
            cfi,
            tli,
            rmsea,
            srmr: srmr(sample, implied),
            log_likelihood,
            unrestricted_log_likelihood,
            aic: -2.0 * log_likelihood + 2.0 * q,
            bic: -2.0 * log_likelihood + n.ln() * q,
        })
    }
}

/// Returns `(F, ln|Σ|, tr(SΣ⁻¹))`
fn discrepancy(
    sample: &Array2<f64>,
    sigma: &Array2<f64>,
    log_det_s: f64,
) -> Result<(f64, f64, f64)> {
    let k = sample.nrows() as f64;
    let log_det_sigma = linalg::log_det_spd(sigma)
        .ok_or_else(|| ModelError::singular("implied covariance matrix"))?;
    let sigma_inv = linalg::spd_inverse(sigma, "implied covariance matrix")?;
    let trace = sample.dot(&sigma_inv).diag().sum();
    Ok((log_det_sigma + trace - log_det_s - k, log_det_sigma, trace))
}

fn baseline_covariance(sample: &Array2<f64>, n_exogenous: usize) -> Array2<f64> {
    let k = sample.nrows();
    Array2::from_shape_fn((k, k), |(i, j)| {
        if i == j || (i < n_exogenous && j < n_exogenous) {
            sample[[i, j]]
        } else {
            0.0
        }
    })
}

/// Root mean square of correlation residuals over the lower triangle,
/// diagonal included
fn srmr(sample: &Array2<f64>, implied: &Array2<f64>) -> f64 {
    let k = sample.nrows();
    let mut sum = 0.0;
    let mut count = 0usize;
    for i in 0..k {
        for j in 0..=i {
            let observed = sample[[i, j]] / (sample[[i, i]] * sample[[j, j]]).sqrt();
            let fitted = implied[[i, j]] / (implied[[i, i]] * implied[[j, j]]).sqrt();
            sum += (observed - fitted).powi(2);
            count += 1;
        }
    }
    (sum / count as f64).sqrt()
}
