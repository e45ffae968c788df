//! Linear model diagnostics
//!
//! This module provides diagnostic tools for linear regression models:
//! per-case residuals and influence measures, an outlier screen based on
//! standardized residuals, normal Q-Q coordinates, the Durbin-Watson
//! statistic and variance inflation factors. Computing diagnostics for a
//! fitted model never fails.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::base::statistics::durbin_watson;
use crate::base::{FittedModel, ResidualStatistics};
use crate::inference::normal_quantile;
use crate::linalg;
use crate::lm::result::LinearRegressionResult;
use po_core::formula::INTERCEPT;

/// Thresholds used to flag cases
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Cook's distance above which a case is influential
    pub cooks_threshold: f64,
    /// |standardized residual| above which a case is a candidate outlier
    pub outlier_threshold: f64,
    /// Leverage above `multiplier · p / n` is high
    pub leverage_multiplier: f64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            cooks_threshold: 1.0,
            outlier_threshold: 3.0,
            leverage_multiplier: 2.0,
        }
    }
}

/// Diagnostics of a single case
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    /// 1-based case number
    pub case: usize,
    pub residual: f64,
    pub standardized_residual: f64,
    pub studentized_residual: f64,
    pub leverage: f64,
    pub cooks_distance: f64,
    pub influential: bool,
    pub high_leverage: bool,
    pub candidate_outlier: bool,
}

/// Share of cases whose |standardized residual| exceeds the usual cut-offs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualProportions {
    pub above_1_96: f64,
    pub above_2_58: f64,
    pub above_3_0: f64,
}

/// One point of a normal Q-Q plot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QqPoint {
    pub theoretical: f64,
    pub sample: f64,
}

/// Variance Inflation Factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vif {
    pub variable: String,
    pub vif: f64,
    pub tolerance: f64,
}

/// Durbin-Watson test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurbinWatson {
    pub statistic: f64,
    /// Implied lag-one autocorrelation, 1 − d/2
    pub autocorrelation: f64,
}

/// Diagnostic results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionDiagnostics {
    pub records: Vec<DiagnosticRecord>,
    pub proportions: ResidualProportions,
    /// Case numbers with Cook's distance above the threshold
    pub influential_cases: Vec<usize>,
    /// Case numbers with |standardized residual| above the outlier threshold
    pub candidate_outliers: Vec<usize>,
    /// Case numbers with high leverage
    pub high_leverage_cases: Vec<usize>,
    pub leverage_threshold: f64,
    pub qq: Vec<QqPoint>,
    pub durbin_watson: Option<DurbinWatson>,
    pub vif: Vec<Vif>,
    pub residual_statistics: ResidualStatistics,
}

impl RegressionDiagnostics {
    /// Compute all diagnostics of a fitted OLS result
    pub fn compute(result: &LinearRegressionResult, config: &DiagnosticsConfig) -> Self {
        let n = result.n_obs();
        let p = result.n_predictors();
        let s2 = result.sigma().powi(2);
        let perfect_fit = result.is_perfect_fit();
        let leverage_threshold = config.leverage_multiplier * p as f64 / n as f64;

        let standardized = result.standardized_residuals();
        let studentized = result.studentized_residuals();

        let records: Vec<DiagnosticRecord> = (0..n)
            .map(|i| {
                let e = result.residuals[i];
                let h = result.hat_diagonal[i];
                let cooks_distance = if perfect_fit { 0.0 } else { cooks_distance(e, h, p, s2) };
                let z = standardized[i];
                DiagnosticRecord {
                    case: i + 1,
                    residual: e,
                    standardized_residual: z,
                    studentized_residual: studentized[i],
                    leverage: h,
                    cooks_distance,
                    influential: cooks_distance > config.cooks_threshold,
                    high_leverage: h > leverage_threshold,
                    candidate_outlier: z.abs() > config.outlier_threshold,
                }
            })
            .collect();

        let share = |cut: f64| {
            records.iter().filter(|r| r.standardized_residual.abs() > cut).count() as f64 / n as f64
        };
        let proportions = ResidualProportions {
            above_1_96: share(1.96),
            above_2_58: share(2.58),
            above_3_0: share(3.0),
        };

        let cases = |flag: fn(&DiagnosticRecord) -> bool| -> Vec<usize> {
            records.iter().filter(|r| flag(r)).map(|r| r.case).collect()
        };
        let influential_cases = cases(|r| r.influential);
        let candidate_outliers = cases(|r| r.candidate_outlier);
        let high_leverage_cases = cases(|r| r.high_leverage);

        if !influential_cases.is_empty() || !candidate_outliers.is_empty() {
            tracing::info!(
                influential = ?influential_cases,
                outliers = ?candidate_outliers,
                "flagged cases in regression diagnostics"
            );
        }

        Self {
            proportions,
            influential_cases,
            candidate_outliers,
            high_leverage_cases,
            leverage_threshold,
            qq: Diagnostics::qq_points(&standardized),
            durbin_watson: Diagnostics::durbin_watson(result.residuals()),
            vif: Diagnostics::vif(&result.x, &result.variable_names),
            residual_statistics: ResidualStatistics::from_residuals(result.residuals()),
            records,
        }
    }

    /// Record of a 1-based case number
    pub fn case(&self, case: usize) -> Option<&DiagnosticRecord> {
        case.checked_sub(1).and_then(|i| self.records.get(i))
    }

    pub fn cooks_distances(&self) -> Array1<f64> {
        self.records.iter().map(|r| r.cooks_distance).collect()
    }

    pub fn leverages(&self) -> Array1<f64> {
        self.records.iter().map(|r| r.leverage).collect()
    }

    pub fn standardized_residuals(&self) -> Array1<f64> {
        self.records.iter().map(|r| r.standardized_residual).collect()
    }
}

/// e² h / (p s² (1 − h)²)
fn cooks_distance(e: f64, h: f64, p: usize, s2: f64) -> f64 {
    if 1.0 - h <= 1e-12 {
        return 0.0;
    }
    (e * e * h / (p as f64 * s2 * (1.0 - h).powi(2))).max(0.0)
}

/// Diagnostic analyzer
pub struct Diagnostics;

impl Diagnostics {
    /// Calculate Variance Inflation Factors
    ///
    /// Each non-intercept column is regressed on the remaining columns plus
    /// an intercept; VIF = 1 / (1 − R²).
    pub fn vif(x: &Array2<f64>, variable_names: &[String]) -> Vec<Vif> {
        let predictors: Vec<usize> = (0..x.ncols())
            .filter(|&j| variable_names.get(j).is_none_or(|n| n != INTERCEPT))
            .collect();
        let n = x.nrows();

        predictors
            .iter()
            .map(|&j| {
                let others: Vec<usize> = predictors.iter().copied().filter(|&k| k != j).collect();
                let vif = if others.is_empty() {
                    1.0
                } else {
                    let mut design = Array2::ones((n, others.len() + 1));
                    for (c, &k) in others.iter().enumerate() {
                        design.column_mut(c + 1).assign(&x.column(k));
                    }
                    let target = x.column(j).to_owned();
                    match auxiliary_r_squared(&design, &target) {
                        Some(r2) if r2 < 1.0 => 1.0 / (1.0 - r2),
                        _ => f64::INFINITY,
                    }
                };

                Vif {
                    variable: variable_names
                        .get(j)
                        .cloned()
                        .unwrap_or_else(|| format!("x{}", j)),
                    vif,
                    tolerance: 1.0 / vif,
                }
            })
            .collect()
    }

    /// Durbin-Watson statistic with its implied autocorrelation
    pub fn durbin_watson(residuals: &Array1<f64>) -> Option<DurbinWatson> {
        durbin_watson(residuals).map(|statistic| DurbinWatson {
            statistic,
            autocorrelation: 1.0 - statistic / 2.0,
        })
    }

    /// Sorted sample values against normal quantiles at Blom-type plotting
    /// positions (a = 3/8 for n ≤ 10, else 1/2)
    pub fn qq_points(values: &Array1<f64>) -> Vec<QqPoint> {
        let n = values.len();
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let a = if n <= 10 { 0.375 } else { 0.5 };
        sorted
            .into_iter()
            .enumerate()
            .map(|(i, sample)| QqPoint {
                theoretical: normal_quantile((i as f64 + 1.0 - a) / (n as f64 + 1.0 - 2.0 * a)),
                sample,
            })
            .collect()
    }
}

fn auxiliary_r_squared(design: &Array2<f64>, target: &Array1<f64>) -> Option<f64> {
    let xtx = design.t().dot(design);
    let beta = linalg::solve_spd(&xtx, &design.t().dot(target), "auxiliary regression").ok()?;
    let resid = target - &design.dot(&beta);
    let mean = target.mean()?;
    let tss = target.mapv(|v| (v - mean).powi(2)).sum();
    if tss <= 0.0 {
        return None;
    }
    Some(1.0 - resid.mapv(|r| r * r).sum() / tss)
}

