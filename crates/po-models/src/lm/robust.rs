//! Robust linear regression by M-estimation
//!
//! Coefficients are found by iteratively reweighted least squares starting
//! from the OLS solution. Each iteration re-estimates the residual scale by
//! the normalized median absolute residual and reweights cases with the
//! chosen ψ function. Standard errors use Huber's correction of the
//! asymptotic sandwich, as in `MASS::rlm`.
//!
//! A fitted model also carries a test comparing the robust and OLS
//! coefficient vectors. A significant result suggests that the OLS
//! estimates are pulled by cases the robust fit downweights.

use ndarray::Axis;
use serde::{Deserialize, Serialize};

use crate::base::{
    Coefficient, FittedModel, ModelError, ModelStatistics, ModelSummary, ModelType,
    ResidualStatistics, Result,
};
use crate::inference;
use crate::linalg;
use crate::lm::ols::{self, Matrix, Vector};
use crate::lm::result::LinearRegressionResult;
use crate::lm::{LinearConfig, RobustMethod};
use po_core::data::DataFrame;
use po_core::formula::Formula;

// ==================== Configuration ====================

/// Consistency constant of the MAD under normality
const MAD_CONSTANT: f64 = 0.6745;

/// Robust regression configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobustConfig {
    /// ψ function
    pub method: RobustMethod,
    /// Tuning constant; the method's default when `None`
    pub tuning: Option<f64>,
    /// Maximum IRLS iterations
    pub max_iterations: usize,
    /// Relative change in residuals below which IRLS stops
    pub tolerance: f64,
    /// Confidence level for intervals
    pub confidence_level: f64,
    /// Significance level of the OLS bias test
    pub bias_alpha: f64,
}

impl Default for RobustConfig {
    fn default() -> Self {
        Self {
            method: RobustMethod::Huber,
            tuning: None,
            max_iterations: 50,
            tolerance: 1e-8,
            confidence_level: 0.95,
            bias_alpha: 0.05,
        }
    }
}

impl RobustConfig {
    /// Default settings for the given method
    pub fn new(method: RobustMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Effective tuning constant
    pub fn tuning_constant(&self) -> f64 {
        self.tuning.unwrap_or_else(|| self.method.default_tuning())
    }

    fn validate(&self) -> Result<()> {
        if self.tuning_constant() <= 0.0 {
            return Err(ModelError::invalid_config("tuning constant must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(ModelError::invalid_config("max_iterations must be at least 1"));
        }
        if !(self.bias_alpha > 0.0 && self.bias_alpha < 1.0) {
            return Err(ModelError::invalid_config(format!(
                "bias test alpha must lie in (0, 1), got {}",
                self.bias_alpha
            )));
        }
        Ok(())
    }
}

// ==================== ψ Functions ====================

impl RobustMethod {
    /// Conventional tuning constant (95% efficiency at the normal for
    /// Huber and bisquare, `a` of the 2-4-8 Hampel function)
    pub fn default_tuning(self) -> f64 {
        match self {
            RobustMethod::Huber => 1.345,
            RobustMethod::Bisquare => 4.685,
            RobustMethod::Hampel => 2.0,
        }
    }

    /// ψ(u)
    pub fn psi(self, u: f64, k: f64) -> f64 {
        let a = u.abs();
        match self {
            RobustMethod::Huber => u.clamp(-k, k),
            RobustMethod::Bisquare => {
                if a <= k {
                    u * (1.0 - (u / k).powi(2)).powi(2)
                } else {
                    0.0
                }
            }
            RobustMethod::Hampel => {
                let (b, c) = (2.0 * k, 4.0 * k);
                let magnitude = if a <= k {
                    a
                } else if a <= b {
                    k
                } else if a <= c {
                    k * (c - a) / (c - b)
                } else {
                    0.0
                };
                magnitude * u.signum()
            }
        }
    }

    /// ψ'(u)
    pub fn psi_deriv(self, u: f64, k: f64) -> f64 {
        let a = u.abs();
        match self {
            RobustMethod::Huber => {
                if a <= k {
                    1.0
                } else {
                    0.0
                }
            }
            RobustMethod::Bisquare => {
                if a <= k {
                    let t = (u / k).powi(2);
                    (1.0 - t) * (1.0 - 5.0 * t)
                } else {
                    0.0
                }
            }
            RobustMethod::Hampel => {
                let (b, c) = (2.0 * k, 4.0 * k);
                if a <= k {
                    1.0
                } else if a <= b {
                    0.0
                } else if a <= c {
                    -k / (c - b)
                } else {
                    0.0
                }
            }
        }
    }

    /// Asymptotic efficiency relative to OLS under standard normal errors,
    /// (E ψ')² / E ψ², by trapezoid quadrature
    pub fn gaussian_efficiency(self, k: f64) -> f64 {
        const POINTS: usize = 8001;
        const LIMIT: f64 = 10.0;
        let step = 2.0 * LIMIT / (POINTS - 1) as f64;
        let norm = 1.0 / (2.0 * std::f64::consts::PI).sqrt();

        let (mut e_deriv, mut e_sq) = (0.0, 0.0);
        for i in 0..POINTS {
            let u = -LIMIT + step * i as f64;
            let w = if i == 0 || i == POINTS - 1 { 0.5 } else { 1.0 };
            let density = norm * (-0.5 * u * u).exp() * w * step;
            e_deriv += self.psi_deriv(u, k) * density;
            e_sq += self.psi(u, k).powi(2) * density;
        }
        e_deriv * e_deriv / e_sq
    }

    /// IRLS weight ψ(u)/u
    pub fn weight(self, u: f64, k: f64) -> f64 {
        if u == 0.0 {
            1.0
        } else {
            self.psi(u, k) / u
        }
    }
}

// ==================== OLS Bias Test ====================

/// Coefficient-wise comparison of the robust and OLS fits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientDiscrepancy {
    /// Design column name
    pub name: String,
    /// OLS estimate
    pub ols: f64,
    /// M-estimate
    pub robust: f64,
    /// robust − OLS
    pub difference: f64,
    /// |β_rob − β_ols| / SE_ols
    pub standardized: f64,
    /// Difference over its null standard deviation
    pub z: f64,
}

/// Test of OLS bias against the robust fit
///
/// Under normal errors OLS is efficient, so the difference of the two
/// estimators has covariance `σ² (1/eff − 1) (X'X)⁻¹`, with `eff` the
/// Gaussian efficiency of the ψ function and σ the robust scale. The
/// statistic `d' V⁻¹ d` is referred to χ² with rank(V) degrees of freedom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasTest {
    /// Wald statistic d' V⁺ d
    pub statistic: f64,
    /// rank(V)
    pub df: usize,
    /// Upper χ² tail of `statistic`
    pub p_value: f64,
    /// Significance level the decision uses
    pub alpha: f64,
    /// Gaussian efficiency of the robust estimator
    pub efficiency: f64,
    /// Whether the OLS estimates are probably biased
    pub biased: bool,
    /// One entry per design column
    pub discrepancies: Vec<CoefficientDiscrepancy>,
}

impl BiasTest {
    /// Compare a robust fit with the OLS fit of the same design
    pub fn compute(
        ols: &LinearRegressionResult,
        robust_coefficients: &Vector,
        scale: f64,
        efficiency: f64,
        alpha: f64,
    ) -> Self {
        let d = robust_coefficients - &ols.coefficients;
        let inflation = (1.0 / efficiency - 1.0).max(0.0);
        let v_diff = &ols.xtx_inv * (scale * scale * inflation);
        let v_ols = ols.classical_covariance();

        let (statistic, df) = linalg::psd_quadratic_form(&v_diff, &d, 1e-10);
        let p_value = if df > 0 {
            inference::pvalue_chi2(statistic, df as f64)
        } else {
            1.0
        };

        let discrepancies = ols
            .variable_names
            .iter()
            .enumerate()
            .map(|(j, name)| CoefficientDiscrepancy {
                name: name.clone(),
                ols: ols.coefficients[j],
                robust: robust_coefficients[j],
                difference: d[j],
                standardized: d[j].abs() / v_ols[[j, j]].sqrt(),
                z: d[j] / v_diff[[j, j]].sqrt(),
            })
            .collect();

        Self {
            statistic,
            df,
            p_value,
            alpha,
            efficiency,
            biased: p_value < alpha,
            discrepancies,
        }
    }
}

// ==================== Robust Regression Result ====================

/// Robust regression result
#[derive(Debug, Clone)]
pub struct RobustRegressionResult {
    /// M-estimates in design-column order
    pub coefficients: Vector,
    /// Huber sandwich standard errors
    pub standard_errors: Vector,
    /// t = β̂ / SE
    pub t_statistics: Vector,
    /// Two-sided p-values on n − p degrees of freedom
    pub p_values: Vector,
    /// Lower confidence bounds
    pub ci_lower: Vector,
    /// Upper confidence bounds
    pub ci_upper: Vector,
    /// Xβ̂
    pub fitted_values: Vector,
    /// y − Xβ̂
    pub residuals: Vector,
    /// Final IRLS weights
    pub weights: Vector,
    /// Robust residual scale
    pub scale: f64,
    /// Coefficient covariance
    pub covariance: Matrix,
    /// Design column names
    pub variable_names: Vec<String>,
    /// ψ family
    pub method: RobustMethod,
    /// Tuning constant the fit used
    pub tuning: f64,
    pub model_statistics: ModelStatistics,
    /// OLS fit of the same design
    pub ols: LinearRegressionResult,
    /// Robust versus OLS comparison
    pub bias_test: BiasTest,
    table: Vec<Coefficient>,
}

impl RobustRegressionResult {
    /// Get the number of observations
    pub fn n_obs(&self) -> usize {
        self.residuals.len()
    }

    /// IRLS iterations used
    pub fn iterations(&self) -> usize {
        self.model_statistics.iterations.unwrap_or(0)
    }

    /// 1-based case numbers whose final weight is below `threshold`
    pub fn downweighted_cases(&self, threshold: f64) -> Vec<usize> {
        self.weights
            .iter()
            .enumerate()
            .filter(|(_, w)| **w < threshold)
            .map(|(i, _)| i + 1)
            .collect()
    }
}

impl FittedModel for RobustRegressionResult {
    fn coefficients(&self) -> &[Coefficient] {
        &self.table
    }

    fn fitted_values(&self) -> &Vector {
        &self.fitted_values
    }

    fn residuals(&self) -> &Vector {
        &self.residuals
    }

    fn statistics(&self) -> &ModelStatistics {
        &self.model_statistics
    }
}

// ==================== Robust Regression Model ====================

/// Robust regression model
#[derive(Debug, Clone)]
pub struct RobustRegression {
    formula: Formula,
    data: Option<DataFrame>,
    config: RobustConfig,
    result: Option<RobustRegressionResult>,
}

impl RobustRegression {
    /// Create a new robust regression model
    pub fn new(formula: &str) -> Result<Self> {
        Ok(Self {
            formula: Formula::parse(formula)?,
            data: None,
            config: RobustConfig::default(),
            result: None,
        })
    }

    /// Set data for the model
    pub fn data(mut self, data: &DataFrame) -> Self {
        self.data = Some(data.clone());
        self
    }

    /// Set configuration
    pub fn config(mut self, config: RobustConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the ψ function
    pub fn method(mut self, method: RobustMethod) -> Self {
        self.config.method = method;
        self
    }

    /// Fit by IRLS
    pub fn fit(mut self) -> Result<Self> {
        let data = self.data.as_ref().ok_or(ModelError::NoData)?;
        self.config.validate()?;

        let design = self.formula.design(data)?;
        let linear = LinearConfig {
            confidence_level: self.config.confidence_level,
            ..LinearConfig::default()
        };
        let ols = ols::fit_design(design, self.formula.has_intercept, &linear)?;

        self.result = Some(irls(ols, &self.config)?);
        Ok(self)
    }

    /// Fitted result, if any
    pub fn result(&self) -> Option<&RobustRegressionResult> {
        self.result.as_ref()
    }

    /// Bias test of the fitted model
    pub fn bias_test(&self) -> Option<&BiasTest> {
        self.result.as_ref().map(|r| &r.bias_test)
    }

    /// Get model summary
    pub fn summary(&self) -> Result<ModelSummary> {
        let result = self.result.as_ref().ok_or(ModelError::NotFitted)?;
        Ok(ModelSummary {
            model_type: ModelType::RobustRegression,
            formula: self.formula.to_string(),
            n_obs: result.n_obs(),
            n_predictors: result.coefficients.len(),
            coefficients: result.table.clone(),
            model_statistics: result.model_statistics,
            residual_statistics: ResidualStatistics::from_residuals(&result.residuals),
        })
    }
}

// ==================== IRLS ====================

/// median(|r|) / 0.6745
fn mad_scale(residuals: &Vector) -> f64 {
    let mut abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
    abs.sort_by(f64::total_cmp);
    po_core::data::quantile_sorted(&abs, 0.5) / MAD_CONSTANT
}

fn irls(ols: LinearRegressionResult, config: &RobustConfig) -> Result<RobustRegressionResult> {
    let x = &ols.x;
    let y = &ols.y;
    let n = x.nrows();
    let p = x.ncols();
    let k = config.tuning_constant();
    let method = config.method;
    let y_scale = y.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(1.0);

    let mut coefficients = ols.coefficients.clone();
    let mut residuals = ols.residuals.clone();
    let mut weights = Vector::ones(n);
    let mut iterations = 0;
    let mut converged = false;

    for iter in 1..=config.max_iterations {
        let scale = mad_scale(&residuals);
        if scale <= f64::EPSILON * y_scale {
            // more than half the cases are fitted exactly
            converged = true;
            break;
        }

        weights = residuals.mapv(|r| method.weight(r / scale, k));
        let xw = x * &weights.view().insert_axis(Axis(1));
        let xtwx = x.t().dot(&xw);
        let xtwy = xw.t().dot(y);
        let updated = linalg::solve_spd(&xtwx, &xtwy, "X'WX")?;

        let new_residuals = y - &x.dot(&updated);
        let change = (&new_residuals - &residuals).mapv(|d| d * d).sum().sqrt()
            / residuals.mapv(|r| r * r).sum().sqrt().max(1e-20);

        coefficients = updated;
        residuals = new_residuals;
        iterations = iter;

        if change < config.tolerance {
            converged = true;
            break;
        }
    }

    if !converged {
        tracing::warn!(
            method = ?method,
            max_iterations = config.max_iterations,
            "robust regression did not converge"
        );
        return Err(ModelError::NotConverged {
            max_iter: config.max_iterations,
        });
    }
    tracing::debug!(method = ?method, iterations, "robust regression converged");

    let scale = mad_scale(&residuals);
    let covariance = huber_covariance(&ols.xtx_inv, &residuals, scale, method, k);

    let df = (n - p) as f64;
    let t_critical = inference::t_critical(config.confidence_level, df);
    let standard_errors = covariance.diag().mapv(|v| v.max(0.0).sqrt());
    let t_statistics = &coefficients / &standard_errors;
    let p_values = t_statistics.mapv(|t| inference::pvalue_t(t, df));
    let ci_lower = &coefficients - &(&standard_errors * t_critical);
    let ci_upper = &coefficients + &(&standard_errors * t_critical);
    let fitted_values = x.dot(&coefficients);

    let table = (0..p)
        .map(|j| {
            let coef = Coefficient::new(ols.variable_names[j].clone(), coefficients[j])
                .with_std_error(standard_errors[j])
                .with_t_stat(t_statistics[j])
                .with_p_value(p_values[j])
                .with_ci(ci_lower[j], ci_upper[j])
                .with_df(df);
            if ols.has_intercept && j == 0 {
                coef.as_intercept()
            } else {
                coef
            }
        })
        .collect();

    let bias_test = BiasTest::compute(
        &ols,
        &coefficients,
        scale,
        method.gaussian_efficiency(k),
        config.bias_alpha,
    );
    if bias_test.biased {
        tracing::info!(
            statistic = bias_test.statistic,
            p_value = bias_test.p_value,
            "robust and OLS estimates differ significantly"
        );
    }

    let model_statistics = ModelStatistics {
        residual_std_error: Some(scale),
        df_residual: Some(n - p),
        df_model: Some(if ols.has_intercept { p - 1 } else { p }),
        iterations: Some(iterations),
        converged: Some(true),
        ..ModelStatistics::default()
    };

    Ok(RobustRegressionResult {
        variable_names: ols.variable_names.clone(),
        coefficients,
        standard_errors,
        t_statistics,
        p_values,
        ci_lower,
        ci_upper,
        fitted_values,
        residuals,
        weights,
        scale,
        covariance,
        method,
        tuning: k,
        model_statistics,
        bias_test,
        ols,
        table,
    })
}

/// κ² Σψ²/(n−p) / (mean ψ')² · s² · (X'X)⁻¹
fn huber_covariance(
    xtx_inv: &Matrix,
    residuals: &Vector,
    scale: f64,
    method: RobustMethod,
    k: f64,
) -> Matrix {
    let n = residuals.len() as f64;
    let p = xtx_inv.nrows() as f64;
    if scale <= 0.0 {
        return Matrix::zeros(xtx_inv.raw_dim());
    }

    let u = residuals.mapv(|r| r / scale);
    let psi = u.mapv(|v| method.psi(v, k));
    let psi_prime = u.mapv(|v| method.psi_deriv(v, k));

    let mean_prime = psi_prime.mean().unwrap_or(0.0);
    let var_prime = if n > 1.0 { psi_prime.var(1.0) } else { 0.0 };
    let kappa = 1.0 + p * var_prime / (n * mean_prime * mean_prime);
    let s2 = (scale * scale) * psi.mapv(|v| v * v).sum() / (n - p);
    let stddev2 = s2 * (kappa / mean_prime).powi(2);

    xtx_inv * stddev2
}
