//! Ordinary least squares
//!
//! Solves `(X'X) β = X'y` by Cholesky after rejecting constant predictors
//! and exact collinearity, so a fit either has a unique solution or fails
//! with a named column.

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::base::{
    FittedModel, ModelError, ModelStatistics, ModelSummary, ModelType, ResidualStatistics, Result,
};
use crate::inference;
use crate::linalg;
use crate::lm::diagnostics::{DiagnosticsConfig, RegressionDiagnostics};
use crate::lm::result::LinearRegressionResult;
use crate::lm::{LinearConfig, StandardErrorType};
use po_core::data::DataFrame;
use po_core::formula::{Design, Formula, INTERCEPT};

// ==================== Type Definitions ====================

pub type Matrix = Array2<f64>;
pub type Vector = Array1<f64>;

/// A column is constant when its variance is below this fraction of its
/// mean square
pub(crate) const ZERO_VARIANCE_TOL: f64 = 1e-12;

/// Relative singular value cut-off for rank checks
pub(crate) const RANK_TOL: f64 = 1e-10;

// ==================== Linear Regression Model ====================

/// OLS fitter: `LinearRegression::new("y ~ x")?.data(&df).fit()?`
#[derive(Debug, Clone)]
pub struct LinearRegression {
    formula: Formula,
    data: Option<DataFrame>,
    config: LinearConfig,
    result: Option<LinearRegressionResult>,
}

impl LinearRegression {
    pub fn new(formula: &str) -> Result<Self> {
        Ok(Self::from_formula(Formula::parse(formula)?))
    }

    pub fn from_formula(formula: Formula) -> Self {
        Self {
            formula,
            data: None,
            config: LinearConfig::default(),
            result: None,
        }
    }

    pub fn data(self, data: &DataFrame) -> Self {
        Self {
            data: Some(data.clone()),
            ..self
        }
    }

    pub fn config(self, config: LinearConfig) -> Self {
        Self { config, ..self }
    }

    /// Switch to a heteroscedasticity-consistent covariance
    pub fn se_type(mut self, se_type: StandardErrorType) -> Self {
        self.config.se_type = se_type;
        self
    }

    /// Fit without an intercept column
    pub fn no_intercept(mut self) -> Self {
        self.config.intercept = false;
        self
    }

    pub fn fit(mut self) -> Result<Self> {
        let data = self.data.as_ref().ok_or(ModelError::NoData)?;
        self.config.validate()?;

        if !self.config.intercept && self.formula.has_intercept {
            self.formula = self.formula.clone().without_intercept();
        }

        let design = self.formula.design(data)?;
        let result = fit_design(design, self.formula.has_intercept, &self.config)?;

        tracing::debug!(
            formula = %self.formula,
            n = result.n_obs(),
            p = result.n_predictors(),
            r_squared = ?result.model_statistics.r_squared,
            "fitted OLS model"
        );

        self.result = Some(result);
        Ok(self)
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn result(&self) -> Option<&LinearRegressionResult> {
        self.result.as_ref()
    }

    /// Raw coefficient vector in design-column order
    pub fn estimates(&self) -> Option<&Vector> {
        self.result.as_ref().map(|r| &r.coefficients)
    }

    /// Point predictions for new rows. The new frame must expand to the
    /// same design columns, so categorical levels have to match.
    pub fn predict(&self, data: &DataFrame) -> Result<Vector> {
        let result = self.result.as_ref().ok_or(ModelError::NotFitted)?;

        let design = self.formula.design(data)?;
        if design.names != result.variable_names {
            return Err(ModelError::PredictionError {
                message: format!(
                    "new data expands to {:?}, the fit used {:?}",
                    design.names, result.variable_names
                ),
            });
        }
        Ok(result.predict(&design.x))
    }

    /// Leverage, influence and collinearity checks for the fitted model
    pub fn diagnostics(&self, config: &DiagnosticsConfig) -> Result<RegressionDiagnostics> {
        let result = self.result.as_ref().ok_or(ModelError::NotFitted)?;
        Ok(RegressionDiagnostics::compute(result, config))
    }

    pub fn summary(&self) -> Result<ModelSummary> {
        let result = self.result.as_ref().ok_or(ModelError::NotFitted)?;

        Ok(ModelSummary {
            model_type: ModelType::LinearRegression,
            formula: self.formula.to_string(),
            n_obs: result.n_obs(),
            n_predictors: result.n_predictors(),
            coefficients: result.coefficients().to_vec(),
            model_statistics: result.model_statistics,
            residual_statistics: ResidualStatistics::from_residuals(&result.residuals),
        })
    }
}

// ==================== Estimation ====================

/// Fit OLS to an evaluated design
pub(crate) fn fit_design(
    design: Design,
    has_intercept: bool,
    config: &LinearConfig,
) -> Result<LinearRegressionResult> {
    let y = design.response()?.clone();
    let Design { x, names, .. } = design;
    fit_matrix(x, y, names, has_intercept, config)
}

/// Fit OLS to a raw design matrix and response
pub(crate) fn fit_matrix(
    x: Matrix,
    y: Vector,
    variable_names: Vec<String>,
    has_intercept: bool,
    config: &LinearConfig,
) -> Result<LinearRegressionResult> {
    let n = x.nrows();
    let p = x.ncols();

    if n <= p {
        return Err(ModelError::InsufficientData {
            n_samples: n,
            n_predictors: p,
        });
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(ModelError::numerical("design contains non-finite values", "ols"));
    }

    check_design(&x, &variable_names)?;

    let xtx = x.t().dot(&x);
    let xty = x.t().dot(&y);
    let (coefficients, xtx_inv) = linalg::solve_and_invert(&xtx, &xty, "X'X")?;

    let fitted_values = x.dot(&coefficients);
    let residuals = &y - &fitted_values;
    let hat_diagonal = hat_matrix_diagonal(&x, &xtx_inv);

    let mut result = LinearRegressionResult {
        standard_errors: Vector::zeros(p),
        t_statistics: Vector::zeros(p),
        p_values: Vector::zeros(p),
        ci_lower: Vector::zeros(p),
        ci_upper: Vector::zeros(p),
        covariance: Matrix::zeros((p, p)),
        coefficients,
        fitted_values,
        residuals,
        hat_diagonal,
        xtx_inv,
        x,
        y,
        variable_names,
        model_statistics: ModelStatistics::default(),
        has_intercept,
        se_type: config.se_type,
        confidence_level: config.confidence_level,
        table: Vec::new(),
    };

    result.covariance = covariance(&result, config.se_type);
    calculate_inference(&mut result, config.confidence_level);
    result.model_statistics = model_statistics(&result);
    result.build_table();

    Ok(result)
}

/// Reject constant predictors and exactly collinear designs
pub(crate) fn check_design(x: &Matrix, names: &[String]) -> Result<()> {
    for (column, name) in x.axis_iter(Axis(1)).zip(names) {
        if name == INTERCEPT {
            continue;
        }
        if is_constant(column) {
            return Err(ModelError::ZeroVariance {
                variable: name.clone(),
            });
        }
    }

    if linalg::rank(x, RANK_TOL) < x.ncols() {
        return Err(ModelError::singular("design matrix (collinear predictors)"));
    }
    Ok(())
}

/// Scale-free zero-variance test: var(x) ≤ tol · mean(x²)
pub(crate) fn is_constant(column: ArrayView1<f64>) -> bool {
    let mean_square = column.dot(&column) / column.len().max(1) as f64;
    column.var(0.0) <= ZERO_VARIANCE_TOL * mean_square.max(f64::MIN_POSITIVE)
}

/// h_ii = x_i' (X'X)⁻¹ x_i
fn hat_matrix_diagonal(x: &Matrix, xtx_inv: &Matrix) -> Vector {
    let xa = x.dot(xtx_inv);
    (&xa * x).sum_axis(Axis(1))
}

/// Coefficient covariance for the requested standard error type
fn covariance(result: &LinearRegressionResult, se_type: StandardErrorType) -> Matrix {
    let n = result.n_obs() as f64;
    let p = result.n_predictors() as f64;
    let e = &result.residuals;
    let h = &result.hat_diagonal;

    let omega: Vector = match se_type {
        StandardErrorType::Standard => return result.classical_covariance(),
        StandardErrorType::HC0 => e.mapv(|r| r * r),
        StandardErrorType::HC1 => e.mapv(|r| r * r * n / (n - p)),
        StandardErrorType::HC2 => e
            .iter()
            .zip(h)
            .map(|(&r, &hi)| r * r / (1.0 - hi))
            .collect(),
        StandardErrorType::HC3 => e
            .iter()
            .zip(h)
            .map(|(&r, &hi)| r * r / (1.0 - hi).powi(2))
            .collect(),
    };

    // (X'X)⁻¹ X' Ω X (X'X)⁻¹ without forming the n×n Ω
    let weighted = &result.x * &omega.insert_axis(Axis(1));
    let meat = result.x.t().dot(&weighted);
    result.xtx_inv.dot(&meat).dot(&result.xtx_inv)
}

/// Fill in SE, t, p and confidence bounds from the covariance matrix
fn calculate_inference(result: &mut LinearRegressionResult, confidence_level: f64) {
    let df = result.df_residual() as f64;
    let t_critical = inference::t_critical(confidence_level, df);

    result.standard_errors = result.covariance.diag().mapv(|v| v.max(0.0).sqrt());
    result.t_statistics = &result.coefficients / &result.standard_errors;
    result.p_values = result.t_statistics.mapv(|t| inference::pvalue_t(t, df));
    result.ci_lower = &result.coefficients - &(&result.standard_errors * t_critical);
    result.ci_upper = &result.coefficients + &(&result.standard_errors * t_critical);
}

fn model_statistics(result: &LinearRegressionResult) -> ModelStatistics {
    let n = result.n_obs();
    let p = result.n_predictors();
    let rss = result.rss();
    let tss = result.tss();
    let df_residual = n - p;
    let df_model = if result.has_intercept { p - 1 } else { p };
    let intercept_df = if result.has_intercept { 1.0 } else { 0.0 };

    let r_squared = (tss > 0.0).then(|| 1.0 - rss / tss);
    let adj_r_squared =
        r_squared.map(|r2| 1.0 - (1.0 - r2) * (n as f64 - intercept_df) / df_residual as f64);

    let (f_statistic, f_p_value) = if df_model > 0 && tss > 0.0 {
        let f = ((tss - rss) / df_model as f64) / (rss / df_residual as f64);
        (
            Some(f),
            Some(inference::pvalue_f(f, df_model as f64, df_residual as f64)),
        )
    } else {
        (None, None)
    };

    // Gaussian log-likelihood at the ML variance RSS/n; σ counts as a parameter
    let nf = n as f64;
    let log_likelihood = -0.5 * nf * ((2.0 * std::f64::consts::PI).ln() + (rss / nf).ln() + 1.0);
    let k = (p + 1) as f64;

    ModelStatistics {
        r_squared,
        adj_r_squared,
        residual_std_error: Some(result.sigma()),
        f_statistic,
        f_p_value,
        log_likelihood: Some(log_likelihood),
        aic: Some(-2.0 * log_likelihood + 2.0 * k),
        bic: Some(-2.0 * log_likelihood + nf.ln() * k),
        df_residual: Some(df_residual),
        df_model: Some(df_model),
        iterations: None,
        converged: Some(true),
    }
}
