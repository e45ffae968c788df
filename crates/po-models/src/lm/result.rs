//! Everything an OLS fit leaves behind
//!
//! The design and the `(X'X)⁻¹` factor are kept so diagnostics, prediction
//! bands and the robust bias test can reuse them without refitting.

use crate::{
    base::{Coefficient, FittedModel, ModelStatistics},
    inference,
    lm::{
        StandardErrorType,
        ols::{Matrix, Vector},
    },
};

// ==================== Linear Regression Result ====================

/// OLS fit
#[derive(Debug, Clone)]
pub struct LinearRegressionResult {
    /// β̂ in design-column order
    pub coefficients: Vector,
    /// Standard errors under `se_type`
    pub standard_errors: Vector,
    /// t = β̂ / SE
    pub t_statistics: Vector,
    /// Two-sided p-values on n − p degrees of freedom
    pub p_values: Vector,
    /// Lower confidence bounds
    pub ci_lower: Vector,
    /// Upper confidence bounds
    pub ci_upper: Vector,
    /// ŷ = Xβ̂
    pub fitted_values: Vector,
    /// y − ŷ
    pub residuals: Vector,
    /// Leverages h_ii
    pub hat_diagonal: Vector,
    /// Coefficient covariance under `se_type`
    pub covariance: Matrix,
    /// (X'X)⁻¹
    pub xtx_inv: Matrix,
    /// Design matrix
    pub x: Matrix,
    /// Response
    pub y: Vector,
    /// Design column names
    pub variable_names: Vec<String>,
    pub model_statistics: ModelStatistics,
    /// Whether column 0 is the intercept
    pub has_intercept: bool,
    pub se_type: StandardErrorType,
    pub confidence_level: f64,
    pub(crate) table: Vec<Coefficient>,
}

impl LinearRegressionResult {
    pub(crate) fn build_table(&mut self) {
        let df = self.df_residual() as f64;
        self.table = (0..self.coefficients.len())
            .map(|i| {
                let coef = Coefficient::new(self.variable_names[i].clone(), self.coefficients[i])
                    .with_std_error(self.standard_errors[i])
                    .with_t_stat(self.t_statistics[i])
                    .with_p_value(self.p_values[i])
                    .with_ci(self.ci_lower[i], self.ci_upper[i])
                    .with_df(df);
                if self.has_intercept && i == 0 {
                    coef.as_intercept()
                } else {
                    coef
                }
            })
            .collect();
    }

    pub fn n_obs(&self) -> usize {
        self.y.len()
    }

    /// Design columns, intercept included
    pub fn n_predictors(&self) -> usize {
        self.coefficients.len()
    }

    /// Residual degrees of freedom, n − p
    pub fn df_residual(&self) -> usize {
        self.n_obs() - self.n_predictors()
    }

    pub fn rss(&self) -> f64 {
        self.residuals.mapv(|r| r * r).sum()
    }

    /// Total sum of squares, about zero for no-intercept fits
    pub fn tss(&self) -> f64 {
        let center = if self.has_intercept {
            self.y.mean().unwrap_or(0.0)
        } else {
            0.0
        };
        self.y.iter().map(|&yi| (yi - center).powi(2)).sum::<f64>()
    }

    /// Residual standard error s
    pub fn sigma(&self) -> f64 {
        (self.rss() / self.df_residual() as f64).sqrt()
    }

    pub fn cov_matrix(&self) -> &Matrix {
        &self.covariance
    }

    /// Classical covariance s²(X'X)⁻¹, whatever standard errors were requested
    pub fn classical_covariance(&self) -> Matrix {
        &self.xtx_inv * self.sigma().powi(2)
    }

    // ==================== Prediction and Residuals ====================

    /// Position of a named coefficient
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.variable_names.iter().position(|n| n == name)
    }

    /// Whether the residuals vanish up to rounding relative to the response
    pub fn is_perfect_fit(&self) -> bool {
        self.rss() <= 1e-24 * self.y.mapv(|v| v * v).sum()
    }

    /// Internally standardized residuals e / (s √(1 − h)); zero for a
    /// perfect fit and for cases with leverage one
    pub fn standardized_residuals(&self) -> Vector {
        if self.is_perfect_fit() {
            return Vector::zeros(self.n_obs());
        }
        let s = self.sigma();
        self.residuals
            .iter()
            .zip(self.hat_diagonal.iter())
            .map(|(&r, &h)| if 1.0 - h > 1e-12 { r / (s * (1.0 - h).sqrt()) } else { 0.0 })
            .collect()
    }

    /// Externally studentized (deleted) residuals
    pub fn studentized_residuals(&self) -> Vector {
        let df = self.df_residual() as f64;
        self.standardized_residuals()
            .mapv(|r| {
                let denom = df - r * r;
                if df <= 1.0 {
                    f64::NAN
                } else if denom > 0.0 {
                    r * ((df - 1.0) / denom).sqrt()
                } else {
                    r.signum() * f64::INFINITY
                }
            })
    }

    /// X_new β̂
    pub fn predict(&self, x_new: &Matrix) -> Vector {
        x_new.dot(&self.coefficients)
    }

    /// Confidence band for the mean response at each row of `x_new`
    pub fn predict_ci(&self, x_new: &Matrix, level: f64) -> (Vector, Vector) {
        self.prediction_band(x_new, level, 0.0)
    }

    /// Prediction band for a single new observation at each row
    pub fn predict_pi(&self, x_new: &Matrix, level: f64) -> (Vector, Vector) {
        self.prediction_band(x_new, level, 1.0)
    }

    fn prediction_band(&self, x_new: &Matrix, level: f64, extra: f64) -> (Vector, Vector) {
        let predictions = self.predict(x_new);
        let s = self.sigma();
        let t = inference::t_critical(level, self.df_residual() as f64);

        let margin: Vector = x_new
            .rows()
            .into_iter()
            .map(|row| {
                let h_new = row.dot(&self.xtx_inv.dot(&row));
                t * s * (extra + h_new).sqrt()
            })
            .collect();

        (&predictions - &margin, &predictions + &margin)
    }
}

// ==================== Trait Implementations ====================

impl FittedModel for LinearRegressionResult {
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
