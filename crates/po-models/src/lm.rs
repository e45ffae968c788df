//! Formula-driven regression
//!
//! - [`LinearRegression`]: OLS with classical or HC0–HC3 standard errors
//! - [`RobustRegression`]: IRLS M-estimation with the OLS bias test
//! - [`BayesianRegression`]: Zellner–Siow (JZS) priors, Bayes factors and
//!   posterior draws
//! - [`RegressionDiagnostics`]: case-wise influence and collinearity checks

pub mod bayes;
pub mod diagnostics;
pub mod ols;
pub mod result;
pub mod robust;

#[cfg(test)]
mod tests;

pub use bayes::{
    BayesConfig, BayesFactor, BayesianRegression, BayesianRegressionResult, PosteriorSummary,
};
pub use diagnostics::{DiagnosticRecord, DiagnosticsConfig, RegressionDiagnostics};
pub use ols::LinearRegression;
pub use result::LinearRegressionResult;
pub use robust::{BiasTest, RobustConfig, RobustRegression, RobustRegressionResult};

use po_core::data::DataFrame;
use serde::{Deserialize, Serialize};

use crate::base::{ModelError, Result};

/// Settings shared by every least-squares fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearConfig {
    /// Ignored when the formula already removes the intercept
    pub intercept: bool,
    pub se_type: StandardErrorType,
    pub confidence_level: f64,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            intercept: true,
            se_type: StandardErrorType::Standard,
            confidence_level: 0.95,
        }
    }
}

impl LinearConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.confidence_level > 0.0 && self.confidence_level < 1.0 {
            Ok(())
        } else {
            Err(ModelError::invalid_config(format!(
                "confidence level must lie in (0, 1), got {}",
                self.confidence_level
            )))
        }
    }
}

/// Coefficient covariance estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandardErrorType {
    /// s²(X'X)⁻¹
    Standard,
    HC0,
    /// HC0 × n / (n − p)
    HC1,
    /// e² / (1 − h)
    HC2,
    /// e² / (1 − h)²
    HC3,
}

/// ψ-function family for M-estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RobustMethod {
    Huber,
    Bisquare,
    Hampel,
}

/// Fit `formula` by OLS with default settings
pub fn lm(formula: &str, data: &DataFrame) -> Result<LinearRegression> {
    LinearRegression::new(formula)?.data(data).fit()
}

/// Fit `formula` by M-estimation with the default tuning for `method`
pub fn rlm(formula: &str, data: &DataFrame, method: RobustMethod) -> Result<RobustRegression> {
    RobustRegression::new(formula)?
        .data(data)
        .config(RobustConfig::new(method))
        .fit()
}
