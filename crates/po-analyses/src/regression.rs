//! Linear regression with diagnostics
//!
//! One formula is fitted four ways on the same data: OLS, OLS case
//! diagnostics, an M-estimator whose comparison with OLS flags probable bias
//! from outlying cases, and a JZS Bayesian regression with Bayes factors for
//! the full model and for every term.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::DataSource;
use crate::descriptives::Descriptives;
use crate::error::{AnalysisError, Result};
use po_core::data::{DataFrame, Series, Simulator};
use po_core::formula::Formula;
use po_models::lm::{
    BayesConfig, BayesianRegression, BayesianRegressionResult, BiasTest, DiagnosticsConfig,
    LinearConfig, LinearRegression, RobustConfig, RobustRegression,
};
use po_models::{ModelError, ModelSummary, RegressionDiagnostics};

/// Robust weight below which a case counts as downweighted
const DOWNWEIGHT_THRESHOLD: f64 = 0.5;

/// Data-generating process for simulated regression data
///
/// Each predictor in `coefficients` is drawn from N(0, 1); the response is
/// `intercept + Σ coef·predictor` plus N(0, noise_sd²) noise. The first
/// `outliers` cases get `outlier_shift` added to the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionSimulation {
    pub n: usize,
    pub seed: u64,
    pub intercept: f64,
    pub coefficients: IndexMap<String, f64>,
    pub noise_sd: f64,
    pub outliers: usize,
    pub outlier_shift: f64,
}

impl Default for RegressionSimulation {
    fn default() -> Self {
        Self {
            n: 200,
            seed: 7,
            intercept: 1.0,
            coefficients: [("x1", 0.5), ("x2", 0.3), ("x3", 0.0)]
                .into_iter()
                .map(|(name, coef)| (name.to_string(), coef))
                .collect(),
            noise_sd: 1.0,
            outliers: 0,
            outlier_shift: 8.0,
        }
    }
}

impl RegressionSimulation {
    /// Generate the predictors, then the response column `response`
    pub fn simulate(&self, response: &str) -> po_core::data::Result<DataFrame> {
        let mut sim = Simulator::new(self.n, self.seed);
        for name in self.coefficients.keys() {
            sim = sim.normal(name, 0.0, 1.0)?;
        }
        let terms: Vec<(&str, f64)> = self
            .coefficients
            .iter()
            .map(|(name, &coef)| (name.as_str(), coef))
            .collect();
        let mut df = sim
            .linear(response, self.intercept, &terms, self.noise_sd)?
            .build();

        if self.outliers > 0 {
            let mut y = df.float_column(response)?;
            for v in y.iter_mut().take(self.outliers) {
                *v += self.outlier_shift;
            }
            df.set_column(response, Series::Float(y))?;
        }
        Ok(df)
    }
}

/// Regression analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    pub formula: String,
    pub data: DataSource<RegressionSimulation>,
    pub linear: LinearConfig,
    pub diagnostics: DiagnosticsConfig,
    pub robust: RobustConfig,
    pub bayes: BayesConfig,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            formula: "y ~ x1 + x2 + x3".to_string(),
            data: DataSource::default(),
            linear: LinearConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            robust: RobustConfig::default(),
            bayes: BayesConfig::default(),
        }
    }
}

impl RegressionConfig {
    /// Default settings for another formula
    pub fn new(formula: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            ..Self::default()
        }
    }
}

/// Everything a regression run produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionReport {
    pub formula: String,
    pub descriptives: Descriptives,
    pub ols: ModelSummary,
    pub diagnostics: RegressionDiagnostics,
    pub robust: ModelSummary,
    /// Robust scale estimate
    pub robust_scale: f64,
    /// 1-based cases with a final robust weight below one half
    pub downweighted_cases: Vec<usize>,
    pub bias_test: BiasTest,
    pub bayes: BayesianRegressionResult,
}

/// Regression analysis runner
#[derive(Debug, Clone)]
pub struct RegressionAnalysis {
    config: RegressionConfig,
    formula: Formula,
    data: Option<DataFrame>,
}

impl RegressionAnalysis {
    /// Parse the formula and check it names a response
    pub fn new(config: RegressionConfig) -> Result<Self> {
        let formula = Formula::parse(&config.formula).map_err(ModelError::from)?;
        if formula.response.is_none() {
            return Err(AnalysisError::invalid(format!(
                "regression formula '{}' has no response",
                config.formula
            )));
        }
        Ok(Self {
            config,
            formula,
            data: None,
        })
    }

    /// Use this frame instead of the configured data source
    pub fn data(mut self, data: &DataFrame) -> Self {
        self.data = Some(data.clone());
        self
    }

    pub fn config(&self) -> &RegressionConfig {
        &self.config
    }

    /// Load the data and fit every model
    pub fn run(&self) -> Result<RegressionReport> {
        let config = &self.config;
        let variables = self.formula.variables();
        let df = match &self.data {
            Some(df) => {
                df.require_columns(&variables)?;
                df.clone()
            }
            None => config.data.load(&variables, |sim| sim.simulate(variables[0]))?,
        };

        tracing::info!(formula = %config.formula, n = df.nrows(), "running regression analysis");

        let descriptives = Descriptives::compute(&df, &variables)?;

        let ols = LinearRegression::from_formula(self.formula.clone())
            .data(&df)
            .config(config.linear.clone())
            .fit()?;
        let diagnostics = ols.diagnostics(&config.diagnostics)?;

        let robust = RobustRegression::new(&config.formula)?
            .data(&df)
            .config(config.robust.clone())
            .fit()?;
        let robust_result = robust.result().ok_or(ModelError::NotFitted)?;

        let bayes = BayesianRegression::new(&config.formula)?
            .data(&df)
            .config(config.bayes.clone())
            .fit()?;
        let bayes_result = bayes.result().cloned().ok_or(ModelError::NotFitted)?;

        let report = RegressionReport {
            formula: config.formula.clone(),
            descriptives,
            ols: ols.summary()?,
            diagnostics,
            robust: robust.summary()?,
            robust_scale: robust_result.scale,
            downweighted_cases: robust_result.downweighted_cases(DOWNWEIGHT_THRESHOLD),
            bias_test: robust_result.bias_test.clone(),
            bayes: bayes_result,
        };

        tracing::info!(
            r_squared = ?report.ols.model_statistics.r_squared,
            influential = report.diagnostics.influential_cases.len(),
            bias_p = report.bias_test.p_value,
            bf10 = report.bayes.bf10,
            "regression analysis finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_outliers_are_shifted() {
        let clean = RegressionSimulation::default().simulate("y").unwrap();
        let shifted = RegressionSimulation {
            outliers: 3,
            ..RegressionSimulation::default()
        }
        .simulate("y")
        .unwrap();

        let a = clean.float_column("y").unwrap();
        let b = shifted.float_column("y").unwrap();
        for i in 0..a.len() {
            let expected = if i < 3 { 8.0 } else { 0.0 };
            assert!((b[i] - a[i] - expected).abs() < 1e-12);
        }
        assert_eq!(clean.column_names(), vec!["x1", "x2", "x3", "y"]);
    }

    #[test]
    fn test_formula_without_response_is_rejected() {
        let err = RegressionAnalysis::new(RegressionConfig::new("~ x1 + x2")).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidSettings(_)));
    }
}
