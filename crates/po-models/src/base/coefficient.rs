//! One row of a coefficient table

use serde::{Deserialize, Serialize};

/// A labelled estimate and whatever inference the fitter could attach.
///
/// OLS and robust fits fill every field except `std_estimate`; Bayesian
/// posteriors carry no test statistic, and path-model rows use `z` in
/// `t_stat` with `df` left empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    /// Design column or parameter name
    pub name: String,
    /// Point estimate (posterior mean for Bayesian fits)
    pub estimate: f64,
    /// Standard error (posterior SD for Bayesian fits)
    pub std_error: Option<f64>,
    /// t, or z for large-sample tests
    pub t_stat: Option<f64>,
    /// Two-sided p-value
    pub p_value: Option<f64>,
    /// Lower confidence (or credible) bound
    pub ci_lower: Option<f64>,
    /// Upper confidence (or credible) bound
    pub ci_upper: Option<f64>,
    /// Degrees of freedom of the t reference distribution
    pub df: Option<f64>,
    /// Completely standardized estimate
    pub std_estimate: Option<f64>,
    /// Whether this row is the intercept
    pub is_intercept: bool,
}

impl Coefficient {
    pub fn new(name: impl Into<String>, estimate: f64) -> Self {
        Self {
            name: name.into(),
            estimate,
            std_error: None,
            t_stat: None,
            p_value: None,
            ci_lower: None,
            ci_upper: None,
            df: None,
            std_estimate: None,
            is_intercept: false,
        }
    }

    pub fn with_std_error(self, se: f64) -> Self {
        Self {
            std_error: Some(se),
            ..self
        }
    }

    pub fn with_t_stat(self, t: f64) -> Self {
        Self {
            t_stat: Some(t),
            ..self
        }
    }

    pub fn with_p_value(self, p: f64) -> Self {
        Self {
            p_value: Some(p),
            ..self
        }
    }

    pub fn with_ci(self, lower: f64, upper: f64) -> Self {
        Self {
            ci_lower: Some(lower),
            ci_upper: Some(upper),
            ..self
        }
    }

    pub fn with_df(self, df: f64) -> Self {
        Self { df: Some(df), ..self }
    }

    pub fn with_std_estimate(self, value: f64) -> Self {
        Self {
            std_estimate: Some(value),
            ..self
        }
    }

    pub fn as_intercept(self) -> Self {
        Self {
            is_intercept: true,
            ..self
        }
    }
}
