//! Printable, serializable model summaries

use std::fmt;

use serde::{Deserialize, Serialize};

use super::coefficient::Coefficient;
use super::statistics::{ModelStatistics, ResidualStatistics};

/// What the analyses put in a report for each fitted regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub model_type: ModelType,
    pub formula: String,
    pub n_obs: usize,
    /// Design columns, intercept included
    pub n_predictors: usize,
    pub coefficients: Vec<Coefficient>,
    pub model_statistics: ModelStatistics,
    pub residual_statistics: ResidualStatistics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    LinearRegression,
    RobustRegression,
    BayesianRegression,
    PathModel,
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelType::LinearRegression => "OLS regression",
            ModelType::RobustRegression => "Robust M-regression",
            ModelType::BayesianRegression => "JZS Bayesian regression",
            ModelType::PathModel => "Path model",
        })
    }
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v))
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.model_type, self.formula)?;
        writeln!(f, "n = {}, p = {}", self.n_obs, self.n_predictors)?;

        let r = &self.residual_statistics;
        writeln!(
            f,
            "residuals: min {:.4}  q1 {:.4}  median {:.4}  q3 {:.4}  max {:.4}",
            r.min, r.q1, r.median, r.q3, r.max
        )?;
        writeln!(f)?;

        writeln!(
            f,
            "{:<18}{:>11}{:>11}{:>10}{:>10}{:>11}{:>11}",
            "", "estimate", "se", "t", "p", "lower", "upper"
        )?;
        for c in &self.coefficients {
            writeln!(
                f,
                "{:<18}{:>11.4}{:>11}{:>10}{:>10}{:>11}{:>11}",
                c.name,
                c.estimate,
                cell(c.std_error),
                cell(c.t_stat),
                cell(c.p_value),
                cell(c.ci_lower),
                cell(c.ci_upper)
            )?;
        }

        let s = &self.model_statistics;
        let mut fields: Vec<String> = Vec::new();
        if let Some(v) = s.r_squared {
            fields.push(format!("R² {:.4}", v));
        }
        if let Some(v) = s.adj_r_squared {
            fields.push(format!("adj. R² {:.4}", v));
        }
        if let Some(v) = s.residual_std_error {
            fields.push(format!("sigma {:.4}", v));
        }
        if let (Some(stat), Some(p), Some(df1), Some(df2)) =
            (s.f_statistic, s.f_p_value, s.df_model, s.df_residual)
        {
            fields.push(format!("F({}, {}) {:.3}, p {:.4}", df1, df2, stat, p));
        }
        if let (Some(aic), Some(bic)) = (s.aic, s.bic) {
            fields.push(format!("AIC {:.2}, BIC {:.2}", aic, bic));
        }
        if let Some(iterations) = s.iterations {
            let status = if s.converged == Some(false) { "not converged" } else { "converged" };
            fields.push(format!("{} after {} iterations", status, iterations));
        }
        if !fields.is_empty() {
            writeln!(f)?;
            writeln!(f, "{}", fields.join("; "))?;
        }

        Ok(())
    }
}
