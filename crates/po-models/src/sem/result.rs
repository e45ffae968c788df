//! Path model results

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::base::{Coefficient, Result};
use crate::inference;
use crate::sem::bootstrap::{self, BootstrapDraws};
use crate::sem::estimate::{ObservedData, PointEstimates};
use crate::sem::fit::FitIndices;
use crate::sem::{BootstrapCi, SeMethod, SemConfig};
use po_core::syntax::ModelSpec;

/// Kind of a reported parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamOp {
    /// `~`
    Regression,
    /// `~~` of an endogenous variable with itself
    ResidualVariance,
    /// `:=`
    Defined,
}

impl ParamOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ParamOp::Regression => "~",
            ParamOp::ResidualVariance => "~~",
            ParamOp::Defined => ":=",
        }
    }
}

/// One row of the parameter table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamEstimate {
    pub lhs: String,
    pub op: ParamOp,
    /// Predictor, the variable itself for variances, the expression for
    /// derived quantities
    pub rhs: String,
    pub label: Option<String>,
    /// Label, or `lhs~rhs` / `lhs~~lhs` when unlabelled
    pub name: String,
    pub est: f64,
    pub se: f64,
    pub z: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    /// Estimate with all observed variables standardized (`std.all`)
    pub est_std: f64,
}

impl ParamEstimate {
    fn fill(&mut self, se: f64, ci: (f64, f64)) {
        self.se = se;
        self.z = self.est / se;
        self.p_value = inference::pvalue_z(self.z);
        self.ci_lower = ci.0;
        self.ci_upper = ci.1;
    }
}

/// How the bootstrap went
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapSummary {
    pub attempted: usize,
    pub successful: usize,
    pub failed: usize,
    pub ci: BootstrapCi,
    pub seed: u64,
}

/// Fitted path model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathModelResult {
    /// Paths, residual variances and derived quantities, in that order
    pub estimates: Vec<ParamEstimate>,
    pub fit: FitIndices,
    /// Explained variance per endogenous variable
    pub r_squared: IndexMap<String, f64>,
    pub n_obs: usize,
    pub se_method: SeMethod,
    pub confidence_level: f64,
    pub bootstrap: Option<BootstrapSummary>,
}

impl PathModelResult {
    /// Normal-theory standard errors and Wald intervals
    pub(crate) fn with_standard_errors(
        spec: &ModelSpec,
        data: &ObservedData,
        estimates: PointEstimates,
        config: &SemConfig,
    ) -> Result<Self> {
        let mut rows = parameter_rows(spec, data, &estimates)?;
        let n = estimates.n_obs as f64;
        let z = inference::z_critical(config.confidence_level);

        let mut ses: Vec<f64> = estimates
            .path_covariance
            .diag()
            .iter()
            .map(|v| v.max(0.0).sqrt())
            .collect();
        ses.extend(
            estimates
                .residual_variances
                .iter()
                .map(|psi| (2.0 * psi * psi / n).sqrt()),
        );
        ses.extend(estimates.defined_standard_errors(spec)?);

        for (row, se) in rows.iter_mut().zip(ses) {
            let ci = (row.est - z * se, row.est + z * se);
            row.fill(se, ci);
        }

        Self::assemble(rows, data, estimates, config, None)
    }

    /// Bootstrap standard errors and intervals
    pub(crate) fn with_bootstrap(
        spec: &ModelSpec,
        data: &ObservedData,
        estimates: PointEstimates,
        draws: BootstrapDraws,
        config: &SemConfig,
    ) -> Result<Self> {
        let mut rows = parameter_rows(spec, data, &estimates)?;
        let method = config.bootstrap.ci;

        for (j, row) in rows.iter_mut().enumerate() {
            let column = draws.column(j);
            let se = bootstrap::standard_error(&column);
            let ci =
                bootstrap::confidence_interval(&column, row.est, config.confidence_level, method);
            row.fill(se, ci);
        }

        let summary = BootstrapSummary {
            attempted: draws.attempted,
            successful: draws.successful(),
            failed: draws.failed,
            ci: method,
            seed: config.bootstrap.seed,
        };
        Self::assemble(rows, data, estimates, config, Some(summary))
    }

    fn assemble(
        estimates: Vec<ParamEstimate>,
        data: &ObservedData,
        point: PointEstimates,
        config: &SemConfig,
        bootstrap: Option<BootstrapSummary>,
    ) -> Result<Self> {
        let n_paths = estimates.iter().filter(|p| p.op == ParamOp::Regression).count();
        let fit = FitIndices::compute(
            &point.sample_covariance,
            &point.implied_covariance,
            point.n_obs,
            n_paths,
            data.n_exogenous(),
        )?;

        tracing::debug!(
            chi_square = fit.chi_square,
            df = fit.df,
            cfi = fit.cfi,
            rmsea = fit.rmsea,
            "path model fitted"
        );

        Ok(Self {
            estimates,
            fit,
            r_squared: point.r_squared,
            n_obs: point.n_obs,
            se_method: config.se,
            confidence_level: config.confidence_level,
            bootstrap,
        })
    }

    /// Row by parameter name (label, `y~x`, `y~~y` or derived name)
    pub fn get(&self, name: &str) -> Option<&ParamEstimate> {
        self.estimates.iter().find(|p| p.name == name)
    }

    /// Point estimate by parameter name
    pub fn estimate(&self, name: &str) -> Option<f64> {
        self.get(name).map(|p| p.est)
    }

    /// Row of the path `outcome ~ predictor`
    pub fn path(&self, outcome: &str, predictor: &str) -> Option<&ParamEstimate> {
        self.estimates
            .iter()
            .find(|p| p.op == ParamOp::Regression && p.lhs == outcome && p.rhs == predictor)
    }

    pub fn paths(&self) -> impl Iterator<Item = &ParamEstimate> {
        self.by_op(ParamOp::Regression)
    }

    pub fn residual_variances(&self) -> impl Iterator<Item = &ParamEstimate> {
        self.by_op(ParamOp::ResidualVariance)
    }

    pub fn defined(&self) -> impl Iterator<Item = &ParamEstimate> {
        self.by_op(ParamOp::Defined)
    }

    fn by_op(&self, op: ParamOp) -> impl Iterator<Item = &ParamEstimate> {
        self.estimates.iter().filter(move |p| p.op == op)
    }

    pub fn r_squared(&self, outcome: &str) -> Option<f64> {
        self.r_squared.get(outcome).copied()
    }

    /// The parameter table as generic coefficients
    pub fn coefficients(&self) -> Vec<Coefficient> {
        self.estimates
            .iter()
            .map(|p| {
                Coefficient::new(p.name.clone(), p.est)
                    .with_std_error(p.se)
                    .with_t_stat(p.z)
                    .with_p_value(p.p_value)
                    .with_ci(p.ci_lower, p.ci_upper)
                    .with_std_estimate(p.est_std)
            })
            .collect()
    }
}

fn parameter_rows(
    spec: &ModelSpec,
    data: &ObservedData,
    estimates: &PointEstimates,
) -> Result<Vec<ParamEstimate>> {
    let sd = |name: &str| estimates.implied_sd(data, name).unwrap_or(f64::NAN);
    let row = |lhs: &str, op, rhs: String, label: Option<String>, name: String, est, est_std| {
        ParamEstimate {
            lhs: lhs.to_string(),
            op,
            rhs,
            label,
            name,
            est,
            se: f64::NAN,
            z: f64::NAN,
            p_value: f64::NAN,
            ci_lower: f64::NAN,
            ci_upper: f64::NAN,
            est_std,
        }
    };

    let mut rows = Vec::new();
    let mut standardized_paths = IndexMap::new();

    for (param, &est) in spec.parameters().iter().zip(&estimates.paths) {
        let est_std = est * sd(&param.predictor) / sd(&param.outcome);
        standardized_paths.insert(param.name.clone(), est_std);
        rows.push(row(
            &param.outcome,
            ParamOp::Regression,
            param.predictor.clone(),
            param.labelled.then(|| param.name.clone()),
            param.name.clone(),
            est,
            est_std,
        ));
    }

    for (relation, &psi) in spec.relations().iter().zip(&estimates.residual_variances) {
        let outcome = &relation.outcome;
        rows.push(row(
            outcome,
            ParamOp::ResidualVariance,
            outcome.clone(),
            None,
            format!("{}~~{}", outcome, outcome),
            psi,
            psi / sd(outcome).powi(2),
        ));
    }

    let standardized_defined = spec.evaluate_defined(&standardized_paths)?;
    for (def, (name, &est)) in spec.defined().iter().zip(&estimates.defined) {
        rows.push(row(
            name,
            ParamOp::Defined,
            def.expr.to_string(),
            Some(name.clone()),
            name.clone(),
            est,
            standardized_defined.get(name).copied().unwrap_or(f64::NAN),
        ));
    }

    Ok(rows)
}

impl fmt::Display for PathModelResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Path Model")?;
        writeln!(f, "==========")?;
        writeln!(f, "Observations: {}", self.n_obs)?;
        match &self.bootstrap {
            Some(b) => writeln!(
                f,
                "Standard errors: bootstrap ({} of {} replicates, {:?} CI)",
                b.successful, b.attempted, b.ci
            )?,
            None => writeln!(f, "Standard errors: standard")?,
        }
        writeln!(f)?;

        let fit = &self.fit;
        writeln!(f, "Model Test:")?;
        match fit.p_value {
            Some(p) => writeln!(
                f,
                "  Chi-square: {:.3} (df = {}, p = {:.4})",
                fit.chi_square, fit.df, p
            )?,
            None => writeln!(f, "  Chi-square: {:.3} (df = {})", fit.chi_square, fit.df)?,
        }
        writeln!(
            f,
            "  CFI: {:.3}  TLI: {:.3}  RMSEA: {:.3}  SRMR: {:.3}",
            fit.cfi, fit.tli, fit.rmsea, fit.srmr
        )?;
        writeln!(f, "  AIC: {:.3}  BIC: {:.3}", fit.aic, fit.bic)?;

        for (title, op) in [
            ("Regressions:", ParamOp::Regression),
            ("Variances:", ParamOp::ResidualVariance),
            ("Defined Parameters:", ParamOp::Defined),
        ] {
            let rows: Vec<&ParamEstimate> = self.by_op(op).collect();
            if rows.is_empty() {
                continue;
            }
            writeln!(f)?;
            writeln!(f, "{}", title)?;
            writeln!(
                f,
                "{:<24} {:>10} {:>10} {:>8} {:>8} {:>10} {:>10} {:>9}",
                "", "Estimate", "Std.Err", "z-value", "P(>|z|)", "ci.lower", "ci.upper", "Std.all"
            )?;
            for p in rows {
                let term = match op {
                    ParamOp::Defined => p.name.clone(),
                    _ => format!("{} {} {}", p.lhs, op.symbol(), p.rhs),
                };
                writeln!(
                    f,
                    "{:<24} {:>10.3} {:>10.3} {:>8.3} {:>8.3} {:>10.3} {:>10.3} {:>9.3}",
                    term, p.est, p.se, p.z, p.p_value, p.ci_lower, p.ci_upper, p.est_std
                )?;
            }
        }

        writeln!(f)?;
        writeln!(f, "R-Square:")?;
        for (outcome, r2) in &self.r_squared {
            writeln!(f, "  {:<22} {:>10.3}", outcome, r2)?;
        }
        Ok(())
    }
}
