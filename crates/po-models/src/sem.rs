//! Path models estimated by maximum likelihood
//!
//! A path model is a recursive system of linear regressions among observed
//! variables, written in the lavaan-like syntax of [`po_core::syntax`]:
//!
//! ```text
//! m ~ a*x
//! y ~ cp*x + b*m
//! ab := a*b
//! ```
//!
//! With free disturbance variances and saturated covariances among the
//! exogenous variables, the ML estimates of a recursive model are the
//! per-equation least-squares solutions on the sample covariance matrix
//! (N divisor). The fitter reports paths, residual variances and derived
//! quantities with either bootstrap or normal-theory standard errors,
//! standardized (`std.all`) estimates and the usual fit indices.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::base::{ModelError, ModelStatistics, ModelSummary, ModelType, ResidualStatistics, Result};
use po_core::data::DataFrame;
use po_core::syntax::ModelSpec;

pub mod bootstrap;
pub mod estimate;
pub mod fit;
pub mod result;


pub use bootstrap::counter_rng_seed;
pub use estimate::{ObservedData, PointEstimates};
pub use fit::FitIndices;
pub use result::{BootstrapSummary, ParamEstimate, ParamOp, PathModelResult};

/// How standard errors are obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeMethod {
    /// Nonparametric bootstrap over rows
    Bootstrap,
    /// Normal-theory information matrix, delta method for derived quantities
    Standard,
}

/// Bootstrap confidence interval type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootstrapCi {
    Percentile,
    /// Bias-corrected percentile intervals
    BiasCorrected,
}

/// Bootstrap settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Number of resamples
    pub replicates: usize,
    pub ci: BootstrapCi,
    pub seed: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            replicates: 1000,
            ci: BootstrapCi::Percentile,
            seed: 20240601,
        }
    }
}

/// Path model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemConfig {
    pub se: SeMethod,
    pub bootstrap: BootstrapConfig,
    /// Confidence level for intervals
    pub confidence_level: f64,
}

impl Default for SemConfig {
    fn default() -> Self {
        Self {
            se: SeMethod::Bootstrap,
            bootstrap: BootstrapConfig::default(),
            confidence_level: 0.95,
        }
    }
}

impl SemConfig {
    /// Normal-theory standard errors
    pub fn standard() -> Self {
        Self {
            se: SeMethod::Standard,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ModelError::invalid_config(format!(
                "confidence level must lie in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if self.se == SeMethod::Bootstrap && self.bootstrap.replicates < 2 {
            return Err(ModelError::invalid_config(
                "bootstrap needs at least 2 replicates",
            ));
        }
        Ok(())
    }
}

/// Path model
#[derive(Debug, Clone)]
pub struct PathModel {
    spec: ModelSpec,
    data: Option<DataFrame>,
    config: SemConfig,
    result: Option<PathModelResult>,
}

impl PathModel {
    /// Parse a model description
    pub fn new(syntax: &str) -> Result<Self> {
        Ok(Self::from_spec(ModelSpec::parse(syntax)?))
    }

    /// Create a model from an already parsed specification
    pub fn from_spec(spec: ModelSpec) -> Self {
        Self {
            spec,
            data: None,
            config: SemConfig::default(),
            result: None,
        }
    }

    /// Set data for the model
    pub fn data(mut self, data: &DataFrame) -> Self {
        self.data = Some(data.clone());
        self
    }

    /// Set configuration
    pub fn config(mut self, config: SemConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the bootstrap seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.bootstrap.seed = seed;
        self
    }

    /// Estimate the model
    pub fn fit(mut self) -> Result<Self> {
        let data = self.data.as_ref().ok_or(ModelError::NoData)?;
        self.config.validate()?;

        let observed = ObservedData::from_frame(&self.spec, data)?;
        tracing::debug!(
            n = observed.n_obs(),
            variables = observed.names().len(),
            parameters = self.spec.parameters().len(),
            se = ?self.config.se,
            "fitting path model"
        );

        let estimates = PointEstimates::compute(&self.spec, &observed)?;
        let result = match self.config.se {
            SeMethod::Standard => PathModelResult::with_standard_errors(
                &self.spec,
                &observed,
                estimates,
                &self.config,
            )?,
            SeMethod::Bootstrap => {
                let draws = bootstrap::resample(&self.spec, &observed, &self.config.bootstrap)?;
                PathModelResult::with_bootstrap(
                    &self.spec,
                    &observed,
                    estimates,
                    draws,
                    &self.config,
                )?
            }
        };

        self.result = Some(result);
        Ok(self)
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Fitted result, if any
    pub fn result(&self) -> Option<&PathModelResult> {
        self.result.as_ref()
    }

    /// Get model summary
    pub fn summary(&self) -> Result<ModelSummary> {
        let result = self.result.as_ref().ok_or(ModelError::NotFitted)?;
        Ok(ModelSummary {
            model_type: ModelType::PathModel,
            formula: self.spec.source().trim().to_string(),
            n_obs: result.n_obs,
            n_predictors: result.paths().count(),
            coefficients: result.coefficients(),
            model_statistics: ModelStatistics {
                log_likelihood: Some(result.fit.log_likelihood),
                aic: Some(result.fit.aic),
                bic: Some(result.fit.bic),
                ..ModelStatistics::default()
            },
            residual_statistics: ResidualStatistics::default(),
        })
    }

    /// Point estimates keyed by parameter name, paths then derived quantities
    pub fn estimates(&self) -> Result<IndexMap<String, f64>> {
        let result = self.result.as_ref().ok_or(ModelError::NotFitted)?;
        Ok(result
            .estimates
            .iter()
            .filter(|p| p.op != ParamOp::ResidualVariance)
            .map(|p| (p.name.clone(), p.est))
            .collect())
    }
}

/// Convenience function: fit a path model with the given configuration
pub fn sem(syntax: &str, data: &DataFrame, config: SemConfig) -> Result<PathModel> {
    PathModel::new(syntax)?.data(data).config(config).fit()
}
