//! Bayesian linear regression with Zellner–Siow (JZS) priors
//!
//! The slopes get a g-prior `β | g, σ² ~ N(0, g σ² (X'X)⁻¹)` on the centered
//! design, mixed over `g ~ InvGamma(1/2, r² n / 2)`; the intercept and σ²
//! get the usual Jeffreys priors. Conditional on `g` everything is
//! conjugate, so the marginal likelihood against the intercept-only model is
//!
//! ```text
//! BF₁₀ = ∫ (1+g)^((n−1−p)/2) (1 + g(1−R²))^(−(n−1)/2) π(g) dg
//! ```
//!
//! which is integrated numerically on a grid in `ln g`. The same grid gives
//! the discretized posterior of `g` used to draw posterior samples.

use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma, StandardNormal};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::base::{
    Coefficient, ModelError, ModelStatistics, ModelSummary, ModelType, ResidualStatistics, Result,
};
use crate::linalg;
use crate::lm::LinearConfig;
use crate::lm::ols;
use po_core::data::{DataFrame, quantile_sorted};
use po_core::formula::{Formula, INTERCEPT};

/// "Medium" prior scale √2/4
pub const MEDIUM_PRIOR_SCALE: f64 = std::f64::consts::SQRT_2 / 4.0;

/// Bounds and resolution of the ln g quadrature grid
const LOG_G_MIN: f64 = -20.0;
const LOG_G_MAX: f64 = 60.0;

/// Bayesian regression configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BayesConfig {
    /// Scale r of the Cauchy prior on standardized effects
    pub prior_scale: f64,
    /// Width of the equal-tailed credible intervals
    pub credible_level: f64,
    /// Number of posterior draws
    pub draws: usize,
    /// Points of the ln g grid
    pub grid_points: usize,
    /// Seed of the posterior sampler
    pub seed: u64,
}

impl Default for BayesConfig {
    fn default() -> Self {
        Self {
            prior_scale: MEDIUM_PRIOR_SCALE,
            credible_level: 0.95,
            draws: 4000,
            grid_points: 4000,
            seed: 20240601,
        }
    }
}

impl BayesConfig {
    fn validate(&self) -> Result<()> {
        if self.prior_scale <= 0.0 {
            return Err(ModelError::invalid_config("prior scale must be positive"));
        }
        if !(self.credible_level > 0.0 && self.credible_level < 1.0) {
            return Err(ModelError::invalid_config("credible level must lie in (0, 1)"));
        }
        if self.draws < 2 || self.grid_points < 2 {
            return Err(ModelError::invalid_config(
                "draws and grid points must be at least 2",
            ));
        }
        Ok(())
    }
}

/// Bayes factor of a term: the model with it against the model without it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayesFactor {
    pub term: String,
    pub bf10: f64,
    pub log_bf10: f64,
}

/// Posterior summary of one quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSummary {
    pub name: String,
    pub mean: f64,
    pub median: f64,
    pub sd: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

impl PosteriorSummary {
    fn from_draws(name: impl Into<String>, draws: &[f64], level: f64) -> Self {
        let n = draws.len() as f64;
        let mean = draws.iter().sum::<f64>() / n;
        let sd = (draws.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();

        let mut sorted = draws.to_vec();
        sorted.sort_by(f64::total_cmp);
        let tail = (1.0 - level) / 2.0;

        Self {
            name: name.into(),
            mean,
            median: quantile_sorted(&sorted, 0.5),
            sd,
            ci_lower: quantile_sorted(&sorted, tail),
            ci_upper: quantile_sorted(&sorted, 1.0 - tail),
        }
    }
}

/// Bayesian regression result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BayesianRegressionResult {
    /// Bayes factor of the full model against the intercept-only model
    pub bf10: f64,
    pub log_bf10: f64,
    /// One Bayes factor per formula term
    pub term_bayes_factors: Vec<BayesFactor>,
    /// Posterior of the intercept and slopes, in design order
    pub coefficients: Vec<PosteriorSummary>,
    pub sigma: PosteriorSummary,
    pub g: PosteriorSummary,
    pub r_squared: f64,
    pub n_obs: usize,
    /// Number of slopes (design columns other than the intercept)
    pub n_predictors: usize,
    pub prior_scale: f64,
    pub draws: usize,
    pub credible_level: f64,
}

impl BayesianRegressionResult {
    /// Posterior summary of a named coefficient
    pub fn coefficient(&self, name: &str) -> Option<&PosteriorSummary> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    /// Bayes factor of a formula term
    pub fn term(&self, term: &str) -> Option<&BayesFactor> {
        self.term_bayes_factors.iter().find(|b| b.term == term)
    }
}

/// Bayesian linear regression model
#[derive(Debug, Clone)]
pub struct BayesianRegression {
    formula: Formula,
    data: Option<DataFrame>,
    config: BayesConfig,
    result: Option<BayesianRegressionResult>,
}

impl BayesianRegression {
    /// Create a new Bayesian regression model
    pub fn new(formula: &str) -> Result<Self> {
        Ok(Self {
            formula: Formula::parse(formula)?,
            data: None,
            config: BayesConfig::default(),
            result: None,
        })
    }

    /// Set data for the model
    pub fn data(mut self, data: &DataFrame) -> Self {
        self.data = Some(data.clone());
        self
    }

    /// Set configuration
    pub fn config(mut self, config: BayesConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the sampler seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Compute Bayes factors and posterior summaries
    pub fn fit(mut self) -> Result<Self> {
        let data = self.data.as_ref().ok_or(ModelError::NoData)?;
        self.config.validate()?;
        if !self.formula.has_intercept {
            return Err(ModelError::invalid_config(
                "JZS regression requires a model with an intercept",
            ));
        }

        let linear = LinearConfig::default();
        let full = ols::fit_design(self.formula.design(data)?, true, &linear)?;
        let n = full.n_obs();
        let p = full.n_predictors() - 1;
        if p == 0 {
            return Err(ModelError::invalid_config(
                "JZS regression requires at least one predictor",
            ));
        }
        let r_squared = full.model_statistics.r_squared.unwrap_or(0.0);
        let r = self.config.prior_scale;

        let grid = LogGGrid::new(r_squared, n, p, r, self.config.grid_points)?;
        let log_bf10 = grid.log_integral();

        let mut term_bayes_factors = Vec::with_capacity(self.formula.terms.len());
        for term in &self.formula.terms {
            let label = term.to_string();
            let reduced = self.formula.without_term(&label)?;
            let reduced_log_bf = if reduced.terms.is_empty() {
                0.0
            } else {
                let fit = ols::fit_design(reduced.design(data)?, true, &linear)?;
                let r2 = fit.model_statistics.r_squared.unwrap_or(0.0);
                jzs_log_bf(r2, n, fit.n_predictors() - 1, r, self.config.grid_points)?
            };
            let log_bf = log_bf10 - reduced_log_bf;
            term_bayes_factors.push(BayesFactor {
                term: label,
                bf10: log_bf.exp(),
                log_bf10: log_bf,
            });
        }

        let sampler = PosteriorSampler::new(&full.x, &full.y, &full.coefficients, r_squared)?;
        let draws = sampler.sample(&grid, &self.config)?;

        let level = self.config.credible_level;
        let coefficients = full
            .variable_names
            .iter()
            .zip(&draws.coefficients)
            .map(|(name, d)| PosteriorSummary::from_draws(name.clone(), d, level))
            .collect();

        tracing::debug!(
            formula = %self.formula,
            log_bf10,
            draws = self.config.draws,
            "fitted JZS Bayesian regression"
        );

        self.result = Some(BayesianRegressionResult {
            bf10: log_bf10.exp(),
            log_bf10,
            term_bayes_factors,
            coefficients,
            sigma: PosteriorSummary::from_draws("sigma", &draws.sigma, level),
            g: PosteriorSummary::from_draws("g", &draws.g, level),
            r_squared,
            n_obs: n,
            n_predictors: p,
            prior_scale: r,
            draws: self.config.draws,
            credible_level: level,
        });
        Ok(self)
    }

    /// Fitted result, if any
    pub fn result(&self) -> Option<&BayesianRegressionResult> {
        self.result.as_ref()
    }

    /// Posterior means as a coefficient table
    pub fn summary(&self) -> Result<ModelSummary> {
        let result = self.result.as_ref().ok_or(ModelError::NotFitted)?;
        let coefficients = result
            .coefficients
            .iter()
            .map(|c| {
                let coef = Coefficient::new(c.name.clone(), c.mean)
                    .with_std_error(c.sd)
                    .with_ci(c.ci_lower, c.ci_upper);
                if c.name == INTERCEPT {
                    coef.as_intercept()
                } else {
                    coef
                }
            })
            .collect();

        Ok(ModelSummary {
            model_type: ModelType::BayesianRegression,
            formula: self.formula.to_string(),
            n_obs: result.n_obs,
            n_predictors: result.n_predictors + 1,
            coefficients,
            model_statistics: ModelStatistics {
                r_squared: Some(result.r_squared),
                residual_std_error: Some(result.sigma.mean),
                ..ModelStatistics::default()
            },
            residual_statistics: ResidualStatistics::default(),
        })
    }
}

/// ln BF₁₀ of a model with `p` slopes and coefficient of determination `r2`
/// against the intercept-only model
pub fn jzs_log_bf(
    r2: f64,
    n: usize,
    p: usize,
    prior_scale: f64,
    grid_points: usize,
) -> Result<f64> {
    if p == 0 {
        return Ok(0.0);
    }
    Ok(LogGGrid::new(r2, n, p, prior_scale, grid_points)?.log_integral())
}

/// Trapezoid grid over t = ln g holding ln(integrand · dg/dt · weight)
struct LogGGrid {
    log_g: Vec<f64>,
    log_weights: Vec<f64>,
}

impl LogGGrid {
    fn new(r2: f64, n: usize, p: usize, prior_scale: f64, points: usize) -> Result<Self> {
        if n < p + 2 {
            return Err(ModelError::InsufficientData {
                n_samples: n,
                n_predictors: p + 1,
            });
        }
        if r2 >= 1.0 - 1e-12 {
            return Err(ModelError::numerical(
                "perfect fit leaves the Bayes factor unbounded",
                "jzs_bayes_factor",
            ));
        }

        let nf = n as f64;
        let pf = p as f64;
        let s = prior_scale * prior_scale * nf / 2.0;
        let log_prior_norm = 0.5 * s.ln() - 0.5 * std::f64::consts::PI.ln();
        let step = (LOG_G_MAX - LOG_G_MIN) / (points - 1) as f64;
        let one_minus_r2 = (1.0 - r2).max(0.0);

        let mut log_g = Vec::with_capacity(points);
        let mut log_weights = Vec::with_capacity(points);
        for i in 0..points {
            let t = LOG_G_MIN + step * i as f64;
            let g = t.exp();
            let log_likelihood =
                0.5 * (nf - 1.0 - pf) * g.ln_1p() - 0.5 * (nf - 1.0) * (g * one_minus_r2).ln_1p();
            // InvGamma(1/2, s) density times the Jacobian g
            let log_prior = log_prior_norm - 1.5 * t - s / g + t;
            let trapezoid = if i == 0 || i == points - 1 { 0.5 } else { 1.0 };
            log_g.push(t);
            log_weights.push(log_likelihood + log_prior + (trapezoid * step).ln());
        }

        Ok(Self { log_g, log_weights })
    }

    fn log_integral(&self) -> f64 {
        log_sum_exp(&self.log_weights)
    }

    /// Cumulative posterior mass of the grid points
    fn cumulative(&self) -> Vec<f64> {
        let max = self.log_weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut acc = 0.0;
        self.log_weights
            .iter()
            .map(|lw| {
                acc += (lw - max).exp();
                acc
            })
            .collect()
    }
}

fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

struct PosteriorDraws {
    /// One vector of draws per design column, intercept first
    coefficients: Vec<Vec<f64>>,
    sigma: Vec<f64>,
    g: Vec<f64>,
}

/// Conditional posteriors of the centered regression
struct PosteriorSampler {
    beta_hat: Array1<f64>,
    x_means: Array1<f64>,
    y_mean: f64,
    sst: f64,
    r_squared: f64,
    n: usize,
    /// Cholesky factor of (Xc'Xc)⁻¹
    chol: Array2<f64>,
}

impl PosteriorSampler {
    /// `x` includes the intercept column first
    fn new(
        x: &Array2<f64>,
        y: &Array1<f64>,
        coefficients: &Array1<f64>,
        r_squared: f64,
    ) -> Result<Self> {
        let slopes = x.slice(ndarray::s![.., 1..]);
        let x_means = slopes
            .mean_axis(Axis(0))
            .ok_or_else(|| ModelError::numerical("empty design", "posterior_sampler"))?;
        let centered = &slopes - &x_means;
        let y_mean = y.mean().unwrap_or(0.0);
        let sst = y.mapv(|v| (v - y_mean).powi(2)).sum();

        let xtx_inv = linalg::spd_inverse(&centered.t().dot(&centered), "Xc'Xc")?;
        let chol = linalg::cholesky_lower(&xtx_inv, "(Xc'Xc)⁻¹")?;

        Ok(Self {
            beta_hat: coefficients.slice(ndarray::s![1..]).to_owned(),
            x_means,
            y_mean,
            sst,
            r_squared,
            n: x.nrows(),
            chol,
        })
    }

    fn sample(&self, grid: &LogGGrid, config: &BayesConfig) -> Result<PosteriorDraws> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);
        let cumulative = grid.cumulative();
        let total = cumulative.last().copied().unwrap_or(0.0);
        let p = self.beta_hat.len();
        let nf = self.n as f64;
        let shape = (nf - 1.0) / 2.0;

        let mut draws = PosteriorDraws {
            coefficients: vec![Vec::with_capacity(config.draws); p + 1],
            sigma: Vec::with_capacity(config.draws),
            g: Vec::with_capacity(config.draws),
        };

        for _ in 0..config.draws {
            let u: f64 = rng.random::<f64>() * total;
            let idx = cumulative.partition_point(|&c| c < u).min(cumulative.len() - 1);
            let g = grid.log_g[idx].exp();
            let shrink = g / (1.0 + g);

            let rate = self.sst * (1.0 - shrink * self.r_squared) / 2.0;
            let gamma = Gamma::new(shape, 1.0 / rate)
                .map_err(|e| ModelError::numerical(e.to_string(), "posterior_sampler"))?;
            let sigma2 = 1.0 / gamma.sample(&mut rng);

            let z: Array1<f64> = (0..p)
                .map(|_| -> f64 { StandardNormal.sample(&mut rng) })
                .collect();
            let beta = &self.beta_hat * shrink + self.chol.dot(&z) * (shrink * sigma2).sqrt();

            let z0: f64 = StandardNormal.sample(&mut rng);
            let alpha = self.y_mean + (sigma2 / nf).sqrt() * z0;

            draws.coefficients[0].push(alpha - self.x_means.dot(&beta));
            for (j, b) in beta.iter().enumerate() {
                draws.coefficients[j + 1].push(*b);
            }
            draws.sigma.push(sigma2.sqrt());
            draws.g.push(g);
        }

        Ok(draws)
    }
}
