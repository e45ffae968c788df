//! Moderation analysis
//!
//! The effect of X on Y is allowed to depend linearly on a moderator W:
//!
//! ```text
//! y = b0 + b1·x + b2·w + b3·x·w + e
//! ```
//!
//! The conditional slope of X at W = w is `b1 + b3·w`, with variance
//! `V11 + 2w·V13 + w²·V33`. It is probed at the mean of W and one standard
//! deviation either side, and the Johnson–Neyman boundaries give the values
//! of W where it crosses the significance threshold. Predictors are
//! mean-centered before fitting unless disabled; reported moderator values
//! are always on the original scale.

use serde::{Deserialize, Serialize};

use crate::config::DataSource;
use crate::descriptives::Descriptives;
use crate::error::{AnalysisError, Result};
use po_core::data::{DataFrame, Simulator};
use po_models::inference::{pvalue_f, pvalue_t, t_critical};
use po_models::lm::{LinearConfig, LinearRegression, LinearRegressionResult};
use po_models::{Coefficient, FittedModel, ModelError, ModelSummary};

/// Data-generating process for simulated moderation data
///
/// `x ~ N(x_mean, 1)`, `w ~ N(w_mean, 1)` and
/// `y = intercept + b_x·x + b_w·w + b_xw·x·w` plus N(0, noise_sd²) noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationSimulation {
    pub n: usize,
    pub seed: u64,
    pub x_mean: f64,
    pub w_mean: f64,
    pub intercept: f64,
    pub b_x: f64,
    pub b_w: f64,
    pub b_xw: f64,
    pub noise_sd: f64,
}

impl Default for ModerationSimulation {
    fn default() -> Self {
        Self {
            n: 300,
            seed: 11,
            x_mean: 3.0,
            w_mean: 2.0,
            intercept: 1.0,
            b_x: 0.4,
            b_w: 0.3,
            b_xw: 0.25,
            noise_sd: 1.0,
        }
    }
}

impl ModerationSimulation {
    pub fn simulate(&self, x: &str, w: &str, y: &str) -> po_core::data::Result<DataFrame> {
        Ok(Simulator::new(self.n, self.seed)
            .normal(x, self.x_mean, 1.0)?
            .normal(w, self.w_mean, 1.0)?
            .linear_with_interaction(
                y,
                self.intercept,
                &[(x, self.b_x), (w, self.b_w)],
                (x, w, self.b_xw),
                self.noise_sd,
            )?
            .build())
    }
}

/// Moderation analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Focal predictor
    pub x: String,
    /// Moderator
    pub w: String,
    /// Outcome
    pub y: String,
    /// Mean-center `x` and `w` before fitting
    pub center: bool,
    /// Simple slopes are probed at the moderator mean ± this many SDs
    pub probe_sd: f64,
    pub data: DataSource<ModerationSimulation>,
    /// OLS settings; the confidence level also drives the Johnson–Neyman
    /// threshold
    pub linear: LinearConfig,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            x: "x".to_string(),
            w: "w".to_string(),
            y: "y".to_string(),
            center: true,
            probe_sd: 1.0,
            data: DataSource::default(),
            linear: LinearConfig::default(),
        }
    }
}

impl ModerationConfig {
    fn validate(&self) -> Result<()> {
        if self.x == self.w || self.x == self.y || self.w == self.y {
            return Err(AnalysisError::invalid(
                "predictor, moderator and outcome must be distinct variables",
            ));
        }
        if !(self.probe_sd > 0.0 && self.probe_sd.is_finite()) {
            return Err(AnalysisError::invalid(format!(
                "probe_sd must be positive, got {}",
                self.probe_sd
            )));
        }
        if !self.linear.intercept {
            return Err(AnalysisError::invalid(
                "moderation models are fitted with an intercept",
            ));
        }
        Ok(())
    }

    /// Formula of the moderated regression
    pub fn formula(&self) -> String {
        format!("{y} ~ {x} + {w} + {x}:{w}", x = self.x, w = self.w, y = self.y)
    }

    fn interaction(&self) -> String {
        format!("{}:{}", self.x, self.w)
    }
}

/// Slope of X at a given moderator value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleSlope {
    /// `-1 SD`, `Mean`, `+1 SD`, or empty for ad-hoc probes
    pub label: String,
    /// Moderator value on its original scale
    pub moderator: f64,
    pub estimate: f64,
    pub se: f64,
    pub t: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// Conditional effect of X as a function of W
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalEffect {
    /// Coefficient of `x`
    pub b1: f64,
    /// Coefficient of `x:w`
    pub b3: f64,
    pub var_b1: f64,
    pub cov_b1_b3: f64,
    pub var_b3: f64,
    pub df: usize,
    pub confidence_level: f64,
    /// Subtracted from W before fitting (its mean when centered)
    pub moderator_offset: f64,
}

impl ConditionalEffect {
    fn from_fit(
        result: &LinearRegressionResult,
        x: &str,
        interaction: &str,
        offset: f64,
    ) -> Result<Self> {
        let index = |name: &str| {
            result.index_of(name).ok_or_else(|| {
                AnalysisError::invalid(format!("moderation model has no coefficient '{}'", name))
            })
        };
        let (i, j) = (index(x)?, index(interaction)?);
        let v = result.cov_matrix();

        Ok(Self {
            b1: result.coefficients[i],
            b3: result.coefficients[j],
            var_b1: v[[i, i]],
            cov_b1_b3: v[[i, j]],
            var_b3: v[[j, j]],
            df: result.df_residual(),
            confidence_level: result.confidence_level,
            moderator_offset: offset,
        })
    }

    /// Slope of X at moderator value `w` (original scale)
    pub fn slope_at(&self, w: f64) -> SimpleSlope {
        let wc = w - self.moderator_offset;
        let estimate = self.b1 + self.b3 * wc;
        let se = (self.var_b1 + 2.0 * wc * self.cov_b1_b3 + wc * wc * self.var_b3)
            .max(0.0)
            .sqrt();
        let t = estimate / se;
        let df = self.df as f64;
        let margin = t_critical(self.confidence_level, df) * se;

        SimpleSlope {
            label: String::new(),
            moderator: w,
            estimate,
            se,
            t,
            p_value: pvalue_t(t, df),
            ci_lower: estimate - margin,
            ci_upper: estimate + margin,
        }
    }

    /// Moderator values (original scale) where the slope of X is exactly
    /// at the significance threshold
    pub fn johnson_neyman(&self, observed_range: (f64, f64)) -> JohnsonNeyman {
        let t = t_critical(self.confidence_level, self.df as f64);
        let t2 = t * t;

        // significant where a·w² + b·w + c > 0 (centered w)
        let a = self.b3 * self.b3 - t2 * self.var_b3;
        let b = 2.0 * (self.b1 * self.b3 - t2 * self.cov_b1_b3);
        let c = self.b1 * self.b1 - t2 * self.var_b1;

        let scale = (self.b3 * self.b3 + t2 * self.var_b3).max(f64::MIN_POSITIVE);
        let (roots, region) = if a.abs() < 1e-12 * scale {
            if b == 0.0 {
                let region = if c > 0.0 { JnRegion::Everywhere } else { JnRegion::Nowhere };
                (Vec::new(), region)
            } else {
                let region = if b > 0.0 { JnRegion::Above } else { JnRegion::Below };
                (vec![-c / b], region)
            }
        } else {
            let disc = b * b - 4.0 * a * c;
            if disc < 0.0 {
                let region = if a > 0.0 { JnRegion::Everywhere } else { JnRegion::Nowhere };
                (Vec::new(), region)
            } else {
                let sqrt_disc = disc.sqrt();
                let mut roots = vec![(-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a)];
                roots.sort_by(f64::total_cmp);
                let region = if a > 0.0 { JnRegion::Outside } else { JnRegion::Between };
                (roots, region)
            }
        };

        let (low, high) = observed_range;
        let boundaries = roots
            .into_iter()
            .map(|root| {
                let value = root + self.moderator_offset;
                JnBoundary {
                    value,
                    within_observed_range: value >= low && value <= high,
                }
            })
            .collect();

        JohnsonNeyman {
            critical_t: t,
            boundaries,
            region,
        }
    }
}

/// Where along W the slope of X is significant, relative to the boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JnRegion {
    /// Below the lower and above the upper boundary
    Outside,
    /// Between the two boundaries
    Between,
    /// Above the single boundary
    Above,
    /// Below the single boundary
    Below,
    Everywhere,
    Nowhere,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JnBoundary {
    /// Moderator value on its original scale
    pub value: f64,
    pub within_observed_range: bool,
}

/// Johnson–Neyman regions of significance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JohnsonNeyman {
    pub critical_t: f64,
    /// Sorted boundaries; none when the slope is significant everywhere or
    /// nowhere
    pub boundaries: Vec<JnBoundary>,
    pub region: JnRegion,
}

/// R² gained by adding the interaction term
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RSquaredChange {
    pub delta: f64,
    pub f_statistic: f64,
    pub df1: usize,
    pub df2: usize,
    pub p_value: f64,
}

/// Everything a moderation run produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationReport {
    pub formula: String,
    pub centered: bool,
    /// Descriptives of the uncentered variables
    pub descriptives: Descriptives,
    pub model: ModelSummary,
    pub interaction: Coefficient,
    pub r_squared_change: RSquaredChange,
    pub conditional: ConditionalEffect,
    /// At mean − probe_sd·SD, the mean and mean + probe_sd·SD of W
    pub simple_slopes: Vec<SimpleSlope>,
    pub johnson_neyman: JohnsonNeyman,
}

/// Moderation analysis runner
#[derive(Debug, Clone)]
pub struct ModerationAnalysis {
    config: ModerationConfig,
    data: Option<DataFrame>,
}

impl ModerationAnalysis {
    /// Check the settings
    pub fn new(config: ModerationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, data: None })
    }

    /// Use this frame instead of the configured data source
    pub fn data(mut self, data: &DataFrame) -> Self {
        self.data = Some(data.clone());
        self
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    /// Load the data, fit the moderated regression and probe the interaction
    pub fn run(&self) -> Result<ModerationReport> {
        let config = &self.config;
        let variables = [config.x.as_str(), config.w.as_str(), config.y.as_str()];
        let df = match &self.data {
            Some(df) => {
                df.require_columns(&variables)?;
                df.clone()
            }
            None => config
                .data
                .load(&variables, |sim| sim.simulate(&config.x, &config.w, &config.y))?,
        };

        tracing::info!(n = df.nrows(), centered = config.center, "running moderation analysis");

        let descriptives = Descriptives::compute(&df, &variables)?;
        let w_values = df.float_column(&config.w)?;
        let w_mean = w_values.mean().unwrap_or(0.0);
        let w_sd = w_values.std(1.0);
        let w_range = w_values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        let mut fit_data = df.clone();
        if config.center {
            fit_data.center_columns(&[&config.x, &config.w])?;
        }
        let offset = if config.center { w_mean } else { 0.0 };

        let formula = config.formula();
        let model = LinearRegression::new(&formula)?
            .data(&fit_data)
            .config(config.linear.clone())
            .fit()?;
        let result = model.result().ok_or(ModelError::NotFitted)?;

        let interaction_name = config.interaction();
        let interaction = result
            .coefficient(&interaction_name)
            .cloned()
            .ok_or_else(|| {
                AnalysisError::invalid(format!("no coefficient '{}'", interaction_name))
            })?;

        let additive_formula = format!("{} ~ {} + {}", config.y, config.x, config.w);
        let additive = LinearRegression::new(&additive_formula)?
            .data(&fit_data)
            .config(config.linear.clone())
            .fit()?;
        let r_squared_change =
            r_squared_change(result, additive.result().ok_or(ModelError::NotFitted)?);

        let conditional =
            ConditionalEffect::from_fit(result, &config.x, &interaction_name, offset)?;
        let simple_slopes = [
            (format!("-{} SD", config.probe_sd), w_mean - config.probe_sd * w_sd),
            ("Mean".to_string(), w_mean),
            (format!("+{} SD", config.probe_sd), w_mean + config.probe_sd * w_sd),
        ]
        .into_iter()
        .map(|(label, w)| SimpleSlope {
            label,
            ..conditional.slope_at(w)
        })
        .collect();
        let johnson_neyman = conditional.johnson_neyman(w_range);

        for boundary in johnson_neyman.boundaries.iter().filter(|b| b.within_observed_range) {
            tracing::debug!(moderator = boundary.value, "Johnson-Neyman boundary");
        }
        tracing::info!(
            interaction = interaction.estimate,
            delta_r_squared = r_squared_change.delta,
            region = ?johnson_neyman.region,
            "moderation analysis finished"
        );

        Ok(ModerationReport {
            formula,
            centered: config.center,
            descriptives,
            model: model.summary()?,
            interaction,
            r_squared_change,
            conditional,
            simple_slopes,
            johnson_neyman,
        })
    }
}

fn r_squared_change(
    full: &LinearRegressionResult,
    reduced: &LinearRegressionResult,
) -> RSquaredChange {
    let r2 = |r: &LinearRegressionResult| 1.0 - r.rss() / r.tss();
    let delta = r2(full) - r2(reduced);
    let df1 = full.n_predictors() - reduced.n_predictors();
    let df2 = full.df_residual();
    let f_statistic = (delta / df1 as f64) / ((1.0 - r2(full)) / df2 as f64);

    RSquaredChange {
        delta,
        f_statistic,
        df1,
        df2,
        p_value: pvalue_f(f_statistic, df1 as f64, df2 as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn effect() -> ConditionalEffect {
        ConditionalEffect {
            b1: 0.2,
            b3: 0.3,
            var_b1: 0.01,
            cov_b1_b3: 0.001,
            var_b3: 0.004,
            df: 100,
            confidence_level: 0.95,
            moderator_offset: 2.0,
        }
    }

    #[test]
    fn test_slope_at_offset_is_b1() {
        let slope = effect().slope_at(2.0);
        assert_relative_eq!(slope.estimate, 0.2, epsilon = 1e-12);
        assert_relative_eq!(slope.se, 0.1, epsilon = 1e-12);
        assert_relative_eq!(slope.t, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_johnson_neyman_boundaries_sit_on_critical_t() {
        let effect = effect();
        let jn = effect.johnson_neyman((-10.0, 10.0));
        assert_eq!(jn.region, JnRegion::Outside);
        assert_eq!(jn.boundaries.len(), 2);

        for boundary in &jn.boundaries {
            let slope = effect.slope_at(boundary.value);
            assert_relative_eq!(slope.t.abs(), jn.critical_t, epsilon = 1e-8);
            assert!(boundary.within_observed_range);
        }

        let (lo, hi) = (jn.boundaries[0].value, jn.boundaries[1].value);
        assert!(effect.slope_at(hi + 1.0).p_value < 0.05);
        assert!(effect.slope_at(lo - 1.0).p_value < 0.05);
        assert!(effect.slope_at((lo + hi) / 2.0).p_value > 0.05);
    }

    #[test]
    fn test_johnson_neyman_without_interaction_signal() {
        let effect = ConditionalEffect {
            b1: 0.0,
            b3: 0.0,
            ..effect()
        };
        let jn = effect.johnson_neyman((0.0, 4.0));
        assert_eq!(jn.region, JnRegion::Nowhere);
        assert!(jn.boundaries.is_empty());
    }
}
