//! Mediation analysis
//!
//! X affects Y directly and through one or more mediators. All effects are
//! estimated jointly as a path model, by default with bootstrap intervals,
//! next to the causal-steps (Baron–Kenny) regressions.
//!
//! Three designs are supported:
//!
//! - `Simple`: `x → m → y`, effects `ab` and `total`
//! - `Parallel`: mediators that do not affect each other, one indirect
//!   effect `ind<i>` per mediator
//! - `Serial`: every mediator also depends on the mediators before it;
//!   indirect effects run through every ordered chain of mediators and are
//!   named after it (`ind1`, `ind2`, `ind12`, ...)

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::config::DataSource;
use crate::descriptives::Descriptives;
use crate::error::{AnalysisError, Result};
use po_core::data::{DataFrame, Simulator};
use po_models::lm::{LinearConfig, LinearRegression};
use po_models::sem::{ParamEstimate, PathModel, PathModelResult, SemConfig};
use po_models::{Coefficient, FittedModel};

/// Most mediators a serial design may chain
const MAX_SERIAL_MEDIATORS: usize = 4;

/// Arrangement of the mediators
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediationDesign {
    #[default]
    Simple,
    Parallel,
    Serial,
}

/// Data-generating process for simulated mediation data
///
/// `x ~ N(0, 1)`, each mediator `a·x` (plus `d·` the previous mediator in
/// serial designs) and `y = c'·x + Σ b·m`, all with N(0, noise_sd²) noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediationSimulation {
    pub n: usize,
    pub seed: u64,
    pub a: f64,
    pub b: f64,
    pub c_prime: f64,
    /// Effect of each mediator on the next one (serial designs)
    pub d: f64,
    pub noise_sd: f64,
}

impl Default for MediationSimulation {
    fn default() -> Self {
        Self {
            n: 200,
            seed: 42,
            a: 0.5,
            b: 0.4,
            c_prime: 0.1,
            d: 0.3,
            noise_sd: 1.0,
        }
    }
}

impl MediationSimulation {
    /// Generate a frame with columns `x`, the mediators and `y`
    pub fn simulate(
        &self,
        design: MediationDesign,
        x: &str,
        mediators: &[String],
        y: &str,
    ) -> po_core::data::Result<DataFrame> {
        let mut sim = Simulator::new(self.n, self.seed).normal(x, 0.0, 1.0)?;

        for (i, m) in mediators.iter().enumerate() {
            let mut terms = vec![(x, self.a)];
            if design == MediationDesign::Serial && i > 0 {
                terms.push((mediators[i - 1].as_str(), self.d));
            }
            sim = sim.linear(m, 0.0, &terms, self.noise_sd)?;
        }

        let mut terms = vec![(x, self.c_prime)];
        terms.extend(mediators.iter().map(|m| (m.as_str(), self.b)));
        Ok(sim.linear(y, 0.0, &terms, self.noise_sd)?.build())
    }
}

/// Mediation analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediationConfig {
    pub design: MediationDesign,
    /// Predictor
    pub x: String,
    /// Outcome
    pub y: String,
    pub mediators: Vec<String>,
    pub data: DataSource<MediationSimulation>,
    /// Path-model settings; bootstrap standard errors by default
    pub sem: SemConfig,
    /// Settings of the causal-steps regressions
    pub linear: LinearConfig,
}

impl Default for MediationConfig {
    fn default() -> Self {
        Self {
            design: MediationDesign::Simple,
            x: "x".to_string(),
            y: "y".to_string(),
            mediators: vec!["m".to_string()],
            data: DataSource::default(),
            sem: SemConfig::default(),
            linear: LinearConfig::default(),
        }
    }
}

impl MediationConfig {
    /// Single mediator `m`
    pub fn simple() -> Self {
        Self::default()
    }

    /// Independent mediators
    pub fn parallel<S: AsRef<str>>(mediators: &[S]) -> Self {
        Self::with_mediators(MediationDesign::Parallel, mediators)
    }

    /// Chained mediators, in causal order
    pub fn serial<S: AsRef<str>>(mediators: &[S]) -> Self {
        Self::with_mediators(MediationDesign::Serial, mediators)
    }

    fn with_mediators<S: AsRef<str>>(design: MediationDesign, mediators: &[S]) -> Self {
        Self {
            design,
            mediators: mediators.iter().map(|m| m.as_ref().to_string()).collect(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        let k = self.mediators.len();
        match self.design {
            MediationDesign::Simple if k != 1 => {
                return Err(AnalysisError::invalid(format!(
                    "a simple mediation design needs exactly one mediator, got {}",
                    k
                )));
            }
            MediationDesign::Parallel if k < 2 => {
                return Err(AnalysisError::invalid(
                    "a parallel mediation design needs at least two mediators",
                ));
            }
            MediationDesign::Serial if !(2..=MAX_SERIAL_MEDIATORS).contains(&k) => {
                return Err(AnalysisError::invalid(format!(
                    "a serial mediation design needs 2 to {} mediators, got {}",
                    MAX_SERIAL_MEDIATORS, k
                )));
            }
            _ => {}
        }

        let variables = self.variables();
        for (i, name) in variables.iter().enumerate() {
            if variables[..i].contains(name) {
                return Err(AnalysisError::invalid(format!(
                    "variable '{}' appears more than once",
                    name
                )));
            }
        }
        Ok(())
    }

    /// `x`, the mediators, then `y`
    pub fn variables(&self) -> Vec<&str> {
        std::iter::once(self.x.as_str())
            .chain(self.mediators.iter().map(String::as_str))
            .chain(std::iter::once(self.y.as_str()))
            .collect()
    }

    /// Path-model description of the design with its derived effects
    pub fn model_syntax(&self) -> String {
        self.build_model().0
    }

    fn build_model(&self) -> (String, Vec<IndirectPath>) {
        let (x, y) = (&self.x, &self.y);
        let mut syntax = String::new();

        if self.design == MediationDesign::Simple {
            let m = &self.mediators[0];
            let _ = writeln!(syntax, "{m} ~ a*{x}");
            let _ = writeln!(syntax, "{y} ~ cp*{x} + b*{m}");
            let _ = writeln!(syntax, "ab := a*b");
            let _ = writeln!(syntax, "total := cp + ab");
            let path = IndirectPath {
                name: "ab".to_string(),
                through: vec![m.clone()],
            };
            return (syntax, vec![path]);
        }

        let serial = self.design == MediationDesign::Serial;
        for (i, m) in self.mediators.iter().enumerate() {
            let _ = write!(syntax, "{m} ~ a{}*{x}", i + 1);
            if serial {
                for (j, earlier) in self.mediators[..i].iter().enumerate() {
                    let _ = write!(syntax, " + d{}{}*{earlier}", i + 1, j + 1);
                }
            }
            syntax.push('\n');
        }

        let _ = write!(syntax, "{y} ~ cp*{x}");
        for (i, m) in self.mediators.iter().enumerate() {
            let _ = write!(syntax, " + b{}*{m}", i + 1);
        }
        syntax.push('\n');

        let chains = if serial {
            mediator_chains(self.mediators.len())
        } else {
            (0..self.mediators.len()).map(|i| vec![i]).collect()
        };

        let mut paths = Vec::with_capacity(chains.len());
        for chain in chains {
            let digits: String = chain.iter().map(|i| (i + 1).to_string()).collect();
            let mut factors = vec![format!("a{}", chain[0] + 1)];
            factors.extend(
                chain
                    .windows(2)
                    .map(|pair| format!("d{}{}", pair[1] + 1, pair[0] + 1)),
            );
            factors.push(format!("b{}", chain[chain.len() - 1] + 1));

            let name = format!("ind{}", digits);
            let _ = writeln!(syntax, "{} := {}", name, factors.join("*"));
            paths.push(IndirectPath {
                name,
                through: chain.iter().map(|&i| self.mediators[i].clone()).collect(),
            });
        }

        let names: Vec<&str> = paths.iter().map(|p| p.name.as_str()).collect();
        let _ = writeln!(syntax, "total_indirect := {}", names.join(" + "));
        let _ = writeln!(syntax, "total := cp + total_indirect");
        (syntax, paths)
    }
}

/// Every increasing chain of mediator indices, shortest first
fn mediator_chains(k: usize) -> Vec<Vec<usize>> {
    let mut chains: Vec<Vec<usize>> = (1..1usize << k)
        .map(|mask| (0..k).filter(|i| mask & (1 << i) != 0).collect())
        .collect();
    chains.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    chains
}

#[derive(Debug, Clone)]
struct IndirectPath {
    name: String,
    through: Vec<String>,
}

/// One effect read off the path model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub name: String,
    /// Mediators the effect runs through, in order; empty for the direct
    /// and total effects
    pub through: Vec<String>,
    pub estimate: f64,
    pub se: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub p_value: f64,
    pub std_estimate: f64,
}

impl Effect {
    fn from_row(row: &ParamEstimate, through: Vec<String>) -> Self {
        Self {
            name: row.name.clone(),
            through,
            estimate: row.est,
            se: row.se,
            ci_lower: row.ci_lower,
            ci_upper: row.ci_upper,
            p_value: row.p_value,
            std_estimate: row.est_std,
        }
    }

    /// Whether the confidence interval excludes zero
    pub fn is_significant(&self) -> bool {
        self.ci_lower > 0.0 || self.ci_upper < 0.0
    }
}

/// The causal-steps regressions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CausalSteps {
    /// `y ~ x`
    pub total: Coefficient,
    /// `m ~ x` for each mediator, named `m~x`
    pub a_paths: Vec<Coefficient>,
    /// Mediator coefficients in `y ~ x + mediators`, named `y~m`
    pub b_paths: Vec<Coefficient>,
    /// Coefficient of `x` in `y ~ x + mediators`
    pub direct: Coefficient,
}

/// Conclusion drawn from the indirect and direct effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediationType {
    /// Indirect effect present, no direct effect
    Full,
    /// Both indirect and direct effects present
    Partial,
    /// Only a direct effect
    DirectOnly,
    /// Neither effect present
    NoEffect,
}

/// Everything a mediation run produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediationReport {
    pub design: MediationDesign,
    pub syntax: String,
    pub descriptives: Descriptives,
    pub model: PathModelResult,
    /// `cp`
    pub direct: Effect,
    /// One entry per indirect path
    pub indirect: Vec<Effect>,
    /// Sum of the indirect effects (`ab` for a simple design)
    pub total_indirect: Effect,
    pub total: Effect,
    /// Total indirect effect over total effect; absent when the total
    /// effect vanishes
    pub proportion_mediated: Option<f64>,
    pub causal_steps: CausalSteps,
    pub classification: MediationType,
}

impl MediationReport {
    /// Indirect effect by name
    pub fn indirect_effect(&self, name: &str) -> Option<&Effect> {
        self.indirect.iter().find(|e| e.name == name)
    }
}

/// Mediation analysis runner
#[derive(Debug, Clone)]
pub struct MediationAnalysis {
    config: MediationConfig,
    data: Option<DataFrame>,
}

impl MediationAnalysis {
    /// Check the settings
    pub fn new(config: MediationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, data: None })
    }

    /// Use this frame instead of the configured data source
    pub fn data(mut self, data: &DataFrame) -> Self {
        self.data = Some(data.clone());
        self
    }

    pub fn config(&self) -> &MediationConfig {
        &self.config
    }

    /// Load the data, fit the path model and the causal-steps regressions
    pub fn run(&self) -> Result<MediationReport> {
        let config = &self.config;
        let variables = config.variables();
        let df = match &self.data {
            Some(df) => {
                df.require_columns(&variables)?;
                df.clone()
            }
            None => config.data.load(&variables, |sim| {
                sim.simulate(config.design, &config.x, &config.mediators, &config.y)
            })?,
        };

        tracing::info!(
            design = ?config.design,
            mediators = config.mediators.len(),
            n = df.nrows(),
            "running mediation analysis"
        );

        let descriptives = Descriptives::compute(&df, &variables)?;
        let (syntax, paths) = config.build_model();
        let model = PathModel::new(&syntax)?
            .data(&df)
            .config(config.sem.clone())
            .fit()?;
        let result = model.result().cloned().ok_or(po_models::ModelError::NotFitted)?;

        let row = |name: &str| {
            result.get(name).ok_or_else(|| {
                AnalysisError::invalid(format!("path model has no parameter '{}'", name))
            })
        };

        let direct = Effect::from_row(row("cp")?, Vec::new());
        let indirect = paths
            .iter()
            .map(|p| Ok(Effect::from_row(row(&p.name)?, p.through.clone())))
            .collect::<Result<Vec<_>>>()?;
        let total_indirect = match config.design {
            MediationDesign::Simple => indirect[0].clone(),
            _ => Effect::from_row(row("total_indirect")?, config.mediators.clone()),
        };
        let total = Effect::from_row(row("total")?, Vec::new());

        let proportion_mediated =
            (total.estimate.abs() > 1e-12).then(|| total_indirect.estimate / total.estimate);

        let alpha = 1.0 - config.sem.confidence_level;
        let classification = classify(&total_indirect, &direct, alpha);
        let causal_steps = causal_steps(config, &df)?;

        tracing::info!(
            indirect = total_indirect.estimate,
            direct = direct.estimate,
            classification = ?classification,
            "mediation analysis finished"
        );

        Ok(MediationReport {
            design: config.design,
            syntax,
            descriptives,
            model: result,
            direct,
            indirect,
            total_indirect,
            total,
            proportion_mediated,
            causal_steps,
            classification,
        })
    }
}

fn classify(indirect: &Effect, direct: &Effect, alpha: f64) -> MediationType {
    match (indirect.is_significant(), direct.p_value < alpha) {
        (true, false) => MediationType::Full,
        (true, true) => MediationType::Partial,
        (false, true) => MediationType::DirectOnly,
        (false, false) => MediationType::NoEffect,
    }
}

fn causal_steps(config: &MediationConfig, df: &DataFrame) -> Result<CausalSteps> {
    let (x, y) = (&config.x, &config.y);
    let coefficient = |formula: &str, term: &str, name: String| -> Result<Coefficient> {
        let model = LinearRegression::new(formula)?
            .data(df)
            .config(config.linear.clone())
            .fit()?;
        let mut coef = model
            .result()
            .and_then(|r| r.coefficient(term))
            .cloned()
            .ok_or_else(|| {
                AnalysisError::invalid(format!("'{}' has no coefficient '{}'", formula, term))
            })?;
        coef.name = name;
        Ok(coef)
    };

    let total = coefficient(&format!("{y} ~ {x}"), x, format!("{y}~{x}"))?;
    let a_paths = config
        .mediators
        .iter()
        .map(|m| coefficient(&format!("{m} ~ {x}"), x, format!("{m}~{x}")))
        .collect::<Result<Vec<_>>>()?;

    let full = format!("{y} ~ {x} + {}", config.mediators.join(" + "));
    let direct = coefficient(&full, x, format!("{y}~{x}"))?;
    let b_paths = config
        .mediators
        .iter()
        .map(|m| coefficient(&full, m, format!("{y}~{m}")))
        .collect::<Result<Vec<_>>>()?;

    Ok(CausalSteps {
        total,
        a_paths,
        b_paths,
        direct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mediator_chains() {
        assert_eq!(mediator_chains(2), vec![vec![0], vec![1], vec![0, 1]]);
        let chains = mediator_chains(3);
        assert_eq!(chains.len(), 7);
        assert_eq!(chains[3], vec![0, 1]);
        assert_eq!(chains[6], vec![0, 1, 2]);
    }

    #[test]
    fn test_serial_syntax() {
        let config = MediationConfig::serial(&["m1", "m2"]);
        let expected = "m1 ~ a1*x\n\
                        m2 ~ a2*x + d21*m1\n\
                        y ~ cp*x + b1*m1 + b2*m2\n\
                        ind1 := a1*b1\n\
                        ind2 := a2*b2\n\
                        ind12 := a1*d21*b2\n\
                        total_indirect := ind1 + ind2 + ind12\n\
                        total := cp + total_indirect\n";
        assert_eq!(config.model_syntax(), expected);
    }

    #[test]
    fn test_simple_syntax() {
        let syntax = MediationConfig::simple().model_syntax();
        assert!(syntax.contains("m ~ a*x"));
        assert!(syntax.contains("ab := a*b"));
        assert!(syntax.contains("total := cp + ab"));
    }

    #[test]
    fn test_validation() {
        let mut config = MediationConfig::simple();
        config.mediators.push("m2".to_string());
        assert!(MediationAnalysis::new(config).is_err());

        assert!(MediationAnalysis::new(MediationConfig::parallel(&["m"])).is_err());
        let five = MediationConfig::serial(&["a", "b", "c", "d", "e"]);
        assert!(MediationAnalysis::new(five).is_err());
        assert!(MediationAnalysis::new(MediationConfig::parallel(&["m", "m"])).is_err());
        assert!(MediationAnalysis::new(MediationConfig::parallel(&["m1", "m2", "m3"])).is_ok());
    }
}
