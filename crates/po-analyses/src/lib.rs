//! Reproducible mediation, regression and moderation analyses
//!
//! Each analysis loads or simulates its dataset, fits its models with
//! [`po_models`] and returns a serializable report:
//!
//! - [`mediation`]: path model with bootstrap intervals for indirect effects,
//!   plus the causal-steps regressions
//! - [`regression`]: OLS, case diagnostics, robust fit with a bias test and a
//!   Bayesian fit with Bayes factors
//! - [`moderation`]: moderated regression with simple slopes and
//!   Johnson–Neyman boundaries
//!
//! ```no_run
//! use po_analyses::{AnalysisConfig, MediationAnalysis};
//!
//! # fn demo() -> po_analyses::Result<()> {
//! let config = AnalysisConfig::from_path("analysis.toml")?;
//! let report = MediationAnalysis::new(config.mediation)?.run()?;
//! println!("{}", report.model);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod descriptives;
pub mod error;
pub mod mediation;
pub mod moderation;
pub mod regression;

pub use config::{AnalysisConfig, DataSource};
pub use descriptives::Descriptives;
pub use error::{AnalysisError, Result};
pub use mediation::{MediationAnalysis, MediationConfig, MediationDesign, MediationReport};
pub use moderation::{ModerationAnalysis, ModerationConfig, ModerationReport};
pub use regression::{RegressionAnalysis, RegressionConfig, RegressionReport};
