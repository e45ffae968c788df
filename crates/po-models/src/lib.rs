//! Estimators for the PathOxide analyses
//!
//! - [`lm`]: OLS with diagnostics, robust M-estimation and JZS Bayesian
//!   regression, all driven by R-style formulas
//! - [`sem`]: recursive path models with bootstrap or normal-theory
//!   standard errors
//!
//! Fitters follow one builder shape:
//!
//! ```no_run
//! # use po_core::data::DataFrame;
//! # fn demo(df: &DataFrame) -> po_models::base::Result<()> {
//! use po_models::lm::LinearRegression;
//!
//! let model = LinearRegression::new("y ~ x + w")?.data(df).fit()?;
//! println!("{}", model.summary()?);
//! # Ok(())
//! # }
//! ```

pub mod base;
pub mod error;
pub mod inference;
pub mod linalg;
pub mod lm;
pub mod sem;

pub use base::{Coefficient, ErrorKind, FittedModel, ModelError, ModelSummary, Result};
pub use lm::{BayesianRegression, LinearRegression, RegressionDiagnostics, RobustRegression};
pub use sem::{PathModel, PathModelResult, SemConfig};
