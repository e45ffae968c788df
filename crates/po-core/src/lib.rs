//! Data structures and model descriptions shared by the PathOxide analyses
//!
//! - [`data`]: the tabular dataset, CSV loading and seeded simulation
//! - [`formula`]: R-style regression formulas and design matrices
//! - [`syntax`]: path-model specifications with labelled coefficients and
//!   derived quantities

pub mod data;
pub mod formula;
pub mod syntax;

pub use data::{DataError, DataFrame, Series};
pub use formula::{Formula, FormulaError};
pub use syntax::{ModelSpec, SyntaxError};
