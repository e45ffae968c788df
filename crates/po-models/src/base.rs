//! Types every regression fitter reports through
//!
//! OLS and robust results both implement [`FittedModel`], which is what the
//! diagnostics and the analysis layer read coefficients and residuals from.

use ndarray::Array1;

pub use coefficient::Coefficient;
pub use statistics::{ModelStatistics, ResidualStatistics};
pub use summary::{ModelSummary, ModelType};

pub use crate::error::{ErrorKind, ModelError};

pub mod coefficient;
pub mod statistics;
pub mod summary;

pub type Result<T> = std::result::Result<T, ModelError>;

/// Read access to a fitted regression
pub trait FittedModel: Send + Sync {
    /// Coefficient table in design-column order
    fn coefficients(&self) -> &[Coefficient];

    fn fitted_values(&self) -> &Array1<f64>;

    fn residuals(&self) -> &Array1<f64>;

    fn statistics(&self) -> &ModelStatistics;

    fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients().iter().find(|c| c.name == name)
    }

    fn r_squared(&self) -> Option<f64> {
        self.statistics().r_squared
    }
}
