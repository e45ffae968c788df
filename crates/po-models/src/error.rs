//! Errors raised by the fitters

use thiserror::Error;

use po_core::data::DataError;
use po_core::formula::error::FormulaError;
use po_core::syntax::SyntaxError;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Formula error: {0}")]
    Formula(#[from] FormulaError),

    #[error("Model syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Non-finite input or a computation that left the real line
    #[error("Numerical error in {operation}: {message}")]
    NumericalError { message: String, operation: String },

    #[error("{n_samples} cases cannot identify {n_predictors} parameters")]
    InsufficientData { n_samples: usize, n_predictors: usize },

    #[error("Predictor '{variable}' is constant")]
    ZeroVariance { variable: String },

    /// IRLS stopped at its iteration cap without meeting the tolerance
    #[error("No convergence within {max_iter} iterations")]
    NotConverged { max_iter: usize },

    /// Not positive definite, or numerically rank deficient
    #[error("Singular {context}")]
    SingularMatrix { context: String },

    #[error("None of the {attempted} bootstrap replicates could be refitted")]
    BootstrapFailed { attempted: usize },

    #[error("Invalid settings: {message}")]
    InvalidConfig { message: String },

    #[error("Model has not been fitted")]
    NotFitted,

    #[error("No data attached to the model")]
    NoData,

    /// New data does not expand to the fitted design
    #[error("Cannot predict: {message}")]
    PredictionError { message: String },
}

/// Coarse classification of failures reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The model could not be estimated on this data
    EstimationFailure,
    /// The model description is invalid
    SpecificationError,
    /// The data does not have the required shape or types
    DataShapeError,
}

impl ModelError {
    pub(crate) fn numerical(message: impl Into<String>, operation: &str) -> Self {
        ModelError::NumericalError {
            message: message.into(),
            operation: operation.to_string(),
        }
    }

    pub(crate) fn singular(context: &str) -> Self {
        ModelError::SingularMatrix {
            context: context.to_string(),
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        ModelError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Map the error onto [`ErrorKind`]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::Formula(e) if e.is_data_shape() => ErrorKind::DataShapeError,
            ModelError::Formula(_) | ModelError::Syntax(_) | ModelError::InvalidConfig { .. } => {
                ErrorKind::SpecificationError
            }
            ModelError::Data(_) | ModelError::NoData | ModelError::PredictionError { .. } => {
                ErrorKind::DataShapeError
            }
            ModelError::NumericalError { .. }
            | ModelError::InsufficientData { .. }
            | ModelError::ZeroVariance { .. }
            | ModelError::NotConverged { .. }
            | ModelError::SingularMatrix { .. }
            | ModelError::BootstrapFailed { .. }
            | ModelError::NotFitted => ErrorKind::EstimationFailure,
        }
    }
}
