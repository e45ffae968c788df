//! Formula errors

use crate::data::DataError;
use thiserror::Error;

/// Failures while parsing a formula or evaluating it against a frame
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Malformed formula text; `position` is a character offset
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Variable '{variable}' not found; the frame has {available:?}")]
    VariableNotFound {
        variable: String,
        available: Vec<String>,
    },

    /// A column cannot enter a design matrix as requested
    #[error("Variable '{variable}' is {actual}, expected {expected}")]
    TypeMismatch {
        variable: String,
        expected: &'static str,
        actual: String,
    },

    /// `log()`, `scale()` and friends, bad name or bad argument
    #[error("Function '{function}': {message}")]
    FunctionError { function: String, message: String },

    #[error("Invalid formula: {message}")]
    InvalidStructure { message: String },

    /// A design response was requested from a one-sided formula
    #[error("Formula has no response variable")]
    MissingResponse,

    #[error("Data error while building design: {0}")]
    Data(#[from] DataError),

    /// A transformation produced non-finite values
    #[error("Cannot apply {operation}: {message}")]
    NumericalError { message: String, operation: String },
}

pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

impl FormulaError {
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        FormulaError::Syntax {
            position,
            message: message.into(),
        }
    }

    /// Syntax error that also shows the offending text
    pub fn syntax_near(position: usize, message: &str, found: &str) -> Self {
        FormulaError::Syntax {
            position,
            message: format!("{} (found '{}')", message, found),
        }
    }

    pub fn variable_not_found(variable: &str, available: &[&str]) -> Self {
        FormulaError::VariableNotFound {
            variable: variable.to_string(),
            available: available.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn function(function: &str, message: impl Into<String>) -> Self {
        FormulaError::FunctionError {
            function: function.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_structure(message: impl Into<String>) -> Self {
        FormulaError::InvalidStructure {
            message: message.into(),
        }
    }

    /// Whether the error reflects the table (missing or mistyped column,
    /// unequal lengths) rather than the formula text
    pub fn is_data_shape(&self) -> bool {
        matches!(
            self,
            FormulaError::VariableNotFound { .. }
                | FormulaError::TypeMismatch { .. }
                | FormulaError::Data(_)
        )
    }
}
