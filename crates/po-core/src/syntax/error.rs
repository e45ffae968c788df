//! Path-model syntax errors

use thiserror::Error;

/// Errors raised while parsing or validating a path-model description
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyntaxError {
    #[error("Model description is empty")]
    Empty,

    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Line {line}: operator '{operator}' is not supported")]
    UnsupportedOperator { line: usize, operator: &'static str },

    #[error("'{name}' references undefined coefficient '{reference}'")]
    UndefinedReference { name: String, reference: String },

    #[error("Parameter name '{0}' is used more than once")]
    DuplicateParameter(String),

    #[error("Path {outcome} ~ {predictor} is declared more than once")]
    DuplicatePath { outcome: String, predictor: String },

    #[error("Regressions form a cycle through {0:?}")]
    Cycle(Vec<String>),

    #[error("No value available for '{0}'")]
    MissingValue(String),
}

impl SyntaxError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        SyntaxError::Parse {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyntaxError>;
