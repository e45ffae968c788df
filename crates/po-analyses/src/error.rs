//! Analysis-level error types

use thiserror::Error;

use po_core::data::DataError;
use po_models::{ErrorKind, ModelError};

/// Errors raised while running an analysis
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A fit failed or was misspecified
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Loading or simulating the dataset failed
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// The TOML configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings that parse but cannot be run
    #[error("Invalid analysis settings: {0}")]
    InvalidSettings(String),
}

impl AnalysisError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        AnalysisError::InvalidSettings(message.into())
    }

    /// Map the error onto [`ErrorKind`]
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Model(e) => e.kind(),
            AnalysisError::Data(_) | AnalysisError::Io(_) => ErrorKind::DataShapeError,
            AnalysisError::Config(_) | AnalysisError::InvalidSettings(_) => {
                ErrorKind::SpecificationError
            }
        }
    }
}

/// Result type for analyses
pub type Result<T> = std::result::Result<T, AnalysisError>;
