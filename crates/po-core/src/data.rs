//! Core data structures for PathOxide
//!
//! This module provides the tabular dataset every analysis starts from:
//! named, equal-length columns plus the loaders that produce them (CSV files
//! with a fixed schema, or seeded simulation).

mod builder;
mod dataframe;
pub mod io;
mod series;
pub mod simulate;


pub use builder::DataFrameBuilder;
pub use dataframe::DataFrame;
pub use io::{ColumnType, Schema};
pub use series::{Series, SeriesStats, quantile_sorted};
pub use simulate::Simulator;

pub type FloatArray = ndarray::Array1<f64>;
pub type IntArray = ndarray::Array1<i64>;
pub type BoolArray = ndarray::Array1<bool>;
pub type Matrix = ndarray::Array2<f64>;

/// Failures while building, loading or summarizing a frame
#[derive(thiserror::Error, Debug)]
pub enum DataError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Operation requires numeric data, got {0}")]
    NonNumericData(&'static str),

    #[error("Cannot parse '{value}' in column '{column}' (record {record}) as {expected}")]
    Parse {
        column: String,
        record: usize,
        value: String,
        expected: &'static str,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, DataError>;
