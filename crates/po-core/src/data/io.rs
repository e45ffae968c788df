//! Fixed-schema CSV loading
//!
//! Every analysis reads a flat table whose columns and types are known up
//! front. The schema names the columns to keep; extra columns in the file are
//! ignored, missing ones are an error.

use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::*;

/// Column type information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Float,
    Int,
    Bool,
    Categorical,
}

impl ColumnType {
    /// Human-readable type name used in error messages
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Float => "float",
            ColumnType::Int => "integer",
            ColumnType::Bool => "boolean",
            ColumnType::Categorical => "categorical",
        }
    }
}

/// Ordered column name → type mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    columns: IndexMap<String, ColumnType>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column to the schema
    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.insert(name.into(), column_type);
        self
    }

    /// Shorthand for a schema of float columns
    pub fn floats<S: AsRef<str>>(names: &[S]) -> Self {
        names
            .iter()
            .fold(Self::new(), |schema, name| schema.column(name.as_ref(), ColumnType::Float))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.columns.iter().map(|(name, ty)| (name.as_str(), *ty))
    }
}

impl DataFrame {
    /// Read a CSV file with a header row
    pub fn from_csv_path(path: impl AsRef<Path>, schema: &Schema) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), columns = schema.len(), "reading csv");
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file, schema)
    }

    /// Read CSV data with a header row from any reader
    pub fn from_csv_reader<R: Read>(reader: R, schema: &Schema) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let positions: Vec<(String, usize, ColumnType)> = schema
            .iter()
            .map(|(name, ty)| {
                headers
                    .iter()
                    .position(|h| h == name)
                    .map(|pos| (name.to_string(), pos, ty))
                    .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))
            })
            .collect::<Result<_>>()?;

        let mut raw: Vec<Vec<String>> = vec![Vec::new(); positions.len()];
        for record in csv_reader.records() {
            let record = record?;
            for (slot, (_, pos, _)) in raw.iter_mut().zip(&positions) {
                slot.push(record.get(*pos).unwrap_or_default().to_string());
            }
        }

        let mut builder = DataFrameBuilder::new();
        for ((name, _, ty), values) in positions.into_iter().zip(raw) {
            let series = parse_column(&name, ty, &values)?;
            builder = builder.with_column(name, series)?;
        }

        let df = builder.build()?;
        tracing::debug!(rows = df.nrows(), cols = df.ncols(), "csv loaded");
        Ok(df)
    }
}

fn parse_column(name: &str, ty: ColumnType, values: &[String]) -> Result<Series> {
    let parse_err = |record: usize, value: &str| DataError::Parse {
        column: name.to_string(),
        record: record + 1,
        value: value.to_string(),
        expected: ty.name(),
    };

    match ty {
        ColumnType::Float => values
            .iter()
            .enumerate()
            .map(|(i, v)| v.parse::<f64>().map_err(|_| parse_err(i, v)))
            .collect::<Result<Vec<_>>>()
            .map(|v| Series::float(v)),
        ColumnType::Int => values
            .iter()
            .enumerate()
            .map(|(i, v)| v.parse::<i64>().map_err(|_| parse_err(i, v)))
            .collect::<Result<Vec<_>>>()
            .map(|v| Series::int(v)),
        ColumnType::Bool => values
            .iter()
            .enumerate()
            .map(|(i, v)| match v.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(parse_err(i, v)),
            })
            .collect::<Result<Vec<_>>>()
            .map(|v| Series::bool(v)),
        ColumnType::Categorical => Ok(Series::categorical(values)),
    }
}
