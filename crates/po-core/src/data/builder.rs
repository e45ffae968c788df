//! Column-by-column frame construction

use indexmap::IndexMap;

use super::*;

/// Accumulates named columns, checking names and lengths as they arrive
#[derive(Debug, Default)]
pub struct DataFrameBuilder {
    columns: IndexMap<String, Series>,
    nrows: Option<usize>,
}

impl DataFrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column; the first column fixes the row count
    pub fn with_column<S: Into<String>>(mut self, name: S, series: Series) -> Result<Self> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(DataError::DuplicateColumn(name));
        }

        let expected = *self.nrows.get_or_insert(series.len());
        if series.len() != expected {
            return Err(DataError::DimensionMismatch {
                expected: format!("{} rows", expected),
                actual: format!("{} rows in column '{}'", series.len(), name),
            });
        }

        self.columns.insert(name, series);
        Ok(self)
    }

    /// Shorthand for a float column
    pub fn with_floats<S: Into<String>>(self, name: S, values: Vec<f64>) -> Result<Self> {
        self.with_column(name, Series::float(values))
    }

    pub fn build(self) -> Result<DataFrame> {
        Ok(DataFrame {
            columns: self.columns,
            nrows: self.nrows.unwrap_or(0),
        })
    }
}
