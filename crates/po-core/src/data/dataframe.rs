//! The tabular dataset
//!
//! Columns keep their insertion order, which is the order reported in
//! descriptives and correlation tables. Row position is the case number used
//! by regression diagnostics (1-based in reports).

use std::fmt;

use indexmap::IndexMap;
use ndarray::{ArrayView1, Axis};

use super::*;

/// Named, equal-length columns
#[derive(Clone, Debug, Default)]
pub struct DataFrame {
    pub(crate) columns: IndexMap<String, Series>,
    pub(crate) nrows: usize,
}

impl DataFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.columns.len())
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    pub fn get_column(&self, name: &str) -> Option<&Series> {
        self.columns.get(name)
    }

    /// Like [`get_column`](Self::get_column) but missing names are an error
    pub fn column(&self, name: &str) -> Result<&Series> {
        self.get_column(name)
            .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))
    }

    pub fn float_column(&self, name: &str) -> Result<FloatArray> {
        self.column(name)?.to_float_array()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Reports the first of `names` the frame lacks
    pub fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        match names.iter().find(|name| !self.has_column(name.as_ref())) {
            Some(missing) => Err(DataError::ColumnNotFound(missing.as_ref().to_string())),
            None => Ok(()),
        }
    }

    /// A new frame holding copies of `names`, in the order given
    pub fn select<I, S>(&self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .try_fold(DataFrameBuilder::new(), |builder, name| {
                let name = name.as_ref();
                builder.with_column(name, self.column(name)?.clone())
            })?
            .build()
    }

    fn check_length(&self, name: &str, series: &Series) -> Result<()> {
        if !self.columns.is_empty() && series.len() != self.nrows {
            return Err(DataError::DimensionMismatch {
                expected: format!("{} rows", self.nrows),
                actual: format!("{} rows in column '{}'", series.len(), name),
            });
        }
        Ok(())
    }

    /// Append a column, consuming the frame
    pub fn with_column<S: Into<String>>(mut self, name: S, series: Series) -> Result<Self> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(DataError::DuplicateColumn(name));
        }
        self.set_column(name, series)?;
        Ok(self)
    }

    /// Overwrite `name` in place, or append it when absent
    pub fn set_column<S: Into<String>>(&mut self, name: S, series: Series) -> Result<&mut Self> {
        let name = name.into();
        self.check_length(&name, &series)?;
        if self.columns.is_empty() {
            self.nrows = series.len();
        }
        self.columns.insert(name, series);
        Ok(self)
    }

    /// Subtract each named column's mean; the columns become float
    pub fn center_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Result<&mut Self> {
        for name in names {
            let name = name.as_ref();
            let values = self.float_column(name)?;
            let mean = values.mean().unwrap_or(0.0);
            self.set_column(name, Series::Float(values - mean))?;
        }
        Ok(self)
    }

    /// n × k matrix of every non-categorical column, in frame order
    pub fn numeric_matrix(&self) -> Result<Matrix> {
        let numeric: Vec<FloatArray> = self
            .columns
            .values()
            .filter(|series| series.is_numeric())
            .map(Series::to_float_array)
            .collect::<Result<_>>()?;

        if numeric.is_empty() {
            return Ok(Matrix::zeros((self.nrows, 0)));
        }

        let views: Vec<ArrayView1<f64>> = numeric.iter().map(FloatArray::view).collect();
        ndarray::stack(Axis(1), &views).map_err(|e| DataError::DimensionMismatch {
            expected: "columns of equal length".to_string(),
            actual: e.to_string(),
        })
    }

    /// Per-column summaries keyed by name
    pub fn describe(&self) -> Result<IndexMap<String, SeriesStats>> {
        self.columns
            .iter()
            .map(|(name, series)| Ok((name.clone(), series.describe()?)))
            .collect()
    }

    /// Covariance of the numeric columns with an `n - ddof` denominator
    pub fn cov(&self, ddof: usize) -> Result<Matrix> {
        let data = self.numeric_matrix()?;
        let n = data.nrows();
        if n <= ddof {
            return Err(DataError::InvalidParameter(format!(
                "covariance needs more than {} rows, got {}",
                ddof, n
            )));
        }

        let means = data
            .mean_axis(Axis(0))
            .ok_or_else(|| DataError::InvalidParameter("no rows".to_string()))?;
        let deviations = data - &means;
        Ok(deviations.t().dot(&deviations) / (n - ddof) as f64)
    }

    /// Pearson correlations of the numeric columns. Pairs involving a
    /// constant column are NaN.
    pub fn corr(&self) -> Result<Matrix> {
        let cov = self.cov(1)?;
        let sd = cov.diag().mapv(f64::sqrt);
        Ok(Matrix::from_shape_fn(cov.dim(), |(i, j)| {
            if sd[i] > 0.0 && sd[j] > 0.0 {
                cov[[i, j]] / (sd[i] * sd[j])
            } else {
                f64::NAN
            }
        }))
    }
}

impl fmt::Display for DataFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataFrame({} rows × {} cols)", self.nrows, self.ncols())
    }
}
