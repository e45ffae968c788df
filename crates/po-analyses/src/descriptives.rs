//! Column summaries shared by every report

use indexmap::IndexMap;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use po_core::data::{DataFrame, SeriesStats};

/// Per-variable statistics and pairwise Pearson correlations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Descriptives {
    pub variables: IndexMap<String, SeriesStats>,
    /// Correlations in the order of `variables`
    pub correlations: Array2<f64>,
}

impl Descriptives {
    /// Summarize the named numeric columns of a frame
    pub fn compute<S: AsRef<str>>(df: &DataFrame, columns: &[S]) -> Result<Self> {
        let selected = df.select(columns)?;
        Ok(Self {
            variables: selected.describe()?,
            correlations: selected.corr()?,
        })
    }

    pub fn mean(&self, variable: &str) -> Option<f64> {
        self.variables.get(variable).map(|s| s.mean)
    }

    pub fn sd(&self, variable: &str) -> Option<f64> {
        self.variables.get(variable).map(|s| s.std)
    }

    /// Correlation between two summarized variables
    pub fn correlation(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.variables.get_index_of(a)?;
        let j = self.variables.get_index_of(b)?;
        Some(self.correlations[[i, j]])
    }
}
