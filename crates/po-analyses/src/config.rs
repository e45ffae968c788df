//! Analysis configuration loaded from TOML
//!
//! ```toml
//! [mediation]
//! design = "serial"
//! mediators = ["m1", "m2"]
//!
//! [mediation.data]
//! source = "simulated"
//! n = 400
//! seed = 11
//!
//! [regression.data]
//! source = "csv"
//! path = "data/survey.csv"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::mediation::MediationConfig;
use crate::moderation::ModerationConfig;
use crate::regression::RegressionConfig;
use po_core::data::{DataFrame, Schema};

/// Where an analysis gets its dataset from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DataSource<S> {
    /// Generated by the analysis' own simulation settings
    Simulated(S),
    /// Read from a CSV file with a header row; every analysis variable is
    /// parsed as a float column
    Csv { path: PathBuf },
}

impl<S: Default> Default for DataSource<S> {
    fn default() -> Self {
        DataSource::Simulated(S::default())
    }
}

impl<S> DataSource<S> {
    /// Produce the dataset, simulating with `simulate` or reading the named
    /// columns from file
    pub fn load<C, F>(&self, columns: &[C], simulate: F) -> Result<DataFrame>
    where
        C: AsRef<str>,
        F: FnOnce(&S) -> po_core::data::Result<DataFrame>,
    {
        let df = match self {
            DataSource::Simulated(settings) => simulate(settings)?,
            DataSource::Csv { path } => DataFrame::from_csv_path(path, &Schema::floats(columns))?,
        };
        df.require_columns(columns)?;
        tracing::debug!(rows = df.nrows(), cols = df.ncols(), "dataset ready");
        Ok(df)
    }
}

/// Settings for all three analyses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub mediation: MediationConfig,
    pub regression: RegressionConfig,
    pub moderation: ModerationConfig,
}

impl AnalysisConfig {
    /// Parse a TOML document; absent sections and keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading analysis configuration");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
