//! Typed columns
//!
//! Analyses only ever compute on floats; the other variants exist so a CSV
//! can carry integer codes, flags and group labels that are converted (or
//! dummy-coded by the formula layer) on the way into a design matrix.

use std::collections::{BTreeSet, HashMap};

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::*;

/// One column of a [`DataFrame`]
#[derive(Clone, Debug, PartialEq)]
pub enum Series {
    Float(FloatArray),
    Int(IntArray),
    Bool(BoolArray),
    /// Level codes into the sorted level list
    Categorical(Array1<u32>, Vec<String>),
}

impl Series {
    pub fn float(values: impl Into<FloatArray>) -> Self {
        Series::Float(values.into())
    }

    pub fn int(values: impl Into<IntArray>) -> Self {
        Series::Int(values.into())
    }

    pub fn bool(values: impl Into<BoolArray>) -> Self {
        Series::Bool(values.into())
    }

    /// Encode labels against their sorted distinct values, so the first level
    /// in lexical order becomes the reference category regardless of row
    /// order.
    pub fn categorical<T: AsRef<str>>(labels: &[T]) -> Self {
        let levels: Vec<String> = labels
            .iter()
            .map(|label| label.as_ref())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        let code_of: HashMap<&str, u32> = levels
            .iter()
            .zip(0u32..)
            .map(|(level, code)| (level.as_str(), code))
            .collect();

        let codes = labels.iter().map(|label| code_of[label.as_ref()]).collect();
        Series::Categorical(codes, levels)
    }

    pub fn len(&self) -> usize {
        match self {
            Series::Float(values) => values.len(),
            Series::Int(values) => values.len(),
            Series::Bool(values) => values.len(),
            Series::Categorical(codes, _) => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Series::Float(_) => ColumnType::Float,
            Series::Int(_) => ColumnType::Int,
            Series::Bool(_) => ColumnType::Bool,
            Series::Categorical(..) => ColumnType::Categorical,
        }
    }

    /// Everything except categorical columns can be read as floats
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Series::Categorical(..))
    }

    /// Sorted level labels of a categorical column
    pub fn levels(&self) -> Option<&[String]> {
        match self {
            Series::Categorical(_, levels) => Some(levels),
            _ => None,
        }
    }

    /// Values as `f64`; `true` reads as 1
    pub fn to_float_array(&self) -> Result<FloatArray> {
        match self {
            Series::Float(values) => Ok(values.clone()),
            Series::Int(values) => Ok(values.mapv(|v| v as f64)),
            Series::Bool(values) => Ok(values.mapv(|v| f64::from(u8::from(v)))),
            Series::Categorical(..) => Err(DataError::NonNumericData("categorical")),
        }
    }

    /// Count, moments and quartiles; categorical columns only report the
    /// number of levels
    pub fn describe(&self) -> Result<SeriesStats> {
        if let Series::Categorical(codes, levels) = self {
            return Ok(SeriesStats {
                count: codes.len(),
                unique_count: Some(levels.len()),
                ..SeriesStats::empty()
            });
        }

        let values = self.to_float_array()?;
        let n = values.len();
        if n == 0 {
            return Ok(SeriesStats::empty());
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        Ok(SeriesStats {
            count: n,
            mean: values.sum() / n as f64,
            std: if n > 1 { values.std(1.0) } else { f64::NAN },
            min: sorted[0],
            q25: quantile_sorted(&sorted, 0.25),
            q50: quantile_sorted(&sorted, 0.5),
            q75: quantile_sorted(&sorted, 0.75),
            max: sorted[n - 1],
            unique_count: None,
        })
    }
}

/// Quantile of ascending data, interpolating between order statistics
/// (Hyndman & Fan type 7). NaN for empty input.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let Some(last) = sorted.len().checked_sub(1) else {
        return f64::NAN;
    };

    let h = last as f64 * q.clamp(0.0, 1.0);
    let below = h.floor() as usize;
    let above = (below + 1).min(last);
    let fraction = h - below as f64;

    sorted[below] + fraction * (sorted[above] - sorted[below])
}

/// Column summary reported alongside every analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
    pub unique_count: Option<usize>,
}

impl SeriesStats {
    pub(crate) fn empty() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            q25: f64::NAN,
            q50: f64::NAN,
            q75: f64::NAN,
            max: f64::NAN,
            unique_count: None,
        }
    }
}
