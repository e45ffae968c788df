//! Seeded data simulation
//!
//! Analyses that do not read a file generate their dataset here. Columns are
//! drawn in the order they are requested from a single seeded generator, so a
//! given seed and call sequence always reproduces the same frame.

use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, StandardNormal};
use rand_xoshiro::Xoshiro256PlusPlus;

use super::*;

/// Seeded column generator that accumulates a DataFrame
pub struct Simulator {
    rng: Xoshiro256PlusPlus,
    n: usize,
    frame: DataFrame,
}

impl Simulator {
    /// Create a simulator for `n` cases
    pub fn new(n: usize, seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            n,
            frame: DataFrame::new(),
        }
    }

    /// Number of cases generated per column
    pub fn n(&self) -> usize {
        self.n
    }

    /// Add a N(mean, sd²) column
    pub fn normal(mut self, name: &str, mean: f64, sd: f64) -> Result<Self> {
        let dist = Normal::new(mean, sd)
            .map_err(|e| DataError::InvalidParameter(format!("normal({mean}, {sd}): {e}")))?;
        let values: Vec<f64> = (0..self.n).map(|_| dist.sample(&mut self.rng)).collect();
        self.push(name, Series::float(values))
    }

    /// Add a U(low, high) column
    pub fn uniform(mut self, name: &str, low: f64, high: f64) -> Result<Self> {
        if !(low < high) {
            return Err(DataError::InvalidParameter(format!(
                "uniform bounds must satisfy low < high, got [{low}, {high})"
            )));
        }
        let values: Vec<f64> = (0..self.n).map(|_| self.rng.random_range(low..high)).collect();
        self.push(name, Series::float(values))
    }

    /// Add a categorical column with uniformly drawn levels
    pub fn categorical(mut self, name: &str, levels: &[&str]) -> Result<Self> {
        if levels.is_empty() {
            return Err(DataError::InvalidParameter(format!(
                "categorical column '{name}' needs at least one level"
            )));
        }
        let values: Vec<&str> = (0..self.n)
            .map(|_| levels[self.rng.random_range(0..levels.len())])
            .collect();
        self.push(name, Series::categorical(&values))
    }

    /// Add `intercept + Σ coef·column + N(0, noise_sd²)` over existing columns
    pub fn linear(
        mut self,
        name: &str,
        intercept: f64,
        terms: &[(&str, f64)],
        noise_sd: f64,
    ) -> Result<Self> {
        let mut values = FloatArray::from_elem(self.n, intercept);
        for (column, coef) in terms {
            values = values + self.frame.float_column(column)? * *coef;
        }
        self.add_noise(name, values, noise_sd)
    }

    /// Like [`Simulator::linear`] with an extra product term `coef·a·b`
    pub fn linear_with_interaction(
        mut self,
        name: &str,
        intercept: f64,
        terms: &[(&str, f64)],
        interaction: (&str, &str, f64),
        noise_sd: f64,
    ) -> Result<Self> {
        let (a, b, coef) = interaction;
        let product = self.frame.float_column(a)? * self.frame.float_column(b)?;
        let mut values = FloatArray::from_elem(self.n, intercept) + product * coef;
        for (column, coef) in terms {
            values = values + self.frame.float_column(column)? * *coef;
        }
        self.add_noise(name, values, noise_sd)
    }

    /// Finish and return the generated frame
    pub fn build(self) -> DataFrame {
        self.frame
    }

    fn add_noise(mut self, name: &str, mut values: FloatArray, noise_sd: f64) -> Result<Self> {
        if noise_sd < 0.0 {
            return Err(DataError::InvalidParameter(format!(
                "noise standard deviation must be non-negative, got {noise_sd}"
            )));
        }
        for v in values.iter_mut() {
            let z: f64 = StandardNormal.sample(&mut self.rng);
            *v += noise_sd * z;
        }
        self.push(name, Series::Float(values))
    }

    fn push(mut self, name: &str, series: Series) -> Result<Self> {
        self.frame = self.frame.with_column(name, series)?;
        Ok(self)
    }
}
