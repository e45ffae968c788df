//! R-style model formulas
//!
//! `y ~ x + w + x:w`, `y ~ x*w`, `~ 0 + x`, `y ~ log(x) + scale(w)` and
//! categorical predictors (treatment dummies against the first sorted level)
//! are supported. Evaluating a formula against a [`DataFrame`] yields a
//! [`Design`].

use std::fmt;
use std::str::FromStr;

use ndarray::Axis;

use crate::data::{DataFrame, FloatArray, Matrix};

pub mod error;
mod parser;
mod term;

#[cfg(test)]
mod tests;

pub use error::{FormulaError, FormulaResult};
pub use parser::FormulaParser;
pub use term::{Column, Interaction, Term, TermKind, TermType, Transform};

pub type Result<T> = std::result::Result<T, FormulaError>;

/// Label of the constant column
pub const INTERCEPT: &str = "(Intercept)";

#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub response: Option<String>,
    /// Right-hand side after `*` expansion, duplicates removed
    pub terms: Vec<Term>,
    pub has_intercept: bool,
    /// Text as written, or the canonical form after an edit
    pub original: String,
}

/// Design matrix, response and column labels of an evaluated formula
#[derive(Debug, Clone)]
pub struct Design {
    pub x: Matrix,
    pub y: Option<FloatArray>,
    pub names: Vec<String>,
}

impl Design {
    pub fn response(&self) -> Result<&FloatArray> {
        self.y.as_ref().ok_or(FormulaError::MissingResponse)
    }
}

impl Formula {
    pub fn parse(formula: &str) -> Result<Self> {
        FormulaParser::parse(formula)
    }

    pub fn without_intercept(mut self) -> Self {
        self.has_intercept = false;
        self.original = self.to_string();
        self
    }

    /// Copy of the formula with one term dropped, matched by its printed form
    pub fn without_term(&self, term: &str) -> Result<Self> {
        let target = Formula::parse(&format!("~ {}", term))?;
        let keys: Vec<String> = target.terms.iter().map(Term::key).collect();

        let mut reduced = self.clone();
        reduced.terms.retain(|t| !keys.contains(&t.key()));
        if reduced.terms.len() == self.terms.len() {
            return Err(FormulaError::invalid_structure(format!(
                "term '{}' is not part of '{}'",
                term, self
            )));
        }
        reduced.original = reduced.to_string();
        Ok(reduced)
    }

    /// All variable names mentioned in the formula, response first
    pub fn variables(&self) -> Vec<&str> {
        let mut vars: Vec<&str> = Vec::new();

        if let Some(resp) = &self.response {
            vars.push(resp.as_str());
        }

        for name in self.terms.iter().flat_map(Term::variables) {
            if !vars.contains(&name) {
                vars.push(name);
            }
        }

        vars
    }

    /// Build the design; the response must be a numeric column
    pub fn design(&self, df: &DataFrame) -> Result<Design> {
        let y = match &self.response {
            Some(resp) => {
                let series = df
                    .get_column(resp)
                    .ok_or_else(|| FormulaError::variable_not_found(resp, &df.column_names()))?;
                if !series.is_numeric() {
                    return Err(FormulaError::TypeMismatch {
                        variable: resp.clone(),
                        expected: "numeric",
                        actual: series.column_type().name().to_string(),
                    });
                }
                Some(series.to_float_array()?)
            }
            None => None,
        };

        let columns = self.columns(df)?;
        let nrows = df.nrows();
        let mut x = Matrix::zeros((nrows, columns.len()));
        for (mut target, (_, values)) in x.axis_iter_mut(Axis(1)).zip(&columns) {
            target.assign(values);
        }

        Ok(Design {
            x,
            y,
            names: columns.into_iter().map(|(name, _)| name).collect(),
        })
    }

    fn columns(&self, df: &DataFrame) -> Result<Vec<Column>> {
        let mut columns = Vec::new();

        if self.has_intercept {
            columns.push((INTERCEPT.to_string(), FloatArray::ones(df.nrows())));
        }

        for term in &self.terms {
            columns.extend(term.columns(df)?);
        }

        Ok(columns)
    }
}

impl FromStr for Formula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self> {
        Formula::parse(s)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.response {
            Some(response) => write!(f, "{} ~ ", response)?,
            None => f.write_str("~ ")?,
        }

        let mut rhs: Vec<String> = Vec::with_capacity(self.terms.len() + 1);
        if !self.has_intercept {
            rhs.push("0".to_string());
        } else if self.terms.is_empty() {
            rhs.push("1".to_string());
        }
        rhs.extend(self.terms.iter().map(Term::to_string));

        f.write_str(&rhs.join(" + "))
    }
}
