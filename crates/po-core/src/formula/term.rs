//! Terms on the right-hand side of a formula
//!
//! Each term evaluates to one or more named design-matrix columns:
//! numeric variables give one column, categorical variables give one
//! treatment dummy per non-reference level, interactions give the
//! element-wise products of their factors' columns.

use std::fmt;
use std::str::FromStr;

use crate::data::{DataFrame, FloatArray, Series};
use crate::formula::error::{FormulaError, FormulaResult};

/// A named design-matrix column
pub type Column = (String, FloatArray);

/// Transformations that may wrap a single variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Subtract the sample mean
    Center,
    /// Subtract the mean and divide by the sample SD
    Scale,
    Log,
    Sqrt,
    Exp,
}

impl Transform {
    pub fn name(self) -> &'static str {
        match self {
            Transform::Center => "center",
            Transform::Scale => "scale",
            Transform::Log => "log",
            Transform::Sqrt => "sqrt",
            Transform::Exp => "exp",
        }
    }

    fn apply(self, values: FloatArray) -> FormulaResult<FloatArray> {
        match self {
            Transform::Center => {
                let mean = values.mean().unwrap_or(0.0);
                Ok(values.mapv(|v| v - mean))
            }
            Transform::Scale => {
                let mean = values.mean().unwrap_or(0.0);
                let sd = if values.len() > 1 { values.std(1.0) } else { 0.0 };
                if !(sd > 0.0) {
                    return Err(FormulaError::NumericalError {
                        message: "cannot scale a constant column".to_string(),
                        operation: "scale".to_string(),
                    });
                }
                Ok(values.mapv(|v| (v - mean) / sd))
            }
            Transform::Log => {
                if values.iter().any(|&v| v <= 0.0) {
                    return Err(FormulaError::NumericalError {
                        message: "log() requires positive values".to_string(),
                        operation: "log".to_string(),
                    });
                }
                Ok(values.mapv(f64::ln))
            }
            Transform::Sqrt => {
                if values.iter().any(|&v| v < 0.0) {
                    return Err(FormulaError::NumericalError {
                        message: "sqrt() requires non-negative values".to_string(),
                        operation: "sqrt".to_string(),
                    });
                }
                Ok(values.mapv(f64::sqrt))
            }
            Transform::Exp => Ok(values.mapv(f64::exp)),
        }
    }
}

impl FromStr for Transform {
    type Err = FormulaError;

    fn from_str(s: &str) -> FormulaResult<Self> {
        match s {
            "center" => Ok(Transform::Center),
            "scale" => Ok(Transform::Scale),
            "log" => Ok(Transform::Log),
            "sqrt" => Ok(Transform::Sqrt),
            "exp" => Ok(Transform::Exp),
            other => Err(FormulaError::function(
                other,
                format!("Function '{}' not supported", other),
            )),
        }
    }
}

/// The different kinds of terms in a formula
#[derive(Debug, Clone, PartialEq)]
pub enum TermKind {
    /// A simple variable (e.g., x)
    Variable(String),
    /// An interaction between variables (e.g., x:w)
    Interaction(Interaction),
    /// A transformed variable (e.g., center(x))
    Function { transform: Transform, arg: String },
}

/// Coarse classification used by reporting code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermType {
    Main,
    Interaction,
    Transformed,
}

/// A term in a formula
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub kind: TermKind,
}

impl Term {
    /// Create a variable term
    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            kind: TermKind::Variable(name.into()),
        }
    }

    /// Create an interaction term
    pub fn interaction<S: Into<String>>(variables: impl IntoIterator<Item = S>) -> Self {
        Self {
            kind: TermKind::Interaction(Interaction::new(
                variables.into_iter().map(Into::into).collect(),
            )),
        }
    }

    /// Create a transformed-variable term
    pub fn function(transform: Transform, arg: impl Into<String>) -> Self {
        Self {
            kind: TermKind::Function {
                transform,
                arg: arg.into(),
            },
        }
    }

    pub fn term_type(&self) -> TermType {
        match &self.kind {
            TermKind::Variable(_) => TermType::Main,
            TermKind::Interaction(_) => TermType::Interaction,
            TermKind::Function { .. } => TermType::Transformed,
        }
    }

    /// Variables referenced by the term, in order of appearance
    pub fn variables(&self) -> Vec<&str> {
        match &self.kind {
            TermKind::Variable(name) => vec![name.as_str()],
            TermKind::Interaction(interaction) => {
                interaction.variables.iter().map(String::as_str).collect()
            }
            TermKind::Function { arg, .. } => vec![arg.as_str()],
        }
    }

    /// Order-insensitive identity, so `x:w` and `w:x` are the same term
    pub(crate) fn key(&self) -> String {
        match &self.kind {
            TermKind::Interaction(interaction) => {
                let mut vars = interaction.variables.clone();
                vars.sort();
                vars.join(":")
            }
            _ => self.to_string(),
        }
    }

    /// Evaluate the term against a DataFrame
    pub fn columns(&self, df: &DataFrame) -> FormulaResult<Vec<Column>> {
        match &self.kind {
            TermKind::Variable(name) => variable_columns(name, df),
            TermKind::Interaction(interaction) => interaction.columns(df),
            TermKind::Function { transform, arg } => {
                let values = numeric_variable(arg, df, transform.name())?;
                Ok(vec![(self.to_string(), transform.apply(values)?)])
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TermKind::Variable(name) => write!(f, "{}", name),
            TermKind::Interaction(interaction) => write!(f, "{}", interaction),
            TermKind::Function { transform, arg } => write!(f, "{}({})", transform.name(), arg),
        }
    }
}

/// Interaction between two or more variables
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    /// Variables involved in the interaction
    pub variables: Vec<String>,
}

impl Interaction {
    pub fn new(variables: Vec<String>) -> Self {
        Self { variables }
    }

    /// Order of interaction (2-way, 3-way, etc.)
    pub fn order(&self) -> usize {
        self.variables.len()
    }

    fn columns(&self, df: &DataFrame) -> FormulaResult<Vec<Column>> {
        if self.order() < 2 {
            return Err(FormulaError::invalid_structure(format!(
                "interaction '{}' needs at least two variables",
                self.variables.join(":")
            )));
        }

        let mut product: Vec<Column> = vec![(String::new(), FloatArray::ones(df.nrows()))];
        for var in &self.variables {
            let factor = variable_columns(var, df)?;
            product = product
                .iter()
                .flat_map(|(lhs_name, lhs)| {
                    factor.iter().map(move |(rhs_name, rhs)| {
                        let name = if lhs_name.is_empty() {
                            rhs_name.clone()
                        } else {
                            format!("{}:{}", lhs_name, rhs_name)
                        };
                        (name, lhs * rhs)
                    })
                })
                .collect();
        }

        Ok(product)
    }
}

impl fmt::Display for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variables.join(":"))
    }
}

fn variable_columns(name: &str, df: &DataFrame) -> FormulaResult<Vec<Column>> {
    let series = df
        .get_column(name)
        .ok_or_else(|| FormulaError::variable_not_found(name, &df.column_names()))?;

    match series {
        Series::Categorical(codes, levels) => Ok(levels
            .iter()
            .enumerate()
            .skip(1)
            .map(|(code, level)| {
                let dummy = codes.mapv(|c| if c as usize == code { 1.0 } else { 0.0 });
                (format!("{}[{}]", name, level), dummy)
            })
            .collect()),
        numeric => Ok(vec![(name.to_string(), numeric.to_float_array()?)]),
    }
}

fn numeric_variable(name: &str, df: &DataFrame, function: &str) -> FormulaResult<FloatArray> {
    let series = df
        .get_column(name)
        .ok_or_else(|| FormulaError::variable_not_found(name, &df.column_names()))?;

    if !series.is_numeric() {
        return Err(FormulaError::function(
            function,
            format!("'{}' is {}, expected a numeric column", name, series.column_type().name()),
        ));
    }

    Ok(series.to_float_array()?)
}
