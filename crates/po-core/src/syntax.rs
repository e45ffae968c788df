//! Path-model specifications
//!
//! A model is a set of linear regressions among observed variables, each
//! path optionally carrying a label, plus derived quantities defined as
//! arithmetic over labels:
//!
//! ```text
//! m ~ a*x
//! y ~ cp*x + b*m
//! ab := a*b
//! total := cp + ab
//! ```
//!
//! Unlabelled paths are named `outcome~predictor`. Validation guarantees
//! that every name used by a derived quantity exists, that parameter names
//! are unique and that the regressions form a directed acyclic graph.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

mod error;
mod expr;
mod parser;


pub use error::{Result, SyntaxError};
pub use expr::{BinOp, Expr};

/// One predictor on the right-hand side of a regression
#[derive(Debug, Clone, PartialEq)]
pub struct PathTerm {
    pub label: Option<String>,
    pub predictor: String,
}

/// `outcome ~ term + term + ...`
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub outcome: String,
    pub terms: Vec<PathTerm>,
}

impl Relation {
    pub fn predictors(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|t| t.predictor.as_str())
    }
}

/// `name := expression`
#[derive(Debug, Clone, PartialEq)]
pub struct DefinedQuantity {
    pub name: String,
    pub expr: Expr,
}

/// A single regression coefficient of the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParameter {
    /// Label, or `outcome~predictor` when unlabelled
    pub name: String,
    pub outcome: String,
    pub predictor: String,
    pub labelled: bool,
}

/// A validated path model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    relations: Vec<Relation>,
    defined: Vec<DefinedQuantity>,
    parameters: Vec<PathParameter>,
    source: String,
}

impl ModelSpec {
    /// Parse and validate a model description
    pub fn parse(source: &str) -> Result<Self> {
        let mut relations: Vec<Relation> = Vec::new();
        let mut defined = Vec::new();

        for stmt in parser::statements(source)? {
            match stmt {
                parser::Statement::Relation(rel) => {
                    // `y ~ a` and `y ~ b` on separate lines extend one equation
                    match relations.iter_mut().find(|r| r.outcome == rel.outcome) {
                        Some(existing) => existing.terms.extend(rel.terms),
                        None => relations.push(rel),
                    }
                }
                parser::Statement::Defined(def) => defined.push(def),
            }
        }

        if relations.is_empty() {
            return Err(SyntaxError::Empty);
        }

        let parameters = collect_parameters(&relations)?;
        validate_defined(&parameters, &defined)?;
        check_acyclic(&relations)?;

        tracing::debug!(
            equations = relations.len(),
            parameters = parameters.len(),
            defined = defined.len(),
            "parsed path model"
        );

        Ok(Self {
            relations,
            defined,
            parameters,
            source: source.to_string(),
        })
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn defined(&self) -> &[DefinedQuantity] {
        &self.defined
    }

    /// Every path coefficient, in declaration order
    pub fn parameters(&self) -> &[PathParameter] {
        &self.parameters
    }

    pub fn parameter(&self, outcome: &str, predictor: &str) -> Option<&PathParameter> {
        self.parameters
            .iter()
            .find(|p| p.outcome == outcome && p.predictor == predictor)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Outcome variables of the regressions, in declaration order
    pub fn endogenous(&self) -> Vec<&str> {
        self.relations.iter().map(|r| r.outcome.as_str()).collect()
    }

    /// Variables that only ever appear as predictors
    pub fn exogenous(&self) -> Vec<&str> {
        let outcomes: HashSet<&str> = self.endogenous().into_iter().collect();
        let mut out: Vec<&str> = Vec::new();
        for rel in &self.relations {
            for p in rel.predictors() {
                if !outcomes.contains(p) && !out.contains(&p) {
                    out.push(p);
                }
            }
        }
        out
    }

    /// All observed variables, exogenous first then endogenous
    pub fn observed(&self) -> Vec<&str> {
        let mut vars = self.exogenous();
        vars.extend(self.endogenous());
        vars
    }

    /// Evaluate every derived quantity from path estimates keyed by
    /// parameter name. Later definitions may use earlier ones.
    pub fn evaluate_defined(
        &self,
        estimates: &IndexMap<String, f64>,
    ) -> Result<IndexMap<String, f64>> {
        let mut values: IndexMap<String, f64> = IndexMap::with_capacity(self.defined.len());

        for def in &self.defined {
            let value = def.expr.eval(&|name: &str| {
                estimates.get(name).or_else(|| values.get(name)).copied()
            })?;
            values.insert(def.name.clone(), value);
        }

        Ok(values)
    }
}

impl FromStr for ModelSpec {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self> {
        ModelSpec::parse(s)
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rel in &self.relations {
            let terms: Vec<String> = rel
                .terms
                .iter()
                .map(|t| match &t.label {
                    Some(label) => format!("{}*{}", label, t.predictor),
                    None => t.predictor.clone(),
                })
                .collect();
            writeln!(f, "{} ~ {}", rel.outcome, terms.join(" + "))?;
        }
        for def in &self.defined {
            writeln!(f, "{} := {}", def.name, def.expr)?;
        }
        Ok(())
    }
}

fn collect_parameters(relations: &[Relation]) -> Result<Vec<PathParameter>> {
    let mut parameters: Vec<PathParameter> = Vec::new();

    for rel in relations {
        for term in &rel.terms {
            if term.predictor == rel.outcome {
                return Err(SyntaxError::Cycle(vec![rel.outcome.clone()]));
            }
            if parameters
                .iter()
                .any(|p| p.outcome == rel.outcome && p.predictor == term.predictor)
            {
                return Err(SyntaxError::DuplicatePath {
                    outcome: rel.outcome.clone(),
                    predictor: term.predictor.clone(),
                });
            }

            let name = term
                .label
                .clone()
                .unwrap_or_else(|| format!("{}~{}", rel.outcome, term.predictor));
            if parameters.iter().any(|p| p.name == name) {
                return Err(SyntaxError::DuplicateParameter(name));
            }

            parameters.push(PathParameter {
                name,
                outcome: rel.outcome.clone(),
                predictor: term.predictor.clone(),
                labelled: term.label.is_some(),
            });
        }
    }

    Ok(parameters)
}

fn validate_defined(parameters: &[PathParameter], defined: &[DefinedQuantity]) -> Result<()> {
    let mut known: HashSet<&str> = parameters.iter().map(|p| p.name.as_str()).collect();

    for def in defined {
        for reference in def.expr.references() {
            if !known.contains(reference) {
                return Err(SyntaxError::UndefinedReference {
                    name: def.name.clone(),
                    reference: reference.to_string(),
                });
            }
        }
        if !known.insert(def.name.as_str()) {
            return Err(SyntaxError::DuplicateParameter(def.name.clone()));
        }
    }

    Ok(())
}

/// Kahn's algorithm over outcome → outcome dependencies; outcomes left
/// with unmet dependencies form a cycle
fn check_acyclic(relations: &[Relation]) -> Result<()> {
    let index: HashMap<&str, usize> = relations
        .iter()
        .enumerate()
        .map(|(i, r)| (r.outcome.as_str(), i))
        .collect();

    let mut indegree = vec![0usize; relations.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); relations.len()];
    for (i, rel) in relations.iter().enumerate() {
        for p in rel.predictors() {
            if let Some(&j) = index.get(p) {
                indegree[i] += 1;
                dependents[j].push(i);
            }
        }
    }

    let mut ready: Vec<usize> = (0..relations.len()).filter(|&i| indegree[i] == 0).collect();
    ready.reverse();
    let mut visited = 0;

    while let Some(i) = ready.pop() {
        visited += 1;
        for &d in dependents[i].iter().rev() {
            indegree[d] -= 1;
            if indegree[d] == 0 {
                ready.push(d);
            }
        }
    }

    if visited < relations.len() {
        let cycle = (0..relations.len())
            .filter(|&i| indegree[i] > 0)
            .map(|i| relations[i].outcome.clone())
            .collect();
        return Err(SyntaxError::Cycle(cycle));
    }

    Ok(())
}
