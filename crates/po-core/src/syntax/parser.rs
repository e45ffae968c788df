//! Line-oriented parser for path-model descriptions
//!
//! Statements are separated by newlines or `;`, and `#` starts a comment.
//! Two operators are understood:
//! - `outcome ~ [label*]predictor + ...` declares regressions
//! - `name := expression` declares a derived quantity

use super::error::{Result, SyntaxError};
use super::expr::{Expr, is_ident_char, is_ident_start};
use super::{DefinedQuantity, PathTerm, Relation};

pub(super) enum Statement {
    Relation(Relation),
    Defined(DefinedQuantity),
}

/// Split the source into statements tagged with their 1-based line
pub(super) fn statements(source: &str) -> Result<Vec<Statement>> {
    let mut out = Vec::new();

    for (idx, raw_line) in source.lines().enumerate() {
        let line = idx + 1;
        let code = raw_line.split('#').next().unwrap_or_default();

        for stmt in code.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            out.push(statement(stmt, line)?);
        }
    }

    Ok(out)
}

fn statement(stmt: &str, line: usize) -> Result<Statement> {
    if let Some((lhs, rhs)) = stmt.split_once(":=") {
        let name = identifier(lhs.trim(), line, "derived quantity name")?;
        let expr = Expr::parse(rhs, line)?;
        return Ok(Statement::Defined(DefinedQuantity { name, expr }));
    }

    for operator in ["=~", "~~", "~*~"] {
        if stmt.contains(operator) {
            return Err(SyntaxError::UnsupportedOperator { line, operator });
        }
    }

    let (lhs, rhs) = stmt
        .split_once('~')
        .ok_or_else(|| SyntaxError::parse(line, format!("expected '~' or ':=' in '{}'", stmt)))?;

    let outcome = identifier(lhs.trim(), line, "outcome")?;
    let terms = rhs
        .split('+')
        .map(|part| path_term(part.trim(), line))
        .collect::<Result<Vec<_>>>()?;

    Ok(Statement::Relation(Relation { outcome, terms }))
}

fn path_term(part: &str, line: usize) -> Result<PathTerm> {
    if part.is_empty() {
        return Err(SyntaxError::parse(line, "empty term in regression"));
    }

    match part.split_once('*') {
        Some((label, predictor)) => {
            let label = label.trim();
            if label.parse::<f64>().is_ok() {
                return Err(SyntaxError::parse(
                    line,
                    format!("fixed coefficient '{}' is not supported, use a label", part),
                ));
            }
            Ok(PathTerm {
                label: Some(identifier(label, line, "label")?),
                predictor: identifier(predictor.trim(), line, "predictor")?,
            })
        }
        None => Ok(PathTerm {
            label: None,
            predictor: identifier(part, line, "predictor")?,
        }),
    }
}

fn identifier(text: &str, line: usize, what: &str) -> Result<String> {
    let mut chars = text.chars();
    let valid = chars.next().is_some_and(is_ident_start) && chars.all(is_ident_char);
    if valid {
        Ok(text.to_string())
    } else {
        Err(SyntaxError::parse(line, format!("invalid {} '{}'", what, text)))
    }
}
