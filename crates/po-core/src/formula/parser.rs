//! Recursive-descent parser for formula text
//!
//! Grammar, loosest binding first: `+`/`-` separate terms, `*` crosses,
//! `:` interacts, and a factor is a name, `f(name)` with one of the known
//! transforms, or a parenthesized sum. `0`/`1` (or `- 1`) set the intercept.
//! `x*w` expands to `x + w + x:w` and `(a + b):c` to `a:c + b:c`.

use crate::formula::error::{FormulaError, FormulaResult};
use crate::formula::term::{Term, TermKind, Transform};
use crate::formula::Formula;
use std::iter::Peekable;
use std::str::Chars;

/// Character cursor over one formula
pub struct FormulaParser<'a> {
    chars: Peekable<Chars<'a>>,
    original: String,
    position: usize,
}

impl<'a> FormulaParser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            original: input.to_string(),
            position: 0,
        }
    }

    pub fn parse(formula: &str) -> FormulaResult<Formula> {
        let mut parser = FormulaParser::new(formula);
        parser.parse_formula()
    }

    fn parse_formula(&mut self) -> FormulaResult<Formula> {
        self.skip_whitespace();

        if self.chars.peek().is_none() {
            return Err(FormulaError::syntax(self.position, "Empty formula"));
        }

        let response = self.parse_response()?;
        self.parse_tilde()?;
        let (intercept, terms) = self.parse_rhs(false)?;

        self.skip_whitespace();
        if self.chars.peek().is_some() {
            let remaining: String = self.chars.clone().collect();
            return Err(FormulaError::syntax_near(
                self.position,
                "trailing characters after formula",
                &remaining,
            ));
        }

        if let Some(resp) = &response {
            if terms.iter().any(|t| t.variables().contains(&resp.as_str())) {
                return Err(FormulaError::invalid_structure(format!(
                    "response '{}' also appears on the right-hand side",
                    resp
                )));
            }
        }

        Ok(Formula {
            response,
            terms,
            has_intercept: intercept.unwrap_or(true),
            original: self.original.clone(),
        })
    }

    /// Name left of `~`, or `None` for one-sided formulas
    fn parse_response(&mut self) -> FormulaResult<Option<String>> {
        self.skip_whitespace();

        if self.peek_char() == Some('~') {
            return Ok(None);
        }

        let ident = self.parse_identifier()?;

        self.skip_whitespace();
        if self.peek_char() == Some('~') {
            Ok(Some(ident))
        } else {
            let found = self.peek_char().map(String::from).unwrap_or_default();
            Err(FormulaError::syntax_near(
                self.position,
                "expected '~' after response variable",
                &found,
            ))
        }
    }

    /// Parse a sum of terms. Returns the explicit intercept setting, if any.
    fn parse_rhs(&mut self, nested: bool) -> FormulaResult<(Option<bool>, Vec<Term>)> {
        let mut intercept = None;
        let mut terms: Vec<Term> = Vec::new();
        let mut first = true;

        loop {
            self.skip_whitespace();

            let at_end = match self.peek_char() {
                None => true,
                Some(')') => nested,
                _ => false,
            };
            if at_end {
                if first && !nested {
                    // `y ~` alone is the intercept-only model
                    break;
                }
                return Err(FormulaError::syntax(self.position, "Expected term"));
            }

            let subtract = if first {
                false
            } else {
                match self.peek_char() {
                    Some('+') => false,
                    Some('-') => true,
                    _ => break,
                }
            };
            if !first {
                self.advance();
                self.skip_whitespace();
            } else if self.peek_char() == Some('-') {
                // leading `- 1`
                self.advance();
                self.skip_whitespace();
                self.parse_item(nested, true, &mut intercept, &mut terms)?;
                first = false;
                continue;
            }

            self.parse_item(nested, subtract, &mut intercept, &mut terms)?;
            first = false;

            self.skip_whitespace();
            match self.peek_char() {
                Some('+') | Some('-') => continue,
                _ => break,
            }
        }

        Ok((intercept, terms))
    }

    fn parse_item(
        &mut self,
        nested: bool,
        subtract: bool,
        intercept: &mut Option<bool>,
        terms: &mut Vec<Term>,
    ) -> FormulaResult<()> {
        match self.peek_char() {
            Some(c) if c.is_ascii_digit() => {
                let position = self.position;
                let flag = self.parse_intercept_literal()?;
                if nested {
                    return Err(FormulaError::syntax(
                        position,
                        "Intercept specification is not allowed inside parentheses",
                    ));
                }
                *intercept = Some(flag != subtract);
            }
            Some(_) => {
                let crossed = self.parse_crossed()?;
                if subtract {
                    let removed: Vec<String> = crossed.iter().map(Term::key).collect();
                    terms.retain(|t| !removed.contains(&t.key()));
                } else {
                    for term in crossed {
                        push_unique(terms, term);
                    }
                }
            }
            None => return Err(FormulaError::syntax(self.position, "Expected term")),
        }
        Ok(())
    }

    fn parse_intercept_literal(&mut self) -> FormulaResult<bool> {
        let position = self.position;
        let mut literal = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
                literal.push(c);
                self.advance();
            } else {
                break;
            }
        }

        match literal.as_str() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(FormulaError::syntax(
                position,
                format!("Only 0 or 1 may appear as a numeric term, found '{}'", other),
            )),
        }
    }

    /// Factors joined by `*`
    fn parse_crossed(&mut self) -> FormulaResult<Vec<Term>> {
        let mut acc = self.parse_chain()?;

        loop {
            self.skip_whitespace();
            if self.peek_char() != Some('*') {
                break;
            }
            self.advance();
            let rhs = self.parse_chain()?;

            let mut crossed = acc.clone();
            for term in &rhs {
                push_unique(&mut crossed, term.clone());
            }
            for term in self.product(&acc, &rhs)? {
                push_unique(&mut crossed, term);
            }
            acc = crossed;
        }

        Ok(acc)
    }

    /// Factors joined by `:`
    fn parse_chain(&mut self) -> FormulaResult<Vec<Term>> {
        let mut acc = self.parse_factor()?;

        loop {
            self.skip_whitespace();
            if self.peek_char() != Some(':') {
                break;
            }
            self.advance();
            let rhs = self.parse_factor()?;
            acc = self.product(&acc, &rhs)?;
        }

        Ok(acc)
    }

    /// Pairwise interactions of two term lists
    fn product(&self, lhs: &[Term], rhs: &[Term]) -> FormulaResult<Vec<Term>> {
        let mut out = Vec::new();
        for a in lhs {
            for b in rhs {
                let mut variables: Vec<String> = Vec::new();
                for term in [a, b] {
                    if let TermKind::Function { .. } = term.kind {
                        return Err(FormulaError::syntax(
                            self.position,
                            "Interaction terms must be simple variables",
                        ));
                    }
                    for var in term.variables() {
                        if !variables.iter().any(|v| v == var) {
                            variables.push(var.to_string());
                        }
                    }
                }
                let term = if variables.len() == 1 {
                    Term::variable(variables.remove(0))
                } else {
                    Term::interaction(variables)
                };
                push_unique(&mut out, term);
            }
        }
        Ok(out)
    }

    /// Name, transform call or parenthesized sum
    fn parse_factor(&mut self) -> FormulaResult<Vec<Term>> {
        self.skip_whitespace();

        match self.peek_char() {
            Some('(') => {
                self.advance();
                let (_, terms) = self.parse_rhs(true)?;
                self.expect(')')?;
                Ok(terms)
            }
            Some(c) if c.is_alphabetic() || c == '.' => {
                let ident = self.parse_identifier()?;
                self.skip_whitespace();
                if self.peek_char() == Some('(') {
                    Ok(vec![self.parse_function_call(&ident)?])
                } else {
                    Ok(vec![Term::variable(ident)])
                }
            }
            Some(c) => Err(FormulaError::syntax(
                self.position,
                format!("Unexpected character '{}' in factor", c),
            )),
            None => Err(FormulaError::syntax(
                self.position,
                "Unexpected end of input, expected factor",
            )),
        }
    }

    fn parse_function_call(&mut self, func_name: &str) -> FormulaResult<Term> {
        let transform: Transform = func_name.parse()?;
        self.expect('(')?;
        self.skip_whitespace();

        if self.peek_char() == Some(')') {
            return Err(FormulaError::syntax(
                self.position,
                format!("Function '{}' requires one argument", func_name),
            ));
        }

        let arg = self.parse_identifier()?;
        self.skip_whitespace();
        if self.peek_char() == Some(',') {
            return Err(FormulaError::function(func_name, "Expected 1 argument"));
        }
        self.expect(')')?;

        Ok(Term::function(transform, arg))
    }

    fn parse_identifier(&mut self) -> FormulaResult<String> {
        let mut ident = String::new();
        let start_pos = self.position;

        match self.chars.next() {
            Some(c) if c.is_alphabetic() || c == '.' => {
                self.position += 1;
                ident.push(c);
            }
            Some(c) => {
                return Err(FormulaError::syntax(
                    start_pos,
                    format!("Identifier must start with a letter, found '{}'", c),
                ));
            }
            None => {
                return Err(FormulaError::syntax(
                    start_pos,
                    "Unexpected end of input, expected identifier",
                ));
            }
        }

        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                ident.push(c);
                self.chars.next();
                self.position += 1;
            } else {
                break;
            }
        }

        Ok(ident)
    }

    fn parse_tilde(&mut self) -> FormulaResult<()> {
        self.skip_whitespace();
        self.expect('~')
    }

    fn expect(&mut self, expected: char) -> FormulaResult<()> {
        self.skip_whitespace();
        match self.chars.next() {
            Some(c) if c == expected => {
                self.position += 1;
                Ok(())
            }
            Some(c) => Err(FormulaError::syntax(
                self.position,
                format!("Expected '{}', found '{}'", expected, c),
            )),
            None => Err(FormulaError::syntax(
                self.position,
                format!("Unexpected end of input, expected '{}'", expected),
            )),
        }
    }

    fn advance(&mut self) {
        if self.chars.next().is_some() {
            self.position += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
                self.position += 1;
            } else {
                break;
            }
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }
}

fn push_unique(terms: &mut Vec<Term>, term: Term) {
    let key = term.key();
    if !terms.iter().any(|t| t.key() == key) {
        terms.push(term);
    }
}
