//! Arithmetic over coefficient names for `:=` definitions

use std::fmt;

use super::error::{Result, SyntaxError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    fn symbol(self) -> char {
        match self {
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '*',
            BinOp::Div => '/',
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinOp::Add | BinOp::Sub => 1,
            BinOp::Mul | BinOp::Div => 2,
        }
    }
}

/// Expression tree of a derived quantity
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// A path label or an earlier derived quantity
    Ref(String),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Evaluate with `lookup` resolving every name
    pub fn eval<F>(&self, lookup: &F) -> Result<f64>
    where
        F: Fn(&str) -> Option<f64>,
    {
        match self {
            Expr::Number(v) => Ok(*v),
            Expr::Ref(name) => lookup(name).ok_or_else(|| SyntaxError::MissingValue(name.clone())),
            Expr::Neg(inner) => Ok(-inner.eval(lookup)?),
            Expr::Binary { op, lhs, rhs } => {
                let (a, b) = (lhs.eval(lookup)?, rhs.eval(lookup)?);
                Ok(match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                })
            }
        }
    }

    /// Names referenced by the expression, in order of first appearance
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Ref(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Neg(inner) => inner.collect_refs(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_refs(out);
                rhs.collect_refs(out);
            }
        }
    }

    /// Parse the right-hand side of a `:=` line
    pub(crate) fn parse(input: &str, line: usize) -> Result<Expr> {
        let tokens = tokenize(input, line)?;
        let mut parser = ExprParser {
            tokens: &tokens,
            pos: 0,
            line,
        };
        let expr = parser.expr()?;
        if parser.pos != tokens.len() {
            return Err(SyntaxError::parse(
                line,
                format!("unexpected '{}' in expression", tokens[parser.pos]),
            ));
        }
        Ok(expr)
    }

    fn write_prec(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        match self {
            Expr::Number(v) => write!(f, "{}", v),
            Expr::Ref(name) => write!(f, "{}", name),
            Expr::Neg(inner) => {
                write!(f, "-")?;
                inner.write_prec(f, 3)
            }
            Expr::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                if prec < parent {
                    write!(f, "(")?;
                }
                lhs.write_prec(f, prec)?;
                write!(f, "{}", op.symbol())?;
                // right operand binds tighter to keep a-(b-c) intact
                rhs.write_prec(f, prec + 1)?;
                if prec < parent {
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_prec(f, 0)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    Open,
    Close,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(v) => write!(f, "{}", v),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Op(c) => write!(f, "{}", c),
            Token::Open => write!(f, "("),
            Token::Close => write!(f, ")"),
        }
    }
}

fn tokenize(input: &str, line: usize) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(c));
                chars.next();
            }
            '(' => {
                tokens.push(Token::Open);
                chars.next();
            }
            ')' => {
                tokens.push(Token::Close);
                chars.next();
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    let exponent_sign = (d == '+' || d == '-') && literal.ends_with(['e', 'E']);
                    if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exponent_sign {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal.parse::<f64>().map_err(|_| {
                    SyntaxError::parse(line, format!("invalid number '{}'", literal))
                })?;
                tokens.push(Token::Number(value));
            }
            c if is_ident_start(c) => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if is_ident_char(d) {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(SyntaxError::parse(
                    line,
                    format!("unexpected character '{}' in expression", other),
                ));
            }
        }
    }

    if tokens.is_empty() {
        return Err(SyntaxError::parse(line, "empty expression"));
    }
    Ok(tokens)
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

struct ExprParser<'t> {
    tokens: &'t [Token],
    pos: usize,
    line: usize,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(c @ ('+' | '-'))) = self.peek() {
            let op = if *c == '+' { BinOp::Add } else { BinOp::Sub };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(c @ ('*' | '/'))) = self.peek() {
            let op = if *c == '*' { BinOp::Mul } else { BinOp::Div };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        if let Some(Token::Op('-')) = self.peek() {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| SyntaxError::parse(self.line, "expression ends unexpectedly"))?;
        self.pos += 1;

        match token {
            Token::Number(v) => Ok(Expr::Number(v)),
            Token::Ident(name) => Ok(Expr::Ref(name)),
            Token::Open => {
                let inner = self.expr()?;
                match self.peek() {
                    Some(Token::Close) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err(SyntaxError::parse(self.line, "missing ')' in expression")),
                }
            }
            other => Err(SyntaxError::parse(
                self.line,
                format!("unexpected '{}' in expression", other),
            )),
        }
    }
}
