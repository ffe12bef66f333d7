//! Formula engine for attribute costs
//!
//! Cost formulas are short arithmetic strings authored in the budget
//! config, e.g. `weight * max` or `weight * (max^2)`. They are tokenized
//! eagerly and parsed by a closed recursive-descent parser:
//!
//! ```text
//! expression := term (('+' | '-') term)*
//! term       := power (('*' | '/') power)*
//! power      := unary ('^' power)?
//! unary      := '-' unary | primary
//! primary    := number | identifier | '(' expression ')'
//! ```
//!
//! Nothing but these five operators and parentheses is understood, so an
//! admin-authored formula can only ever produce a number.

use crate::{Error, Result};
use indexmap::IndexMap;
use std::fmt;
use tracing::debug;

/// Formula used when the configured one carries no operator
pub const DEFAULT_FORMULA: &str = "weight * max";

/// The identifiers bound during attribute-cost evaluation
pub const VARIABLES: [&str; 6] = ["weight", "min", "max", "avg", "range", "value"];

/// Most tokens a formula may have
pub const MAX_TOKENS: usize = 1024;

/// Deepest nesting of parentheses, unary minus and `^` a formula may have
pub const MAX_DEPTH: usize = 64;

/// Variable bindings for formula evaluation, keyed by lowercase identifier
pub type VarMap = IndexMap<String, f64>;

/// A parsed arithmetic expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A numeric literal
    Number(f64),
    /// A variable reference (lowercase)
    Var(String),
    /// Add two expressions
    Add(Box<Expr>, Box<Expr>),
    /// Subtract second from first
    Sub(Box<Expr>, Box<Expr>),
    /// Multiply two expressions
    Mul(Box<Expr>, Box<Expr>),
    /// Divide first by second
    Div(Box<Expr>, Box<Expr>),
    /// Raise first to the power of second
    Pow(Box<Expr>, Box<Expr>),
    /// Negate an expression
    Neg(Box<Expr>),
}

impl Expr {
    /// Evaluate this expression against a set of variables
    ///
    /// The raw IEEE result is returned; callers that need the
    /// finite-or-zero policy go through [`Formula::eval`].
    pub fn eval(&self, vars: &VarMap) -> Result<f64> {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::Var(name) => vars
                .get(name)
                .copied()
                .ok_or_else(|| Error::UnknownVariable(name.clone())),
            Expr::Add(a, b) => Ok(a.eval(vars)? + b.eval(vars)?),
            Expr::Sub(a, b) => Ok(a.eval(vars)? - b.eval(vars)?),
            Expr::Mul(a, b) => Ok(a.eval(vars)? * b.eval(vars)?),
            Expr::Div(a, b) => Ok(a.eval(vars)? / b.eval(vars)?),
            Expr::Pow(a, b) => Ok(a.eval(vars)?.powf(b.eval(vars)?)),
            Expr::Neg(a) => Ok(-a.eval(vars)?),
        }
    }

    fn collect_vars<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Var(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Neg(a) => a.collect_vars(out),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
        }
    }

    /// Binding strength used when rendering
    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) => 1,
            Expr::Mul(..) | Expr::Div(..) => 2,
            Expr::Pow(..) => 3,
            Expr::Neg(_) => 4,
            Expr::Number(_) | Expr::Var(_) => 5,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b, symbol, right_assoc) = match self {
            Expr::Number(n) => return write!(f, "{}", n),
            Expr::Var(name) => return write!(f, "{}", name),
            Expr::Neg(a) => {
                return if a.precedence() < self.precedence() {
                    write!(f, "-({})", a)
                } else {
                    write!(f, "-{}", a)
                };
            }
            Expr::Add(a, b) => (a, b, "+", false),
            Expr::Sub(a, b) => (a, b, "-", false),
            Expr::Mul(a, b) => (a, b, "*", false),
            Expr::Div(a, b) => (a, b, "/", false),
            Expr::Pow(a, b) => (a, b, "^", true),
        };

        let prec = self.precedence();
        let left_parens = if right_assoc {
            a.precedence() <= prec
        } else {
            a.precedence() < prec
        };
        let right_parens = if right_assoc {
            b.precedence() < prec
        } else {
            b.precedence() <= prec
        };

        if left_parens {
            write!(f, "({})", a)?;
        } else {
            write!(f, "{}", a)?;
        }
        write!(f, " {} ", symbol)?;
        if right_parens {
            write!(f, "({})", b)
        } else {
            write!(f, "{}", b)
        }
    }
}

/// A parsed formula, ready to be evaluated many times
///
/// An effectively empty source parses to a formula that always yields `0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expr: Option<Expr>,
}

impl Formula {
    /// Parse a formula string
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Ok(Self { expr: None });
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser.parse_expression()?;
        if let Some(tok) = parser.peek() {
            return Err(match tok.token {
                Token::RParen => Error::UnbalancedParens,
                _ => Error::UnexpectedToken {
                    found: tok.token.to_string(),
                    pos: tok.pos,
                },
            });
        }
        Ok(Self { expr: Some(expr) })
    }

    /// The parsed expression, if the source was not empty
    pub fn expr(&self) -> Option<&Expr> {
        self.expr.as_ref()
    }

    /// Whether the source contained no tokens at all
    pub fn is_empty(&self) -> bool {
        self.expr.is_none()
    }

    /// Distinct variables referenced, in order of first appearance
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        if let Some(expr) = &self.expr {
            expr.collect_vars(&mut out);
        }
        out
    }

    /// Evaluate against `vars`, coercing non-finite results to `0`
    pub fn eval(&self, vars: &VarMap) -> Result<f64> {
        let Some(expr) = &self.expr else {
            return Ok(0.0);
        };
        let value = expr.eval(vars)?;
        if value.is_finite() {
            Ok(value)
        } else {
            debug!(formula = %expr, result = value, "non-finite formula result coerced to 0");
            Ok(0.0)
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expr {
            Some(expr) => write!(f, "{}", expr),
            None => Ok(()),
        }
    }
}

/// Evaluate a formula string against a set of variables
///
/// Non-finite results (division by zero and the like) come back as `0`.
///
/// ```
/// use armory_core::{evaluate, FormulaVars};
///
/// let vars = FormulaVars::new(2.0, 0.0, 3.0).to_var_map();
/// assert_eq!(evaluate("weight * max^2", &vars).unwrap(), 18.0);
/// assert_eq!(evaluate("weight / 0", &vars).unwrap(), 0.0);
/// ```
pub fn evaluate(expression: &str, vars: &VarMap) -> Result<f64> {
    Formula::parse(expression)?.eval(vars)
}

/// Check a formula for structural errors
///
/// The formula is evaluated against a dummy binding where every known
/// variable is `1`; the number is discarded. The error's `Display` is the
/// rejection message shown to whoever authored the formula.
pub fn validate(expression: &str) -> Result<()> {
    let vars: VarMap = VARIABLES
        .iter()
        .map(|name| (name.to_string(), 1.0))
        .collect();
    evaluate(expression, &vars).map(|_| ())
}

/// Whether a raw formula value contains an arithmetic operator
///
/// A value without one is a bare name that was never resolved to an
/// expression and must not be evaluated as-is.
pub fn has_operator(raw: &str) -> bool {
    raw.contains(['+', '-', '*', '/', '^'])
}

/// The six-variable binding for one attribute bound
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormulaVars {
    pub weight: f64,
    pub min: f64,
    pub max: f64,
}

impl FormulaVars {
    pub fn new(weight: f64, min: f64, max: f64) -> Self {
        Self { weight, min, max }
    }

    /// Midpoint of the bound
    pub fn avg(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// Width of the bound
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Build the variable map (`value` is an alias of `max`)
    pub fn to_var_map(&self) -> VarMap {
        let mut vars = VarMap::with_capacity(VARIABLES.len());
        vars.insert("weight".to_string(), self.weight);
        vars.insert("min".to_string(), self.min);
        vars.insert("max".to_string(), self.max);
        vars.insert("avg".to_string(), self.avg());
        vars.insert("range".to_string(), self.range());
        vars.insert("value".to_string(), self.max);
        vars
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    pos: usize,
}

fn tokenize(input: &str) -> Result<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        let token = match ch {
            ' ' | '\t' => continue,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '0'..='9' | '.' => {
                let mut literal = String::from(ch);
                while let Some(&(_, next)) = chars.peek() {
                    if !next.is_ascii_digit() && next != '.' {
                        break;
                    }
                    literal.push(next);
                    chars.next();
                }
                if literal.matches('.').count() > 1 {
                    return Err(Error::InvalidNumber(literal));
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| Error::InvalidNumber(literal.clone()))?;
                Token::Number(value)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::from(c.to_ascii_lowercase());
                while let Some(&(_, next)) = chars.peek() {
                    if !next.is_ascii_alphanumeric() && next != '_' {
                        break;
                    }
                    ident.push(next.to_ascii_lowercase());
                    chars.next();
                }
                Token::Ident(ident)
            }
            other => return Err(Error::InvalidCharacter { ch: other, pos }),
        };
        tokens.push(Spanned { token, pos });
        if tokens.len() > MAX_TOKENS {
            return Err(Error::TooLong { limit: MAX_TOKENS });
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn parse_expression(&mut self) -> Result<Expr> {
        let mut node = self.parse_term()?;
        loop {
            if self.eat(&Token::Plus) {
                node = Expr::Add(Box::new(node), Box::new(self.parse_term()?));
            } else if self.eat(&Token::Minus) {
                node = Expr::Sub(Box::new(node), Box::new(self.parse_term()?));
            } else {
                return Ok(node);
            }
        }
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut node = self.parse_power()?;
        loop {
            if self.eat(&Token::Star) {
                node = Expr::Mul(Box::new(node), Box::new(self.parse_power()?));
            } else if self.eat(&Token::Slash) {
                node = Expr::Div(Box::new(node), Box::new(self.parse_power()?));
            } else {
                return Ok(node);
            }
        }
    }

    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_unary()?;
        if self.eat(&Token::Caret) {
            // right-associative: 2^3^2 == 2^(3^2)
            let exponent = self.nested(Self::parse_power)?;
            return Ok(Expr::Pow(Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Neg(Box::new(self.nested(Self::parse_unary)?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let Some(spanned) = self.next() else {
            return Err(Error::UnexpectedEnd);
        };
        match spanned.token {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Ident(name) => Ok(Expr::Var(name)),
            Token::LParen => {
                let inner = self.nested(Self::parse_expression)?;
                match self.next() {
                    Some(Spanned {
                        token: Token::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(Error::UnexpectedToken {
                        found: other.token.to_string(),
                        pos: other.pos,
                    }),
                    None => Err(Error::UnbalancedParens),
                }
            }
            other => Err(Error::UnexpectedToken {
                found: other.to_string(),
                pos: spanned.pos,
            }),
        }
    }

    fn nested(&mut self, parse: fn(&mut Self) -> Result<Expr>) -> Result<Expr> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::TooDeep { limit: MAX_DEPTH });
        }
        self.depth += 1;
        let expr = parse(self);
        self.depth -= 1;
        expr
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek().map(|s| &s.token) == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Spanned> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> VarMap {
        FormulaVars::new(2.0, 0.0, 3.0).to_var_map()
    }

    #[test]
    fn test_precedence() {
        let vars = vars();
        assert_eq!(evaluate("weight * max^2", &vars).unwrap(), 18.0);
        assert_eq!(evaluate("1 + 2 * 3", &vars).unwrap(), 7.0);
        assert_eq!(evaluate("(1 + 2) * 3", &vars).unwrap(), 9.0);
        assert_eq!(evaluate("10 - 4 - 3", &vars).unwrap(), 3.0);
        assert_eq!(evaluate("12 / 3 / 2", &vars).unwrap(), 2.0);
    }

    #[test]
    fn test_power_is_right_associative() {
        let vars = vars();
        assert_eq!(evaluate("2^3^2", &vars).unwrap(), 512.0);
        assert_eq!(evaluate("(2^3)^2", &vars).unwrap(), 64.0);
    }

    #[test]
    fn test_unary_minus() {
        let vars = vars();
        assert_eq!(evaluate("-max", &vars).unwrap(), -3.0);
        assert_eq!(evaluate("--max", &vars).unwrap(), 3.0);
        assert_eq!(evaluate("weight * -max", &vars).unwrap(), -6.0);
        // unary binds tighter than ^
        assert_eq!(evaluate("-2^2", &vars).unwrap(), 4.0);
        assert_eq!(evaluate("2^-1", &vars).unwrap(), 0.5);
    }

    #[test]
    fn test_derived_variables() {
        let vars = FormulaVars::new(1.0, 2.0, 6.0).to_var_map();
        assert_eq!(evaluate("avg", &vars).unwrap(), 4.0);
        assert_eq!(evaluate("range", &vars).unwrap(), 4.0);
        assert_eq!(evaluate("value", &vars).unwrap(), 6.0);
    }

    #[test]
    fn test_identifiers_are_case_insensitive() {
        let vars = vars();
        assert_eq!(evaluate("WEIGHT * Max", &vars).unwrap(), 6.0);
    }

    #[test]
    fn test_empty_expression_is_zero() {
        let vars = vars();
        assert_eq!(evaluate("", &vars).unwrap(), 0.0);
        assert_eq!(evaluate(" \t ", &vars).unwrap(), 0.0);
        assert!(Formula::parse("  ").unwrap().is_empty());
    }

    #[test]
    fn test_non_finite_is_zero() {
        let vars = FormulaVars::new(5.0, 0.0, 0.0).to_var_map();
        assert_eq!(evaluate("weight / 0", &vars).unwrap(), 0.0);
        assert_eq!(evaluate("0 / 0", &vars).unwrap(), 0.0);
        assert_eq!(evaluate("weight / min", &vars).unwrap(), 0.0);
    }

    #[test]
    fn test_rejects_foreign_syntax() {
        let vars = vars();
        assert_eq!(
            evaluate("weight; process.exit()", &vars),
            Err(Error::InvalidCharacter { ch: ';', pos: 6 })
        );
        assert_eq!(
            evaluate("other * 2", &vars),
            Err(Error::UnknownVariable("other".to_string()))
        );
    }

    #[test]
    fn test_validate() {
        assert!(validate("weight * max").is_ok());
        assert!(validate("weight * (max^2) + avg - range / value").is_ok());
        assert!(validate("").is_ok());

        assert_eq!(validate("weight +"), Err(Error::UnexpectedEnd));
        let err = validate("banana(weight)").unwrap_err();
        assert!(!err.to_string().is_empty());
        assert_eq!(validate("(weight * max"), Err(Error::UnbalancedParens));
        assert_eq!(validate("weight * max)"), Err(Error::UnbalancedParens));
        assert_eq!(
            validate("1.2.3 * weight"),
            Err(Error::InvalidNumber("1.2.3".to_string()))
        );
        assert!(matches!(
            validate("weight * * max"),
            Err(Error::UnexpectedToken { .. })
        ));
        assert!(matches!(validate("()"), Err(Error::UnexpectedToken { .. })));
    }

    #[test]
    fn test_line_breaks_are_invalid() {
        assert!(matches!(
            validate("weight\n* max"),
            Err(Error::InvalidCharacter { ch: '\n', .. })
        ));
        assert_eq!(
            validate("weight\r* max"),
            Err(Error::InvalidCharacter { ch: '\r', pos: 6 })
        );
        assert!(validate("weight\t*\tmax").is_ok());
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |n: usize| format!("{}1{}", "(".repeat(n), ")".repeat(n));
        assert!(validate(&nested(MAX_DEPTH)).is_ok());
        assert_eq!(
            validate(&nested(MAX_DEPTH + 1)),
            Err(Error::TooDeep { limit: MAX_DEPTH })
        );
        assert_eq!(
            validate(&format!("{}1", "-".repeat(MAX_DEPTH + 1))),
            Err(Error::TooDeep { limit: MAX_DEPTH })
        );
        assert_eq!(
            validate(&format!("2{}", "^2".repeat(MAX_DEPTH + 1))),
            Err(Error::TooDeep { limit: MAX_DEPTH })
        );

        assert!(validate(&nested(100_000)).is_err());
        assert!(validate(&format!("{}1", "-".repeat(100_000))).is_err());
    }

    #[test]
    fn test_length_limit() {
        let vars = vars();
        // 500 additions is 1001 tokens
        let long = format!("{}1", "1+".repeat(500));
        assert_eq!(evaluate(&long, &vars).unwrap(), 501.0);

        let too_long = format!("{}1", "1+".repeat(MAX_TOKENS));
        assert_eq!(
            validate(&too_long),
            Err(Error::TooLong { limit: MAX_TOKENS })
        );
    }

    #[test]
    fn test_has_operator() {
        assert!(has_operator("weight * max"));
        assert!(has_operator("max^2"));
        assert!(!has_operator("linear"));
        assert!(!has_operator("(max)"));
    }

    #[test]
    fn test_variables() {
        let formula = Formula::parse("weight * max + weight * avg").unwrap();
        assert_eq!(formula.variables(), vec!["weight", "max", "avg"]);
    }

    #[test]
    fn test_display_normalizes() {
        let formula = Formula::parse("WEIGHT*(MAX^2)").unwrap();
        assert_eq!(formula.to_string(), "weight * max ^ 2");

        let formula = Formula::parse("(weight - min) - (max - 1)").unwrap();
        assert_eq!(formula.to_string(), "weight - min - (max - 1)");
        let reparsed = Formula::parse(&formula.to_string()).unwrap();
        assert_eq!(reparsed, formula);

        let formula = Formula::parse("-(a + b)").unwrap();
        assert_eq!(formula.to_string(), "-(a + b)");
    }
}
