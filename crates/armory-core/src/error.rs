//! Error types for armory-core

use thiserror::Error;

/// Formula error type
///
/// Every variant is a structural problem with the formula text itself.
/// Bad numbers in bounds, missing weights and missing allowances are not
/// errors; the aggregator treats them as zero.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid character '{ch}' at position {pos}")]
    InvalidCharacter { ch: char, pos: usize },

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Unexpected token '{found}' at position {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unbalanced parentheses")]
    UnbalancedParens,

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Formula is too long (more than {limit} tokens)")]
    TooLong { limit: usize },

    #[error("Formula is nested too deeply (more than {limit} levels)")]
    TooDeep { limit: usize },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
