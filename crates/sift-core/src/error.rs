//! Core error types for Sift
//!
//! Parsing and option validation report through value-based errors; nothing in
//! the library panics on user input.

use thiserror::Error;

use crate::config::ConfigError;

/// Core error type for all Sift operations
#[derive(Error, Debug)]
pub enum SiftError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Option error: {0}")]
    Option(#[from] OptionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SiftError {
    pub fn error_code(&self) -> &'static str {
        match self {
            SiftError::Parse(_) => "invalid_filter",
            SiftError::Option(_) => "invalid_option",
            SiftError::Config(_) => "configuration_error",
        }
    }
}

/// Filter expression parse failure
///
/// Positions are byte offsets into the original input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("filter expression is empty")]
    Empty,

    #[error("unexpected token '{found}' at {position}")]
    UnexpectedToken { position: usize, found: String },

    #[error("unexpected end of filter expression")]
    UnexpectedEnd,

    #[error("unterminated string literal starting at {position}")]
    UnterminatedString { position: usize },

    #[error("invalid property path '{property}' at {position}")]
    InvalidProperty { position: usize, property: String },

    #[error("unknown operator '{operator}' at {position}")]
    UnknownOperator { position: usize, operator: String },

    #[error("'and' and 'or' mixed in one group at {position}; add parentheses")]
    MixedGroupOperators { position: usize },

    #[error("filter nesting exceeds maximum depth of {max}")]
    TooDeep { max: usize },
}

/// Query option validation failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionError {
    #[error("{key} must be a non-negative number, got {value}")]
    NegativeCount { key: &'static str, value: i64 },

    #[error("custom option name '{0}' must not start with '$'")]
    ReservedCustomName(String),

    #[error("invalid $filter: {0}")]
    InvalidFilter(#[from] ParseError),

    #[error("{key} expects {expected}")]
    WrongType { key: String, expected: &'static str },
}
