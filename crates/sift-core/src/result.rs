//! Result type aliases

use crate::error::{OptionError, ParseError, SiftError};

/// Standard Result type for Sift operations
pub type SiftResult<T> = Result<T, SiftError>;

/// Result of parsing a filter expression
pub type ParseResult<T> = Result<T, ParseError>;

/// Result of a validating query option setter
pub type OptionResult<T> = Result<T, OptionError>;
