//! Configuration types and loading
//!
//! Defaults match the behavior callers get without any configuration, so an
//! empty environment is always valid.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Main configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SiftConfig {
    /// In-memory evaluation settings
    pub evaluation: EvaluationConfig,

    /// Filter parser settings
    pub parser: ParserConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvaluationConfig {
    /// When a property path cannot be resolved on a record, the leaf is
    /// unsatisfied if this is true and satisfied otherwise.
    pub fail_on_missing_association: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            fail_on_missing_association: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParserConfig {
    /// Maximum parenthesis nesting accepted by the parser
    pub max_depth: usize,
}

pub const DEFAULT_MAX_DEPTH: usize = 64;

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

pub const ENV_FAIL_ON_MISSING: &str = "SIFT_FAIL_ON_MISSING_ASSOCIATION";
pub const ENV_MAX_DEPTH: &str = "SIFT_MAX_FILTER_DEPTH";

impl SiftConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup(ENV_FAIL_ON_MISSING) {
            config.evaluation.fail_on_missing_association = parse_bool(ENV_FAIL_ON_MISSING, &v)?;
        }

        if let Some(v) = lookup(ENV_MAX_DEPTH) {
            let depth: usize = v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_MAX_DEPTH.to_string(),
                message: format!("expected a positive integer, got '{}'", v),
            })?;
            if depth == 0 {
                return Err(ConfigError::InvalidValue {
                    key: ENV_MAX_DEPTH.to_string(),
                    message: "must be at least 1".to_string(),
                });
            }
            config.parser.max_depth = depth;
        }

        debug!(
            fail_on_missing_association = config.evaluation.fail_on_missing_association,
            max_depth = config.parser.max_depth,
            "Resolved configuration"
        );
        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{}'", other),
        }),
    }
}
