//! Error types for expression extraction

use thiserror::Error;

use crate::command::CommandType;

/// Result type for extraction operations
pub type ExprResult<T> = Result<T, ExprError>;

/// Errors raised while building the registry or binding a span
#[derive(Debug, Error)]
pub enum ExprError {
    /// Registry entry name does not map onto a command type
    #[error("Unknown pattern name: {0}")]
    UnknownPattern(String),

    /// Registry entry has no usable `*GROUPS_(..)*` list
    #[error("Invalid capture group list for {name}: {reason}")]
    InvalidGroups { name: String, reason: String },

    /// Same command type defined twice
    #[error("Duplicate pattern for {0}")]
    DuplicatePattern(CommandType),

    /// Registry lacks a pattern extraction depends on
    #[error("No pattern registered for {0}")]
    MissingPattern(CommandType),

    /// Command pattern did not match its span
    #[error("{0} pattern did not match the span")]
    PatternMismatch(CommandType),

    /// Bound values do not line up with the declared fields
    #[error("{command} expects {expected} fields, found {found}")]
    FieldCount {
        command: CommandType,
        expected: usize,
        found: usize,
    },

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Value error: {0}")]
    Value(#[from] passthru_types::TypeError),

    #[error("Worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
