//! Error type for parsing J2534 values

use thiserror::Error;

/// Result type for value parsing
pub type TypeResult<T> = Result<T, TypeError>;

/// Errors produced while turning log text into J2534 values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// Name or number does not belong to the enum
    #[error("Unknown {kind} value: {value}")]
    UnknownValue { kind: &'static str, value: String },

    /// Text that should be hex bytes is not
    #[error("Invalid hex data: {0}")]
    InvalidHex(String),

    /// Text that should be an integer is not
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}
