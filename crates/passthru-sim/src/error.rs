//! Error types for simulation building and playback

use thiserror::Error;

use crate::device::DeviceError;

/// Result type for simulation operations
pub type SimResult<T> = Result<T, SimError>;

/// Errors raised while grouping expressions into channels
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("Channel {0} was assembled twice")]
    DuplicateChannel(u32),
}

/// Top level error for the simulation crate
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("Expression error: {0}")]
    Expression(#[from] passthru_expr::ExprError),

    #[error("Simulation file error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}
