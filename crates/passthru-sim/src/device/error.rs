//! Device layer errors

use thiserror::Error;

use passthru_types::J2534Status;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Device not open")]
    NotOpen,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid channel id: {0}")]
    InvalidChannel(u32),

    #[error("Invalid filter id: {0}")]
    InvalidFilter(u32),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// Call returned a non-zero J2534 status
    #[error("{call} failed with {status}")]
    Status {
        call: &'static str,
        status: J2534Status,
    },

    #[error("Device not supported: {0}")]
    Unsupported(String),
}

impl DeviceError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            DeviceError::Timeout(_)
                | DeviceError::Status {
                    status: J2534Status::Timeout | J2534Status::BufferEmpty,
                    ..
                }
        )
    }
}
