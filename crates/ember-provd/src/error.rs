//! Daemon error type

use thiserror::Error;

use ember_hal::HalError;

/// Result type alias for daemon operations
pub type Result<T> = std::result::Result<T, ProvdError>;

/// Errors from daemon setup and host-side plumbing.
#[derive(Debug, Error)]
pub enum ProvdError {
    /// Filesystem or stream I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file did not parse
    #[error("config error: {0}")]
    Json(#[from] serde_json::Error),

    /// Hardware collaborator failed during startup
    #[error(transparent)]
    Hal(#[from] HalError),
}
