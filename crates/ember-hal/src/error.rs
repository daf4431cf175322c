//! Error types for hardware collaborators

use thiserror::Error;

/// Result type alias for HAL operations
pub type Result<T> = std::result::Result<T, HalError>;

/// Errors from the hardware collaborator boundary.
///
/// Every variant is fatal at the process boundary: the session never
/// retries a failed HSM, fuse, or store operation, since a retry against
/// one-time-programmable state can leave the device inconsistent.
#[derive(Debug, Error)]
pub enum HalError {
    /// HSM encrypt or sign primitive failed
    #[error("HSM operation failed: {0}")]
    Hsm(String),

    /// Fuse register or key-slot operation failed
    #[error("fuse operation failed: {0}")]
    Fuse(String),

    /// Blob store operation failed
    #[error("blob store operation failed: {0}")]
    Store(String),

    /// IO error from a file-backed store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
