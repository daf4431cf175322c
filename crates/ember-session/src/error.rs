//! Session error taxonomy
//!
//! Recoverable errors turn into an `<ERROR` reply with the session state
//! untouched; fatal errors cross the process boundary, where the host
//! halts rather than risk inconsistent one-time hardware state.

use thiserror::Error;

use ember_core::ParseError;
use ember_hal::HalError;
use ember_keys::KeyError;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors raised while handling a provisioning command.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Malformed command or parameter value; recoverable
    #[error(transparent)]
    Protocol(#[from] ParseError),

    /// Command issued before its prerequisites were staged; recoverable
    #[error("missing prerequisites: {}", .missing.join(", "))]
    Guard {
        /// Every unmet prerequisite, not just the first
        missing: Vec<&'static str>,
    },

    /// Command refused in the current hardware state; recoverable
    #[error("{0}")]
    Rejected(&'static str),

    /// Hardware collaborator failed; fatal, never retried
    #[error(transparent)]
    Hardware(#[from] HalError),

    /// Key generation or derivation failed
    #[error(transparent)]
    Key(#[from] KeyError),
}

impl SessionError {
    /// Whether the host must halt instead of continuing the session.
    ///
    /// Hardware faults are always fatal: retrying a fuse or HSM operation
    /// risks inconsistent one-time state. Key errors are fatal only when
    /// they signal corrupted key material.
    pub fn is_fatal(&self) -> bool {
        match self {
            SessionError::Hardware(_) => true,
            SessionError::Key(e) => e.is_fatal(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality_split() {
        assert!(SessionError::Hardware(HalError::Hsm("sign failed".into())).is_fatal());
        assert!(SessionError::Key(KeyError::ModulusNotInvertible).is_fatal());

        assert!(!SessionError::Protocol(ParseError::BadHex).is_fatal());
        assert!(!SessionError::Guard {
            missing: vec!["pubkey"]
        }
        .is_fatal());
        assert!(!SessionError::Rejected("device-info block already burned").is_fatal());
        assert!(!SessionError::Key(KeyError::BadKeySize(100)).is_fatal());
    }

    #[test]
    fn test_guard_message_enumerates_missing() {
        let err = SessionError::Guard {
            missing: vec!["pubkey", "cipherdata", "model"],
        };
        assert_eq!(
            err.to_string(),
            "missing prerequisites: pubkey, cipherdata, model"
        );
    }
}
