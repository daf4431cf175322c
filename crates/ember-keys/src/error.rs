//! Error types for key generation and wrapping

use thiserror::Error;

/// Result type alias for key operations
pub type Result<T> = std::result::Result<T, KeyError>;

/// Errors from keypair generation, derivation, and wrapping.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The modulus has no inverse modulo 2^32.
    ///
    /// Only an even modulus triggers this; a valid RSA modulus is always
    /// odd, so this signals corrupted key material and is fatal. It is
    /// never silently substituted.
    #[error("modulus is not invertible modulo 2^32")]
    ModulusNotInvertible,

    /// The RSA library failed to produce a keypair
    #[error("key generation failed: {0}")]
    Generation(String),

    /// A value does not fit the fixed-width parameter block
    #[error("value too large for parameter block ({actual} > {max} bytes)")]
    Oversized {
        /// Byte length of the offending value
        actual: usize,
        /// Fixed width of a parameter block field
        max: usize,
    },

    /// Key size is not usable by the hardware word layout
    #[error("key size {0} is not a multiple of 32 bits")]
    BadKeySize(usize),
}

impl KeyError {
    /// Whether this error signals an invariant violation the process must
    /// not continue past.
    pub fn is_fatal(&self) -> bool {
        matches!(self, KeyError::ModulusNotInvertible)
    }
}
