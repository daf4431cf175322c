//! Error types for protocol value parsing

use thiserror::Error;

/// Result type alias for core parsing operations
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors produced while decoding protocol parameter values.
///
/// Every variant is recoverable: the offending command is rejected, the
/// session state stays untouched, and the input buffer is discarded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Value contains a non-digit or is empty
    #[error("invalid number")]
    NotANumber,

    /// Decimal value has more digits than the protocol allows
    #[error("number exceeds {0} digits")]
    TooManyDigits(usize),

    /// Hex parameter has the wrong length for its field
    #[error("bad parameter length ({actual} != {expected})")]
    BadLength {
        /// Expected length in hex characters
        expected: usize,
        /// Received length in hex characters
        actual: usize,
    },

    /// Parameter is not valid hex
    #[error("invalid hex data")]
    BadHex,

    /// Field requires a nonzero value
    #[error("value must be nonzero")]
    ZeroValue,
}
