//! Ember Core - Shared types and protocol value handling
//!
//! This crate provides the foundational pieces for the Ember provisioning
//! stack: fixed-size byte newtypes for staged identity material, secret
//! buffers that zero themselves on drop, the bounded decimal/hex parsers
//! used by the line protocol, and the `stir` entropy-mixing primitive.

pub mod error;
pub mod parse;
pub mod stir;
pub mod types;

pub use error::{ParseError, Result};
pub use stir::stir;
pub use types::{EntropyPool, PriorAttest, WrapIv, WrapKey};

/// Protocol version reported by `VERSION` and burned into the device-info
/// block.
pub const PROTOCOL_VERSION: u32 = 1;

/// Leading byte of every attestation preimage.
pub const ATTESTATION_VERSION: u8 = 0x01;

/// Default RSA modulus size in bits for this deployment.
pub const DEFAULT_KEY_BITS: usize = 3072;

/// Size of the prior-attestation chain link in bytes.
pub const ATTEST_LEN: usize = 64;

/// Size of the IV handed to the HSM parameter-encrypt operation.
pub const IV_LEN: usize = 16;

/// Size of the symmetric key wrapping the private-key parameter block.
pub const WRAP_KEY_LEN: usize = 32;

/// Size of the extra keygen entropy pool.
pub const ENTROPY_LEN: usize = 32;

/// Random nonce length inside an attestation preimage.
pub const NONCE_LEN: usize = 7;

/// Caller-supplied timestamp length inside an attestation preimage.
pub const TIMESTAMP_LEN: usize = 8;

/// Maximum digits accepted for `SET-MODEL` / `SET-SERIAL` values.
pub const MAX_DECIMAL_DIGITS: usize = 7;

/// Line buffer capacity; a command that overflows this is discarded whole.
pub const LINE_BUFFER_LEN: usize = 4096;

/// Modulus length in bytes for a given key size.
pub const fn modulus_len(key_bits: usize) -> usize {
    key_bits / 8
}

/// Size of the plaintext wrapped-key parameter block: three word arrays
/// (modulus, private exponent, Montgomery residual) plus `m_prime` and the
/// hardware length field.
pub const fn param_block_len(key_bits: usize) -> usize {
    3 * modulus_len(key_bits) + 8
}

/// Size of the opaque encrypted parameter blob returned by the HSM: the
/// embedded IV, the parameter block ciphertext, and the HSM's 16-byte
/// integrity tag.
pub const fn cipher_data_len(key_bits: usize) -> usize {
    IV_LEN + param_block_len(key_bits) + 16
}
