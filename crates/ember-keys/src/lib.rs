//! Ember Keys - RSA identity key material for the HSM signing engine
//!
//! Three pieces live here:
//! - [`montgomery`]: derivation of the Montgomery-domain constants (`Rb`,
//!   `m_prime`) the modular-exponentiation hardware needs,
//! - [`keypair`]: RSA keypair generation with operator-stirred entropy,
//! - [`wrap`]: assembly of the fixed-layout wrapped-key parameter block
//!   handed to the HSM encrypt primitive.
//!
//! The plaintext private exponent only ever exists inside a [`KeyPair`] or
//! a [`WrappedKeyParams`]; both zero their secret material on drop.

pub mod error;
pub mod keypair;
pub mod montgomery;
pub mod wrap;

pub use error::{KeyError, Result};
pub use keypair::KeyPair;
pub use wrap::WrappedKeyParams;

/// Public exponent used for every generated identity key.
pub const PUBLIC_EXPONENT: u32 = 65537;
