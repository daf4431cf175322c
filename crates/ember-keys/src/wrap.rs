//! Fixed-layout wrapped-key parameter block
//!
//! The signing engine consumes its operands little-endian, least
//! significant word first. The block packs the modulus, the private
//! exponent, and the Montgomery residual at the engine's fixed operand
//! width, followed by `m_prime` and the operand length in words minus one.

use num_bigint_dig::BigUint;
use zeroize::{Zeroize, ZeroizeOnDrop};

use ember_core::{modulus_len, param_block_len};

use crate::error::{KeyError, Result};
use crate::keypair::KeyPair;

/// Plaintext parameter block for one wrapped identity key.
///
/// Holds the private exponent in engine byte order, so the whole struct
/// zeroes itself on drop. Instances exist only between key generation and
/// the HSM encrypt call.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct WrappedKeyParams {
    length: u32,
    m: Vec<u8>,
    y: Vec<u8>,
    rb: Vec<u8>,
    m_prime: u32,
}

/// Pad a big-endian integer to `width` bytes and flip it little-endian.
fn to_engine_words(value: &BigUint, width: usize) -> Result<Vec<u8>> {
    let mut out = value.to_bytes_le();
    if out.len() > width {
        let actual = out.len();
        out.zeroize();
        return Err(KeyError::Oversized { actual, max: width });
    }
    out.resize(width, 0);
    Ok(out)
}

impl WrappedKeyParams {
    /// Pack a keypair into the engine's operand layout.
    pub fn build(kp: &KeyPair) -> Result<Self> {
        let width = modulus_len(kp.key_bits());

        Ok(Self {
            length: (kp.key_bits() / 32 - 1) as u32,
            m: to_engine_words(kp.n(), width)?,
            y: to_engine_words(kp.d(), width)?,
            rb: to_engine_words(kp.rb(), width)?,
            m_prime: kp.m_prime(),
        })
    }

    /// Serialize as `M || Y || Rb || m_prime || length`, the order the
    /// engine reads its operand memory.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.m.len() * 3 + 8);
        out.extend_from_slice(&self.m);
        out.extend_from_slice(&self.y);
        out.extend_from_slice(&self.rb);
        out.extend_from_slice(&self.m_prime.to_le_bytes());
        out.extend_from_slice(&self.length.to_le_bytes());
        debug_assert_eq!(out.len(), param_block_len(self.m.len() * 8));
        out
    }

    /// Operand length in 32-bit words, minus one
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Modulus in engine byte order
    pub fn m(&self) -> &[u8] {
        &self.m
    }

    /// Montgomery residual in engine byte order
    pub fn rb(&self) -> &[u8] {
        &self.rb
    }

    /// Negated modulus inverse modulo the word base
    pub fn m_prime(&self) -> u32 {
        self.m_prime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn small_keypair() -> KeyPair {
        KeyPair::generate(&mut OsRng, 512, b"fixture").unwrap()
    }

    #[test]
    fn test_layout() {
        let kp = small_keypair();
        let params = WrappedKeyParams::build(&kp).unwrap();

        assert_eq!(params.length(), 512 / 32 - 1);
        assert_eq!(params.m().len(), 64);
        assert_eq!(params.rb().len(), 64);
        assert_eq!(params.m_prime(), kp.m_prime());

        let bytes = params.to_bytes();
        assert_eq!(bytes.len(), param_block_len(512));

        // Operands are the byte-reversed fixed-width values
        let mut n_be = kp.modulus_bytes();
        n_be.reverse();
        assert_eq!(&bytes[..64], &n_be[..]);

        let mut rb_le = kp.rb().to_bytes_le();
        rb_le.resize(64, 0);
        assert_eq!(&bytes[128..192], &rb_le[..]);

        assert_eq!(
            u32::from_le_bytes(bytes[192..196].try_into().unwrap()),
            kp.m_prime()
        );
        assert_eq!(
            u32::from_le_bytes(bytes[196..200].try_into().unwrap()),
            15
        );
    }

    #[test]
    fn test_private_exponent_round_trips() {
        let kp = small_keypair();
        let bytes = WrappedKeyParams::build(&kp).unwrap().to_bytes();

        let y = BigUint::from_bytes_le(&bytes[64..128]);
        assert_eq!(&y, kp.d());
    }

    #[test]
    fn test_oversized_value_rejected() {
        let value = BigUint::from_bytes_le(&[0xffu8; 65]);
        assert!(matches!(
            to_engine_words(&value, 64),
            Err(KeyError::Oversized { actual: 65, max: 64 })
        ));
    }
}
