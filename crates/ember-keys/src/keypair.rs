//! RSA identity keypair generation

use num_bigint_dig::{BigInt, BigUint, ModInverse, Sign};
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};
use tracing::info;
use zeroize::Zeroizing;

use ember_core::modulus_len;

use crate::error::{KeyError, Result};
use crate::montgomery;
use crate::PUBLIC_EXPONENT;

/// An RSA identity keypair plus the derived Montgomery constants.
///
/// Created once per successful key-generation command and immutable
/// afterwards. The session owns it only for the duration of that command:
/// the keypair itself is never persisted, only the encrypted parameter
/// blob derived from it. Secret components zero themselves on drop.
pub struct KeyPair {
    n: BigUint,
    e: BigUint,
    p: Zeroizing<BigUint>,
    q: Zeroizing<BigUint>,
    d: Zeroizing<BigUint>,
    rb: BigUint,
    key_bits: usize,
    m_prime: u32,
}

impl KeyPair {
    /// Generate a fresh keypair of `key_bits` bits.
    ///
    /// The RSA generator runs over a ChaCha20 stream seeded from
    /// `SHA-256(fresh randomness from rng || extra_entropy)`, so operator
    /// stirring contributes to but never determines the key.
    pub fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        key_bits: usize,
        extra_entropy: &[u8],
    ) -> Result<Self> {
        if key_bits == 0 || key_bits % 32 != 0 {
            return Err(KeyError::BadKeySize(key_bits));
        }

        let mut fresh = Zeroizing::new([0u8; 32]);
        rng.fill_bytes(fresh.as_mut());

        let mut hasher = Sha256::new();
        hasher.update(fresh.as_ref());
        hasher.update(extra_entropy);
        let seed: [u8; 32] = hasher.finalize().into();
        let mut keygen_rng = ChaCha20Rng::from_seed(seed);

        info!(key_bits, "generating RSA identity keypair");

        let private = RsaPrivateKey::new(&mut keygen_rng, key_bits)
            .map_err(|e| KeyError::Generation(e.to_string()))?;

        let primes = private.primes();
        if primes.len() != 2 {
            return Err(KeyError::Generation(format!(
                "expected 2 primes, generator produced {}",
                primes.len()
            )));
        }

        Self::assemble(
            private.n().clone(),
            private.e().clone(),
            primes[0].clone(),
            primes[1].clone(),
            private.d().clone(),
            key_bits,
        )
    }

    /// Build a keypair from known primes (fixtures and recovery tooling).
    pub fn from_primes(p: BigUint, q: BigUint, key_bits: usize) -> Result<Self> {
        if key_bits == 0 || key_bits % 32 != 0 {
            return Err(KeyError::BadKeySize(key_bits));
        }

        let n = &p * &q;
        let e = BigUint::from(PUBLIC_EXPONENT);
        let one = BigUint::from(1u8);
        let phi = (&p - &one) * (&q - &one);
        let d = e
            .clone()
            .mod_inverse(&phi)
            .ok_or_else(|| KeyError::Generation("public exponent not invertible".into()))?;
        let d = if d.sign() == Sign::Minus {
            d + BigInt::from_biguint(Sign::Plus, phi)
        } else {
            d
        };
        let d = d
            .to_biguint()
            .ok_or_else(|| KeyError::Generation("public exponent not invertible".into()))?;

        Self::assemble(n, e, p, q, d, key_bits)
    }

    fn assemble(
        n: BigUint,
        e: BigUint,
        p: BigUint,
        q: BigUint,
        d: BigUint,
        key_bits: usize,
    ) -> Result<Self> {
        if n.bits() > key_bits {
            return Err(KeyError::Oversized {
                actual: (n.bits() + 7) / 8,
                max: modulus_len(key_bits),
            });
        }

        let (rb, m_prime) = montgomery::derive(&n, key_bits)?;

        Ok(Self {
            n,
            e,
            p: Zeroizing::new(p),
            q: Zeroizing::new(q),
            d: Zeroizing::new(d),
            rb,
            key_bits,
            m_prime,
        })
    }

    /// Public modulus
    pub fn n(&self) -> &BigUint {
        &self.n
    }

    /// Public exponent
    pub fn e(&self) -> &BigUint {
        &self.e
    }

    /// Private exponent
    pub fn d(&self) -> &BigUint {
        &self.d
    }

    /// Montgomery residual for the signing engine
    pub fn rb(&self) -> &BigUint {
        &self.rb
    }

    /// Negated modulus inverse in the engine's word base
    pub fn m_prime(&self) -> u32 {
        self.m_prime
    }

    /// Key size in bits
    pub fn key_bits(&self) -> usize {
        self.key_bits
    }

    /// Public modulus as fixed-width big-endian bytes
    pub fn modulus_bytes(&self) -> Vec<u8> {
        let n_len = modulus_len(self.key_bits);
        let raw = self.n.to_bytes_be();
        let mut out = vec![0u8; n_len - raw.len()];
        out.extend_from_slice(&raw);
        out
    }

    /// First prime factor
    pub fn p(&self) -> &BigUint {
        &self.p
    }

    /// Second prime factor
    pub fn q(&self) -> &BigUint {
        &self.q
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::One;
    use rand::rngs::OsRng;

    // 64-bit primes, enough structure for fast protocol-level fixtures
    fn test_primes() -> (BigUint, BigUint) {
        let p = BigUint::parse_bytes(b"f72c7ab97546d031", 16).unwrap();
        let q = BigUint::parse_bytes(b"e44c4a6ac2570ceb", 16).unwrap();
        (p, q)
    }

    #[test]
    fn test_generate_small_key() {
        let kp = KeyPair::generate(&mut OsRng, 512, b"extra").unwrap();
        assert_eq!(kp.key_bits(), 512);
        assert_eq!(kp.n().bits(), 512);
        assert_eq!(kp.e(), &BigUint::from(PUBLIC_EXPONENT));
        assert_eq!(kp.modulus_bytes().len(), 64);

        // The primes really factor the modulus
        assert_eq!(&(kp.p() * kp.q()), kp.n());

        // d inverts e: x^(e*d) == x (mod n)
        let x = BigUint::from(0x1234_5678u32);
        let roundtrip = x.modpow(kp.e(), kp.n()).modpow(kp.d(), kp.n());
        assert_eq!(roundtrip, x);
    }

    #[test]
    fn test_from_primes_constants() {
        let (p, q) = test_primes();
        let kp = KeyPair::from_primes(p.clone(), q.clone(), 128).unwrap();

        assert_eq!(kp.n(), &(&p * &q));
        assert_eq!(
            kp.rb(),
            &((BigUint::one() << 256usize) % kp.n())
        );

        let word_base = BigUint::one() << 32usize;
        let product = (kp.n() * BigUint::from(kp.m_prime())) % &word_base;
        assert_eq!(product, &word_base - BigUint::one());
    }

    #[test]
    fn test_from_primes_rejects_undersized_block() {
        let (p, q) = test_primes();
        assert!(KeyPair::from_primes(p, q, 64).is_err());
    }

    #[test]
    fn test_bad_key_sizes() {
        assert!(matches!(
            KeyPair::generate(&mut OsRng, 100, &[]),
            Err(KeyError::BadKeySize(100))
        ));
    }
}
