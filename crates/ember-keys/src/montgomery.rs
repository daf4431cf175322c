//! Montgomery parameter derivation for the hardware modexp engine
//!
//! The fixed-point signing engine has no native big-integer division; it
//! needs two precomputed constants per key: the Montgomery residual `Rb`
//! used to enter its internal representation, and `m_prime`, the negated
//! inverse of the modulus modulo the 2^32 word base.

use num_bigint_dig::{BigInt, ModInverse, Sign};
use num_traits::One;

use crate::error::{KeyError, Result};

type BigUint = num_bigint_dig::BigUint;

/// Derive `(Rb, m_prime)` for a modulus and engine operand width.
///
/// - `Rb = (1 << (2 * key_bits)) mod n`
/// - `m_prime = (-(n^-1 mod 2^32)) mod 2^32`
///
/// Pure function of its inputs. Fails only when `n` is even, which cannot
/// happen for a valid RSA modulus and is treated as fatal upstream.
pub fn derive(n: &BigUint, key_bits: usize) -> Result<(BigUint, u32)> {
    if key_bits == 0 || key_bits % 32 != 0 {
        return Err(KeyError::BadKeySize(key_bits));
    }

    let r = BigUint::one() << (2 * key_bits);
    let rb = &r % n;

    let word_base = BigUint::one() << 32usize;
    let inv: BigInt = n
        .mod_inverse(&word_base)
        .ok_or(KeyError::ModulusNotInvertible)?;
    let inv = if inv.sign() == Sign::Minus {
        inv + BigInt::from_biguint(Sign::Plus, word_base)
    } else {
        inv
    };
    let inv = inv
        .to_biguint()
        .ok_or(KeyError::ModulusNotInvertible)?;

    // Low 32 bits of the inverse, negated in the word base
    let le = inv.to_bytes_le();
    let mut low = [0u8; 4];
    let take = le.len().min(4);
    low[..take].copy_from_slice(&le[..take]);
    let m_prime = u32::from_le_bytes(low).wrapping_neg();

    Ok((rb, m_prime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn check_constants(n: &BigUint, key_bits: usize) {
        let (rb, m_prime) = derive(n, key_bits).unwrap();

        // Rb is exactly the double-width radix reduced by the modulus
        assert_eq!(rb, (BigUint::one() << (2 * key_bits)) % n);

        // n * m_prime == -1 (mod 2^32)
        let word_base = BigUint::one() << 32usize;
        let product = (n * BigUint::from(m_prime)) % &word_base;
        assert_eq!(product, &word_base - BigUint::one());
    }

    #[test]
    fn test_known_small_modulus() {
        // 3233 = 61 * 53, the classic toy RSA modulus
        check_constants(&BigUint::from(3233u32), 64);
    }

    #[test]
    fn test_larger_odd_modulus() {
        let n = BigUint::parse_bytes(
            b"c7f1bc1dfb1be82d244aef01228c1b25255ad5c1abe3829b8a8f52160ba2e5f5",
            16,
        )
        .unwrap();
        check_constants(&n, 256);
    }

    #[test]
    fn test_even_modulus_rejected() {
        let err = derive(&BigUint::from(3232u32), 64).unwrap_err();
        assert!(matches!(err, KeyError::ModulusNotInvertible));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_key_bits_must_be_word_aligned() {
        let n = BigUint::from(3233u32);
        assert!(matches!(derive(&n, 100), Err(KeyError::BadKeySize(100))));
        assert!(matches!(derive(&n, 0), Err(KeyError::BadKeySize(0))));
    }

    proptest! {
        #[test]
        fn prop_constants_for_odd_moduli(seed in 3u64..u64::MAX / 2) {
            let n = BigUint::from(seed | 1);
            check_constants(&n, 128);
        }
    }
}
