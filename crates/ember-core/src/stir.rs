//! Entropy stirring for operator-supplied seed material

use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// Mix caller-supplied bytes into a secret buffer.
///
/// `dst` becomes the leading bytes of `SHA-256(fresh-random || dst || src)`.
/// The fresh random component guarantees an operator can influence but
/// never fully determine the resulting value through the protocol alone.
pub fn stir<R: RngCore>(rng: &mut R, dst: &mut [u8], src: &[u8]) {
    debug_assert!(dst.len() <= 32);

    let mut fresh = [0u8; 32];
    rng.fill_bytes(&mut fresh);

    let mut hasher = Sha256::new();
    hasher.update(fresh);
    hasher.update(&dst[..]);
    hasher.update(src);
    let mut digest: [u8; 32] = hasher.finalize().into();

    let len = dst.len();
    dst.copy_from_slice(&digest[..len]);

    digest.zeroize();
    fresh.zeroize();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_stir_changes_destination() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let mut dst = [0u8; 32];
        stir(&mut rng, &mut dst, b"operator bytes");
        assert_ne!(dst, [0u8; 32]);
    }

    #[test]
    fn test_stir_depends_on_fresh_randomness() {
        // Same destination, same source, different rng state: the operator
        // cannot force a known value.
        let mut a = [0x11u8; 16];
        let mut b = [0x11u8; 16];

        let mut rng_a = ChaCha20Rng::seed_from_u64(7);
        let mut rng_b = ChaCha20Rng::seed_from_u64(8);
        stir(&mut rng_a, &mut a, b"same");
        stir(&mut rng_b, &mut b, b"same");

        assert_ne!(a, b);
    }

    #[test]
    fn test_stir_shorter_destination() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let mut iv = [0u8; 16];
        stir(&mut rng, &mut iv, &[]);
        assert_ne!(iv, [0u8; 16]);
    }
}
