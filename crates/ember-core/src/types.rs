//! Byte newtypes for staged identity material and session secrets

use core::fmt;

use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{ATTEST_LEN, ENTROPY_LEN, IV_LEN, WRAP_KEY_LEN};

/// Prior attestation chain link (64 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorAttest(pub [u8; ATTEST_LEN]);

impl PriorAttest {
    /// Create a new PriorAttest from bytes
    pub fn new(bytes: [u8; ATTEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the bytes of the attestation link
    pub fn as_bytes(&self) -> &[u8; ATTEST_LEN] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Create from hex string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; ATTEST_LEN];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for PriorAttest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

macro_rules! secret_buffer {
    ($(#[$doc:meta])* $name:ident, $len:expr) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Byte length of this buffer
            pub const LEN: usize = $len;

            /// Create a buffer filled from the given random source
            pub fn random<R: RngCore>(rng: &mut R) -> Self {
                let mut bytes = [0u8; $len];
                rng.fill_bytes(&mut bytes);
                Self(bytes)
            }

            /// Borrow the raw bytes
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Borrow the raw bytes mutably (for stirring)
            pub fn as_mut_slice(&mut self) -> &mut [u8] {
                &mut self.0
            }
        }

        // Secret material never appears in logs or dumps
        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "([REDACTED; {}])"), $len)
            }
        }
    };
}

secret_buffer!(
    /// Symmetric key protecting the wrapped parameter block (32 bytes).
    ///
    /// Burned into the HSM key slot at `BURN`; zeroed on drop.
    WrapKey,
    WRAP_KEY_LEN
);

secret_buffer!(
    /// Nonce for the HSM parameter-encrypt operation (16 bytes)
    WrapIv,
    IV_LEN
);

secret_buffer!(
    /// Extra seed material mixed into RSA key generation (32 bytes)
    EntropyPool,
    ENTROPY_LEN
);

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_prior_attest_hex_roundtrip() {
        let attest = PriorAttest::new([0xa5; ATTEST_LEN]);
        let recovered = PriorAttest::from_hex(&attest.to_hex()).unwrap();
        assert_eq!(attest, recovered);
    }

    #[test]
    fn test_prior_attest_rejects_short_hex() {
        assert!(PriorAttest::from_hex("a5a5").is_err());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let key = WrapKey::random(&mut rng);
        let rendered = format!("{:?}", key);
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains(&hex::encode(key.as_bytes())));
    }

    #[test]
    fn test_random_buffers_differ() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let a = EntropyPool::random(&mut rng);
        let b = EntropyPool::random(&mut rng);
        assert_ne!(a, b);
    }
}
