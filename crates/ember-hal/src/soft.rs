//! Soft HSM backed by the in-memory fuse store
//!
//! Implements the parameter-encrypt and sign primitives in software so the
//! provisioning stack can run end to end without target hardware. The
//! cipher blob layout mirrors the hardware one: embedded IV, then the
//! encrypted parameter block with its integrity tag.

use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, KeyInit, Nonce};
use num_bigint_dig::BigUint;
use tracing::debug;
use zeroize::Zeroizing;

use ember_core::{IV_LEN, WRAP_KEY_LEN};

use crate::error::{HalError, Result};
use crate::fuse::MemFuse;
use crate::traits::{DsHsm, KeySlot};

/// Software digital-signature HSM.
///
/// Shares a [`MemFuse`] with the session so that a key burned via
/// [`crate::FuseStore::write_key_slot`] becomes usable for signing, the
/// same linkage the hardware provides internally.
pub struct SoftHsm {
    fuse: MemFuse,
}

impl SoftHsm {
    /// Create a soft HSM over the given fuse store
    pub fn new(fuse: MemFuse) -> Self {
        Self { fuse }
    }

    fn cipher(key: &[u8; WRAP_KEY_LEN]) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(key.into())
    }
}

impl DsHsm for SoftHsm {
    fn encrypt_params(
        &self,
        param_block: &[u8],
        iv: &[u8; IV_LEN],
        wrap_key: &[u8; WRAP_KEY_LEN],
    ) -> Result<Vec<u8>> {
        if param_block.len() < 8 || (param_block.len() - 8) % 3 != 0 {
            return Err(HalError::Hsm(format!(
                "malformed parameter block ({} bytes)",
                param_block.len()
            )));
        }

        let nonce = Nonce::from_slice(&iv[..12]);
        let ciphertext = Self::cipher(wrap_key)
            .encrypt(nonce, param_block)
            .map_err(|_| HalError::Hsm("parameter encryption failed".into()))?;

        debug!(len = ciphertext.len(), "encrypted wrapped-key parameters");

        let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
        out.extend_from_slice(iv);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn sign(&self, digest_rev: &[u8; 32], cipher_data: &[u8], slot: KeySlot) -> Result<Vec<u8>> {
        if cipher_data.len() <= IV_LEN {
            return Err(HalError::Hsm("cipher data too short".into()));
        }

        let key = self.fuse.slot_key(slot)?;
        let nonce = Nonce::from_slice(&cipher_data[..12]);
        let plaintext = Zeroizing::new(
            Self::cipher(&key)
                .decrypt(nonce, &cipher_data[IV_LEN..])
                .map_err(|_| HalError::Hsm("cipher data did not authenticate".into()))?,
        );

        if plaintext.len() < 8 || (plaintext.len() - 8) % 3 != 0 {
            return Err(HalError::Hsm("decrypted parameter block malformed".into()));
        }
        let n_len = (plaintext.len() - 8) / 3;

        // The word arrays are stored in the engine's reversed byte order,
        // which is little-endian for the integer they encode.
        let modulus = BigUint::from_bytes_le(&plaintext[..n_len]);
        let exponent = Zeroizing::new(BigUint::from_bytes_le(&plaintext[n_len..2 * n_len]));
        let base = BigUint::from_bytes_le(digest_rev);

        let sig = base.modpow(&exponent, &modulus);

        let mut out = sig.to_bytes_le();
        out.resize(n_len, 0);
        Ok(out)
    }
}
