//! Attestation record construction
//!
//! An attestation is a signed statement binding a fresh nonce, a
//! caller-supplied timestamp, the device identity, the public modulus, and
//! the prior attestation chain link. The preimage layout is a fixed
//! concatenation; the signature comes from the HSM over the reversed
//! SHA-256 digest and is reversed back before being reported.

use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use ember_core::types::PriorAttest;
use ember_core::{ATTESTATION_VERSION, NONCE_LEN, TIMESTAMP_LEN};
use ember_hal::{DsHsm, KeySlot};

use crate::error::Result;

/// Fixed preimage length for a given modulus length.
pub const fn preimage_len(modulus_len: usize) -> usize {
    1 + NONCE_LEN + TIMESTAMP_LEN + 4 + 4 + modulus_len + ember_core::ATTEST_LEN
}

/// Concatenate the canonical attestation preimage.
///
/// Field order and widths are a protocol contract shared with every
/// verifier; nothing here may be reordered or resized.
pub fn build_preimage(
    nonce: &[u8; NONCE_LEN],
    timestamp: &[u8; TIMESTAMP_LEN],
    model: u32,
    serial: u32,
    public_modulus: &[u8],
    prior: &PriorAttest,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(preimage_len(public_modulus.len()));
    out.push(ATTESTATION_VERSION);
    out.extend_from_slice(nonce);
    out.extend_from_slice(timestamp);
    out.extend_from_slice(&model.to_be_bytes());
    out.extend_from_slice(&serial.to_be_bytes());
    out.extend_from_slice(public_modulus);
    out.extend_from_slice(prior.as_bytes());
    out
}

/// Build and sign one attestation record.
///
/// Returns `preimage || signature`, with the signature already converted
/// back from the engine's byte order. Never emits a partial record: any
/// HSM failure propagates with nothing reported.
#[allow(clippy::too_many_arguments)]
pub fn build_attestation<H: DsHsm, R: RngCore + CryptoRng>(
    rng: &mut R,
    hsm: &H,
    slot: KeySlot,
    timestamp: &[u8; TIMESTAMP_LEN],
    model: u32,
    serial: u32,
    public_modulus: &[u8],
    prior: &PriorAttest,
    cipher_data: &[u8],
) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);

    let preimage = build_preimage(&nonce, timestamp, model, serial, public_modulus, prior);

    let mut digest_rev: [u8; 32] = Sha256::digest(&preimage).into();
    digest_rev.reverse();

    let mut signature = hsm.sign(&digest_rev, cipher_data, slot)?;
    signature.reverse();

    let mut record = preimage;
    record.extend_from_slice(&signature);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::ATTEST_LEN;

    #[test]
    fn test_preimage_layout() {
        let nonce = [0x11u8; NONCE_LEN];
        let timestamp = [0x22u8; TIMESTAMP_LEN];
        let modulus = vec![0x33u8; 48];
        let prior = PriorAttest::new([0x44u8; ATTEST_LEN]);

        let preimage = build_preimage(&nonce, &timestamp, 0x0102_0304, 0x0506_0708, &modulus, &prior);

        assert_eq!(preimage.len(), preimage_len(48));
        assert_eq!(preimage[0], ATTESTATION_VERSION);
        assert_eq!(&preimage[1..8], &nonce[..]);
        assert_eq!(&preimage[8..16], &timestamp[..]);
        assert_eq!(&preimage[16..20], &[1, 2, 3, 4]);
        assert_eq!(&preimage[20..24], &[5, 6, 7, 8]);
        assert_eq!(&preimage[24..72], &modulus[..]);
        assert_eq!(&preimage[72..136], &prior.as_bytes()[..]);
    }

    #[test]
    fn test_preimage_is_deterministic() {
        let nonce = [7u8; NONCE_LEN];
        let timestamp = [9u8; TIMESTAMP_LEN];
        let modulus = vec![1u8; 64];
        let prior = PriorAttest::new([0u8; ATTEST_LEN]);

        let a = build_preimage(&nonce, &timestamp, 1001, 42, &modulus, &prior);
        let b = build_preimage(&nonce, &timestamp, 1001, 42, &modulus, &prior);
        assert_eq!(a, b);
    }
}
