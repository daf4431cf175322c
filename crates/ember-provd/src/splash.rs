//! Startup identity report and signing self-test
//!
//! An already-provisioned device announces its burned identity at startup
//! and proves the persisted key material still works: a fixed digest is
//! signed through the HSM with the persisted cipher blob and verified
//! against the persisted public modulus.

use num_bigint_dig::BigUint;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use ember_core::{cipher_data_len, modulus_len};
use ember_hal::{BlobStore, DsHsm, FuseStore, KeySlot};
use ember_keys::PUBLIC_EXPONENT;
use ember_session::session::{BLOB_CIPHERDATA, BLOB_PUBKEY};

use crate::error::Result;

const SELF_TEST_MESSAGE: &[u8] = b"ember provisioning self-test";

/// Startup check outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplashStatus {
    /// Device-info block is blank; nothing to verify
    Unprovisioned,
    /// Identity burned but key material missing from the store
    MissingKeyMaterial,
    /// Sign/verify round trip succeeded
    Verified,
    /// Sign/verify round trip produced a bad signature
    BadSignature,
}

/// Report the burned identity, if any, and self-test the persisted key.
pub fn check<H, F, B>(
    hsm: &H,
    fuse: &F,
    store: &B,
    slot: KeySlot,
    key_bits: usize,
) -> Result<SplashStatus>
where
    H: DsHsm,
    F: FuseStore,
    B: BlobStore,
{
    if fuse.read_reg(0)? == 0 {
        info!("device-info block blank, not yet provisioned");
        return Ok(SplashStatus::Unprovisioned);
    }

    let model = fuse.read_reg(1)?;
    let serial = fuse.read_reg(2)?;
    info!(model, serial, "provisioned device identity");

    let n_len = modulus_len(key_bits);
    let pubkey = store.get_blob(BLOB_PUBKEY)?;
    let cipher_data = store.get_blob(BLOB_CIPHERDATA)?;
    let (pubkey, cipher_data) = match (pubkey, cipher_data) {
        (Some(p), Some(c)) if p.len() == n_len && c.len() == cipher_data_len(key_bits) => (p, c),
        _ => {
            warn!("identity burned but persisted key material is missing or malformed");
            return Ok(SplashStatus::MissingKeyMaterial);
        }
    };

    let mut digest_rev: [u8; 32] = Sha256::digest(SELF_TEST_MESSAGE).into();
    digest_rev.reverse();

    let mut signature = hsm.sign(&digest_rev, &cipher_data, slot)?;
    signature.reverse();

    let n = BigUint::from_bytes_be(&pubkey);
    let recovered = BigUint::from_bytes_be(&signature).modpow(&BigUint::from(PUBLIC_EXPONENT), &n);
    let expected = BigUint::from_bytes_be(&Sha256::digest(SELF_TEST_MESSAGE));

    if recovered == expected {
        info!("signature self-test ok");
        Ok(SplashStatus::Verified)
    } else {
        warn!("signature self-test failed, persisted key does not match modulus");
        Ok(SplashStatus::BadSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_hal::{MemBlobStore, MemFuse, SoftHsm};
    use ember_session::Session;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const TEST_KEY_BITS: usize = 512;

    fn provisioned_rig() -> (SoftHsm, MemFuse, MemBlobStore, KeySlot) {
        let fuse = MemFuse::new();
        let store = MemBlobStore::new();
        let slot = KeySlot::new(2).unwrap();

        let mut session = Session::new(
            SoftHsm::new(fuse.clone()),
            fuse.clone(),
            store.clone(),
            ChaCha20Rng::seed_from_u64(21),
            TEST_KEY_BITS,
            slot,
        );
        let set_attest = format!("SET-ATTEST={}", "00".repeat(64));
        for line in [
            "GEN-KEY",
            "SET-MODEL=1001",
            "SET-SERIAL=42",
            "BURN",
            set_attest.as_str(),
            "WRITE",
        ] {
            session.handle_line(line).unwrap();
        }

        (SoftHsm::new(fuse.clone()), fuse, store, slot)
    }

    #[test]
    fn test_blank_device_is_unprovisioned() {
        let fuse = MemFuse::new();
        let hsm = SoftHsm::new(fuse.clone());
        let store = MemBlobStore::new();
        let status = check(&hsm, &fuse, &store, KeySlot::new(2).unwrap(), TEST_KEY_BITS).unwrap();
        assert_eq!(status, SplashStatus::Unprovisioned);
    }

    #[test]
    fn test_provisioned_device_verifies() {
        let (hsm, fuse, store, slot) = provisioned_rig();
        let status = check(&hsm, &fuse, &store, slot, TEST_KEY_BITS).unwrap();
        assert_eq!(status, SplashStatus::Verified);
    }

    #[test]
    fn test_burned_identity_without_blobs() {
        let (hsm, fuse, _store, slot) = provisioned_rig();
        let empty = MemBlobStore::new();
        let status = check(&hsm, &fuse, &empty, slot, TEST_KEY_BITS).unwrap();
        assert_eq!(status, SplashStatus::MissingKeyMaterial);
    }

    #[test]
    fn test_mismatched_modulus_fails_self_test() {
        let (hsm, fuse, store, slot) = provisioned_rig();
        // Replace the persisted modulus with a different key's
        let other = ember_keys::KeyPair::generate(
            &mut ChaCha20Rng::seed_from_u64(99),
            TEST_KEY_BITS,
            b"other",
        )
        .unwrap();
        store.set_blob(BLOB_PUBKEY, &other.modulus_bytes()).unwrap();

        let status = check(&hsm, &fuse, &store, slot, TEST_KEY_BITS).unwrap();
        assert_eq!(status, SplashStatus::BadSignature);
    }
}
