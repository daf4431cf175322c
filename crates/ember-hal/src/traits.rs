//! Collaborator trait definitions
//!
//! All operations are synchronous and non-reentrant: the session runs one
//! command to completion before touching a collaborator again.

use ember_core::{IV_LEN, WRAP_KEY_LEN};

use crate::error::{HalError, Result};
use crate::KEY_SLOTS;

/// A key slot in the fuse key array (0..=5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySlot(u8);

impl KeySlot {
    /// Create a key slot, rejecting out-of-range indices
    pub fn new(index: u8) -> Result<Self> {
        if usize::from(index) >= KEY_SLOTS {
            return Err(HalError::Fuse(format!("invalid key slot: {}", index)));
        }
        Ok(Self(index))
    }

    /// Slot index
    pub fn index(&self) -> usize {
        usize::from(self.0)
    }
}

/// Declared purpose of a burned key slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPurpose {
    /// HMAC key consumed downstream by the digital-signature engine
    HmacDownDigitalSignature,
    /// General HMAC key
    Hmac,
}

/// Read/write protection state of a key slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyProtection {
    /// Firmware reads of the slot are disabled
    pub read_disabled: bool,
    /// Further writes to the slot are disabled
    pub write_disabled: bool,
}

/// The digital-signature HSM.
///
/// The HSM performs modular exponentiation over a private key it only ever
/// sees in encrypted, wrapped form. Both operations fail fatally on
/// hardware error and never return a partial result.
pub trait DsHsm {
    /// Encrypt a plaintext wrapped-key parameter block.
    ///
    /// Returns the opaque cipher blob that is the only form of the private
    /// key ever staged or persisted. The caller must discard the plaintext
    /// block immediately after this call returns.
    fn encrypt_params(
        &self,
        param_block: &[u8],
        iv: &[u8; IV_LEN],
        wrap_key: &[u8; WRAP_KEY_LEN],
    ) -> Result<Vec<u8>>;

    /// Sign a digest through the modular-exponentiation engine.
    ///
    /// `digest_rev` is the SHA-256 digest in the engine's reversed byte
    /// order; the returned signature is likewise reversed. `slot` names the
    /// fuse key slot holding the wrapping key that unlocks `cipher_data`.
    fn sign(&self, digest_rev: &[u8; 32], cipher_data: &[u8], slot: KeySlot) -> Result<Vec<u8>>;
}

/// One-time-programmable fuse storage.
///
/// Writes are permanent. A failed batch must not be retried with different
/// values once any register in the block has been set.
pub trait FuseStore {
    /// Read a 32-bit register from the device-info block
    fn read_reg(&self, reg: usize) -> Result<u32>;

    /// Write a batch of device-info registers, commit-or-abort
    fn batch_write(&self, writes: &[(usize, u32)]) -> Result<()>;

    /// Burn a key into a fuse key slot with its purpose
    fn write_key_slot(
        &self,
        slot: KeySlot,
        purpose: KeyPurpose,
        key: &[u8; WRAP_KEY_LEN],
    ) -> Result<()>;

    /// Whether a key slot has never been written
    fn key_slot_unused(&self, slot: KeySlot) -> Result<bool>;

    /// Protection state of a key slot
    fn key_slot_protection(&self, slot: KeySlot) -> Result<KeyProtection>;

    /// Raw readback of a key slot block (all zeros when read-protected)
    fn read_key_block(&self, slot: KeySlot) -> Result<[u8; WRAP_KEY_LEN]>;
}

/// Persistent blob key-value store
pub trait BlobStore {
    /// Fetch a blob, `None` when absent
    fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a blob under a key, replacing any previous value
    fn set_blob(&self, key: &str, data: &[u8]) -> Result<()>;
}
