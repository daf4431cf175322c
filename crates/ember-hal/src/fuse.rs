//! In-memory fuse store with one-time-programmable semantics

use std::sync::{Arc, Mutex};

use ember_core::WRAP_KEY_LEN;

use crate::error::{HalError, Result};
use crate::traits::{FuseStore, KeyProtection, KeyPurpose, KeySlot};
use crate::{DEVICE_INFO_REGS, KEY_SLOTS};

#[derive(Clone)]
struct SlotEntry {
    purpose: KeyPurpose,
    key: [u8; WRAP_KEY_LEN],
    protection: KeyProtection,
}

struct Inner {
    regs: [u32; DEVICE_INFO_REGS],
    slots: [Option<SlotEntry>; KEY_SLOTS],
}

/// In-memory fuse store.
///
/// Models the register semantics the session depends on: bits can only be
/// set, never cleared, and a key slot accepts exactly one write. Cloning
/// shares the underlying registers, which lets a [`crate::SoftHsm`] read
/// the key slot the session burned.
#[derive(Clone)]
pub struct MemFuse {
    inner: Arc<Mutex<Inner>>,
}

impl MemFuse {
    /// Create a blank fuse block (all registers zero, all slots unused)
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                regs: [0; DEVICE_INFO_REGS],
                slots: std::array::from_fn(|_| None),
            })),
        }
    }

    /// Key material of a slot, for the soft HSM's internal use.
    ///
    /// Real hardware routes the slot to the signing engine without ever
    /// exposing it to firmware; this accessor is the soft equivalent of
    /// that internal path.
    pub(crate) fn slot_key(&self, slot: KeySlot) -> Result<[u8; WRAP_KEY_LEN]> {
        let inner = self.inner.lock().expect("fuse lock poisoned");
        inner.slots[slot.index()]
            .as_ref()
            .map(|entry| entry.key)
            .ok_or_else(|| HalError::Hsm(format!("key slot {} is empty", slot.index())))
    }

    /// Declared purpose of a burned slot, `None` when unused
    pub fn slot_purpose(&self, slot: KeySlot) -> Result<Option<KeyPurpose>> {
        let inner = self.inner.lock().expect("fuse lock poisoned");
        Ok(inner.slots[slot.index()].as_ref().map(|entry| entry.purpose))
    }
}

impl Default for MemFuse {
    fn default() -> Self {
        Self::new()
    }
}

impl FuseStore for MemFuse {
    fn read_reg(&self, reg: usize) -> Result<u32> {
        let inner = self.inner.lock().expect("fuse lock poisoned");
        inner
            .regs
            .get(reg)
            .copied()
            .ok_or_else(|| HalError::Fuse(format!("register {} out of range", reg)))
    }

    fn batch_write(&self, writes: &[(usize, u32)]) -> Result<()> {
        let mut inner = self.inner.lock().expect("fuse lock poisoned");

        // Validate the whole batch before touching anything: commit-or-abort.
        for &(reg, value) in writes {
            let current = *inner
                .regs
                .get(reg)
                .ok_or_else(|| HalError::Fuse(format!("register {} out of range", reg)))?;
            if current != 0 && (current | value) != value {
                return Err(HalError::Fuse(format!(
                    "register {} already burned with conflicting value {:#010x}",
                    reg, current
                )));
            }
        }

        for &(reg, value) in writes {
            inner.regs[reg] |= value;
        }
        Ok(())
    }

    fn write_key_slot(
        &self,
        slot: KeySlot,
        purpose: KeyPurpose,
        key: &[u8; WRAP_KEY_LEN],
    ) -> Result<()> {
        let mut inner = self.inner.lock().expect("fuse lock poisoned");
        let entry = &mut inner.slots[slot.index()];
        if entry.is_some() {
            return Err(HalError::Fuse(format!(
                "key slot {} already burned",
                slot.index()
            )));
        }
        *entry = Some(SlotEntry {
            purpose,
            key: *key,
            protection: KeyProtection::default(),
        });
        Ok(())
    }

    fn key_slot_unused(&self, slot: KeySlot) -> Result<bool> {
        let inner = self.inner.lock().expect("fuse lock poisoned");
        Ok(inner.slots[slot.index()].is_none())
    }

    fn key_slot_protection(&self, slot: KeySlot) -> Result<KeyProtection> {
        let inner = self.inner.lock().expect("fuse lock poisoned");
        Ok(inner.slots[slot.index()]
            .as_ref()
            .map(|entry| entry.protection)
            .unwrap_or_default())
    }

    fn read_key_block(&self, slot: KeySlot) -> Result<[u8; WRAP_KEY_LEN]> {
        let inner = self.inner.lock().expect("fuse lock poisoned");
        Ok(match inner.slots[slot.index()].as_ref() {
            Some(entry) if !entry.protection.read_disabled => entry.key,
            _ => [0u8; WRAP_KEY_LEN],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_write_sets_registers() {
        let fuse = MemFuse::new();
        fuse.batch_write(&[(0, 1), (1, 0x0101), (2, 42)]).unwrap();
        assert_eq!(fuse.read_reg(0).unwrap(), 1);
        assert_eq!(fuse.read_reg(1).unwrap(), 0x0101);
        assert_eq!(fuse.read_reg(2).unwrap(), 42);
        assert_eq!(fuse.read_reg(3).unwrap(), 0);
    }

    #[test]
    fn test_batch_write_conflict_aborts_whole_batch() {
        let fuse = MemFuse::new();
        fuse.batch_write(&[(1, 0x0f)]).unwrap();

        // Second batch conflicts on reg 1; reg 2 must stay untouched
        assert!(fuse.batch_write(&[(2, 7), (1, 0x30)]).is_err());
        assert_eq!(fuse.read_reg(2).unwrap(), 0);
        assert_eq!(fuse.read_reg(1).unwrap(), 0x0f);
    }

    #[test]
    fn test_key_slot_single_write() {
        let fuse = MemFuse::new();
        let slot = KeySlot::new(2).unwrap();
        assert!(fuse.key_slot_unused(slot).unwrap());

        fuse.write_key_slot(slot, KeyPurpose::HmacDownDigitalSignature, &[0xaa; 32])
            .unwrap();
        assert!(!fuse.key_slot_unused(slot).unwrap());
        assert_eq!(fuse.read_key_block(slot).unwrap(), [0xaa; 32]);

        let again = fuse.write_key_slot(slot, KeyPurpose::Hmac, &[0xbb; 32]);
        assert!(again.is_err());
        assert_eq!(
            fuse.slot_purpose(slot).unwrap(),
            Some(KeyPurpose::HmacDownDigitalSignature)
        );
    }

    #[test]
    fn test_clones_share_state() {
        let fuse = MemFuse::new();
        let other = fuse.clone();
        fuse.batch_write(&[(4, 0xdead_beef)]).unwrap();
        assert_eq!(other.read_reg(4).unwrap(), 0xdead_beef);
    }

    #[test]
    fn test_invalid_slot_rejected() {
        assert!(KeySlot::new(6).is_err());
        assert!(KeySlot::new(5).is_ok());
    }
}
