//! Ember HAL - Hardware collaborator boundary
//!
//! This crate defines the traits the provisioning session talks to:
//! - [`DsHsm`]: the digital-signature HSM (parameter wrapping + signing)
//! - [`FuseStore`]: one-time-programmable fuse registers and key slots
//! - [`BlobStore`]: the persistent blob key-value store
//!
//! plus in-process soft implementations ([`SoftHsm`], [`MemFuse`],
//! [`FileBlobStore`], [`MemBlobStore`]) used by tests and host-side dev
//! provisioning. The secure random source collaborator is `rand::RngCore`;
//! no extra trait is layered over it.
//!
//! Hardware failures surfaced here are fatal by design: fuse and store
//! operations are never retried automatically, because a partial retry
//! risks inconsistent one-time state.

pub mod error;
pub mod fuse;
pub mod soft;
pub mod store;
pub mod traits;

pub use error::{HalError, Result};
pub use fuse::MemFuse;
pub use soft::SoftHsm;
pub use store::{FileBlobStore, MemBlobStore};
pub use traits::{BlobStore, DsHsm, FuseStore, KeyProtection, KeyPurpose, KeySlot};

/// Number of 32-bit registers in the device-info fuse block.
pub const DEVICE_INFO_REGS: usize = 8;

/// Number of key slots in the fuse key array.
pub const KEY_SLOTS: usize = 6;
