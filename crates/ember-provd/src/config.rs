//! Daemon configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use ember_core::DEFAULT_KEY_BITS;

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvdConfig {
    /// RSA modulus size in bits for this deployment
    pub key_bits: usize,

    /// Directory backing the persistent blob store
    pub blob_store_path: PathBuf,

    /// Fuse key slot receiving the HSM wrapping key at BURN
    pub attest_key_slot: u8,

    /// Whether to run in development mode (in-memory blob store)
    pub dev_mode: bool,
}

impl Default for ProvdConfig {
    fn default() -> Self {
        Self {
            key_bits: DEFAULT_KEY_BITS,
            blob_store_path: Self::default_blob_store_path(),
            attest_key_slot: 2,
            dev_mode: false,
        }
    }
}

impl ProvdConfig {
    fn default_blob_store_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("/var/lib"))
            .join("ember")
            .join("nvs")
    }

    /// Load configuration from file
    pub fn load(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &std::path::Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create directories if they don't exist
    pub fn ensure_directories(&self) -> crate::Result<()> {
        std::fs::create_dir_all(&self.blob_store_path)?;
        Ok(())
    }
}

/// Helper module for dirs crate functionality
mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/share"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provd.json");

        let mut config = ProvdConfig::default();
        config.key_bits = 512;
        config.dev_mode = true;
        config.save(&path).unwrap();

        let loaded = ProvdConfig::load(&path).unwrap();
        assert_eq!(loaded.key_bits, 512);
        assert!(loaded.dev_mode);
        assert_eq!(loaded.attest_key_slot, 2);
    }

    #[test]
    fn test_default_key_bits() {
        assert_eq!(ProvdConfig::default().key_bits, DEFAULT_KEY_BITS);
    }
}
