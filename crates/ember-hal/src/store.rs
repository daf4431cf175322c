//! Blob store implementations

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::traits::BlobStore;

/// File-backed blob store: one file per key under a base directory
pub struct FileBlobStore {
    base: PathBuf,
}

impl FileBlobStore {
    /// Open (and create if needed) a blob store rooted at `base`
    pub fn new(base: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.base.join(format!("{}.bin", key))
    }
}

impl BlobStore for FileBlobStore {
    fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.blob_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read(path)?))
    }

    fn set_blob(&self, key: &str, data: &[u8]) -> Result<()> {
        std::fs::write(self.blob_path(key), data)?;
        Ok(())
    }
}

/// In-memory blob store for tests; clones share contents
#[derive(Clone, Default)]
pub struct MemBlobStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemBlobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemBlobStore {
    fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let blobs = self.blobs.lock().expect("store lock poisoned");
        Ok(blobs.get(key).cloned())
    }

    fn set_blob(&self, key: &str, data: &[u8]) -> Result<()> {
        let mut blobs = self.blobs.lock().expect("store lock poisoned");
        blobs.insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::new(dir.path().join("blobs")).unwrap();

        assert_eq!(store.get_blob("attest").unwrap(), None);

        store.set_blob("attest", &[7u8; 64]).unwrap();
        assert_eq!(store.get_blob("attest").unwrap(), Some(vec![7u8; 64]));

        // Overwrite replaces
        store.set_blob("attest", &[9u8; 64]).unwrap();
        assert_eq!(store.get_blob("attest").unwrap(), Some(vec![9u8; 64]));
    }

    #[test]
    fn test_mem_store_shared_clones() {
        let store = MemBlobStore::new();
        let other = store.clone();
        store.set_blob("pubkey-n", &[1, 2, 3]).unwrap();
        assert_eq!(other.get_blob("pubkey-n").unwrap(), Some(vec![1, 2, 3]));
    }
}
