use crate::error::{Result, SmartSafeError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// Content store for telemetry records, keyed by object name with `/`
/// separated prefixes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<()>;
}

/// Directory-backed object store
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<()> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        debug!("Storing object {} ({} bytes)", key, body.len());
        fs::write(&path, body).await?;
        Ok(())
    }
}

/// In-memory object store for tests, with readback
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_puts: Mutex<bool>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }

    /// Make subsequent puts fail, for persistence-failure tests
    pub fn set_fail_puts(&self, fail: bool) {
        *self.fail_puts.lock() = fail;
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<()> {
        if *self.fail_puts.lock() {
            return Err(SmartSafeError::Upload {
                key: key.to_string(),
                details: "simulated persistence failure".to_string(),
            });
        }
        self.objects.lock().insert(key.to_string(), body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_fs_store_writes_with_prefix() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        store
            .put_object("raw_data/smartsafe_raw_1000.json", b"{}".to_vec())
            .await
            .unwrap();

        let stored = dir.path().join("raw_data/smartsafe_raw_1000.json");
        assert_eq!(fs::read(&stored).await.unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip_and_failure() {
        let store = MemoryObjectStore::new();
        store.put_object("k", b"v".to_vec()).await.unwrap();
        assert_eq!(store.get("k").unwrap(), b"v");

        store.set_fail_puts(true);
        assert!(store.put_object("k2", Vec::new()).await.is_err());
        assert_eq!(store.len(), 1);
    }
}
