use super::BlobStore;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Vec<u8>,
    content_type: String,
}

/// Process-local store for tests. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<String, StoredBlob>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        let blobs = self.blobs.read().unwrap_or_else(|e| e.into_inner());
        blobs.get(key).map(|b| b.content_type.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        let blobs = self.blobs.read().unwrap_or_else(|e| e.into_inner());
        blobs.contains_key(key)
    }

    /// Deletes a blob behind the back of whoever wrote it.
    pub fn remove(&self, key: &str) -> bool {
        let mut blobs = self.blobs.write().unwrap_or_else(|e| e.into_inner());
        blobs.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        let blobs = self.blobs.read().unwrap_or_else(|e| e.into_inner());
        blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryStore {
    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        let mut blobs = self.blobs.write().unwrap_or_else(|e| e.into_inner());
        blobs.insert(
            key.to_string(),
            StoredBlob {
                data: data.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let blobs = self.blobs.read().unwrap_or_else(|e| e.into_inner());
        blobs
            .get(key)
            .map(|b| b.data.clone())
            .ok_or_else(|| Error::NotFound {
                key: key.to_string(),
            })
    }
}
