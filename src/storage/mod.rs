mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{Error, Result};
use std::sync::Arc;

/// Key/value object storage for photo originals and their variants.
///
/// `get` on a key that was never written (or was removed out of band) must
/// fail with [`Error::NotFound`]. `put` overwrites whatever is stored under
/// the key.
pub trait BlobStore: Send + Sync {
    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()>;

    fn get(&self, key: &str) -> Result<Vec<u8>>;
}

impl<S: BlobStore + ?Sized> BlobStore for Arc<S> {
    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        (**self).put(key, data, content_type)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        (**self).get(key)
    }
}

pub fn open(config: &StorageConfig) -> Arc<dyn BlobStore> {
    match config.backend {
        StorageBackend::Filesystem => Arc::new(FsStore::new(&config.root, &config.bucket)),
    }
}

/// Keys end up as file names, so anything that could escape the bucket is
/// refused.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty()
        || key.contains("..")
        || key.contains('/')
        || key.contains('\\')
        || key.contains('\0')
    {
        return Err(Error::InvalidKey(key.to_string()));
    }
    Ok(())
}
