use super::{validate_key, BlobStore};
use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

const OBJECTS_DIR: &str = "objects";
const META_DIR: &str = "meta";

/// Stores blobs as files under `<root>/<bucket>/objects`, with the content
/// type of each key kept next to it under `<root>/<bucket>/meta`.
///
/// The bucket directory is created on first use.
#[derive(Debug)]
pub struct FsStore {
    bucket_dir: PathBuf,
    provisioned: AtomicBool,
}

impl FsStore {
    pub fn new(root: impl AsRef<Path>, bucket: &str) -> Self {
        Self {
            bucket_dir: root.as_ref().join(bucket),
            provisioned: AtomicBool::new(false),
        }
    }

    pub fn bucket_dir(&self) -> &Path {
        &self.bucket_dir
    }

    pub fn content_type(&self, key: &str) -> Result<String> {
        validate_key(key)?;
        self.provision()?;
        read_file(&self.bucket_dir.join(META_DIR).join(key), key)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    fn provision(&self) -> Result<()> {
        if self.provisioned.load(Ordering::Acquire) {
            return Ok(());
        }

        for dir in [OBJECTS_DIR, META_DIR] {
            std::fs::create_dir_all(self.bucket_dir.join(dir)).map_err(Error::backend)?;
        }
        if !self.provisioned.swap(true, Ordering::AcqRel) {
            tracing::info!("Provisioned blob bucket at {}", self.bucket_dir.display());
        }
        Ok(())
    }
}

impl BlobStore for FsStore {
    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        validate_key(key)?;
        self.provision()?;

        write_atomic(&self.bucket_dir.join(META_DIR), key, content_type.as_bytes())?;
        write_atomic(&self.bucket_dir.join(OBJECTS_DIR), key, data)?;

        tracing::debug!("Stored blob {} ({} bytes)", key, data.len());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        self.provision()?;

        read_file(&self.bucket_dir.join(OBJECTS_DIR).join(key), key)
    }
}

fn read_file(path: &Path, key: &str) -> Result<Vec<u8>> {
    match std::fs::read(path) {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NotFound {
            key: key.to_string(),
        }),
        Err(e) => Err(Error::backend(e)),
    }
}

/// Writes through a uniquely named temporary file so readers never observe a
/// half-written blob and concurrent writers of one key cannot interleave.
fn write_atomic(dir: &Path, key: &str, data: &[u8]) -> Result<()> {
    let tmp = dir.join(format!(".{}.{:08x}.partial", key, rand::random::<u32>()));
    std::fs::write(&tmp, data).map_err(Error::backend)?;
    if let Err(e) = std::fs::rename(&tmp, dir.join(key)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(Error::backend(e));
    }
    Ok(())
}
