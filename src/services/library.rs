use super::ids::IdAllocator;
use super::image::{ImageTransform, RasterTransform};
use super::{photos, variants};
use crate::config::{Config, ImageConfig};
use crate::error::Error;
use crate::models::{NewPhoto, Photo, Size, Variant};
use crate::storage::{self, BlobStore};
use crate::Database;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Per-(photo, variant) mutual exclusion for derivation.
#[derive(Debug, Default)]
pub struct VariantLocks {
    slots: Mutex<HashMap<(String, Variant), Arc<Mutex<()>>>>,
}

impl VariantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `(id, variant)`.
    pub fn run<T>(&self, id: &str, variant: Variant, f: impl FnOnce() -> T) -> T {
        let key = (id.to_string(), variant);
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.entry(key.clone()).or_default().clone()
        };

        let out = {
            let _guard = slot.lock().unwrap_or_else(|e| e.into_inner());
            f()
        };

        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        drop(slot);
        if slots.get(&key).is_some_and(|s| Arc::strong_count(s) == 1) {
            slots.remove(&key);
        }
        out
    }
}

/// Image bytes plus the content type to serve them with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Ties the photo records in the database to their blobs.
pub struct PhotoLibrary {
    db: Database,
    store: Arc<dyn BlobStore>,
    transform: Arc<dyn ImageTransform>,
    allocator: Mutex<IdAllocator>,
    locks: VariantLocks,
    sizes: ImageConfig,
}

impl PhotoLibrary {
    pub fn new(
        db: Database,
        store: Arc<dyn BlobStore>,
        transform: Arc<dyn ImageTransform>,
        sizes: ImageConfig,
    ) -> Self {
        Self {
            db,
            store,
            transform,
            allocator: Mutex::new(IdAllocator::new()),
            locks: VariantLocks::new(),
            sizes,
        }
    }

    /// Wires up the storage backend and raster transform named in `config`.
    pub fn from_config(config: &Config, db: Database) -> Self {
        let transform = Arc::new(RasterTransform {
            jpeg_quality: config.images.jpeg_quality,
        });
        Self::new(db, storage::open(&config.storage), transform, config.images.clone())
    }

    pub fn with_allocator(mut self, allocator: IdAllocator) -> Self {
        self.allocator = Mutex::new(allocator);
        self
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn sizes(&self) -> &ImageConfig {
        &self.sizes
    }

    /// Stores `data` as the original of a new photo and records it.
    pub fn upload(&self, new: NewPhoto, data: &[u8]) -> Result<Photo> {
        let max = self.sizes.max_upload_bytes()?;
        if data.len() > max {
            anyhow::bail!("File too large: {} bytes (max {} bytes)", data.len(), max);
        }

        let id = {
            let mut allocator = self.allocator.lock().unwrap_or_else(|e| e.into_inner());
            allocator.allocate(|candidate| {
                photos::photo_exists(&self.db, candidate).map_err(Error::lookup)
            })?
        };
        let photo = Photo::new(id, new)?;

        variants::set_content(&photo, self.store.as_ref(), data)?;
        photos::insert_photo(&self.db, &photo)?;

        tracing::info!(
            "Uploaded photo {} ({}, {} bytes)",
            photo.id,
            photo.mime_type,
            data.len()
        );
        Ok(photo)
    }

    pub fn photo(&self, id: &str) -> Result<Photo> {
        photos::get_photo_by_id(&self.db, id)?.ok_or_else(|| {
            Error::UnknownPhoto {
                id: id.to_string(),
            }
            .into()
        })
    }

    pub fn image(&self, id: &str, size: Size) -> Result<PhotoImage> {
        let photo = self.photo(id)?;
        let mime_type = photo.mime_type.clone();
        let data = match size {
            Size::Raw => variants::get_original(&photo, self.store.as_ref())?,
            Size::Thumbnail => self.variant(photo, Variant::Thumbnail)?,
            Size::Resized => self.variant(photo, Variant::Resized)?,
        };

        Ok(PhotoImage { data, mime_type })
    }

    fn variant(&self, mut photo: Photo, variant: Variant) -> Result<Vec<u8>> {
        if photo.state(variant).is_computed() {
            return Ok(self.derive(&mut photo, variant)?);
        }

        self.locks.run(&photo.id, variant, || {
            // Re-read: another request may have derived it while we waited.
            let mut current = self.photo(&photo.id)?;
            let computed_before = current.state(variant).is_computed();

            let data = self.derive(&mut current, variant)?;
            if !computed_before {
                photos::mark_variant_computed(&self.db, &current.id, variant)?;
            }
            Ok(data)
        })
    }

    fn derive(&self, photo: &mut Photo, variant: Variant) -> crate::error::Result<Vec<u8>> {
        let store = self.store.as_ref();
        let transform = self.transform.as_ref();
        match variant {
            Variant::Thumbnail => {
                variants::get_thumbnail(photo, store, transform, self.sizes.thumbnail_size)
            }
            Variant::Resized => {
                variants::get_resized(photo, store, transform, self.sizes.resized_box())
            }
        }
    }
}
