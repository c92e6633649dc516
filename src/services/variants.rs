//! Retrieval of a photo's original and derived variants.
//!
//! A variant is derived at most once per photo: the first request for it
//! fetches the original, runs the transform, stores the result under the
//! variant's key and flips the photo's state to `Computed`. Later requests
//! read the stored blob directly. None of this is locked; two concurrent
//! first requests both derive and both write the same key, which is harmless
//! because derivation is deterministic and `put` overwrites. Callers that want
//! a single derivation go through [`crate::services::library::PhotoLibrary`].

use super::image::ImageTransform;
use crate::error::Result;
use crate::models::{Photo, Variant};
use crate::storage::BlobStore;

pub fn set_content(photo: &Photo, store: &dyn BlobStore, data: &[u8]) -> Result<()> {
    store.put(&photo.key(), data, &photo.mime_type)
}

pub fn get_original(photo: &Photo, store: &dyn BlobStore) -> Result<Vec<u8>> {
    store.get(&photo.key())
}

pub fn get_thumbnail(
    photo: &mut Photo,
    store: &dyn BlobStore,
    transform: &dyn ImageTransform,
    max_side: u32,
) -> Result<Vec<u8>> {
    get_variant(photo, store, Variant::Thumbnail, |original, mime_type| {
        transform.thumbnail(original, mime_type, max_side)
    })
}

pub fn get_resized(
    photo: &mut Photo,
    store: &dyn BlobStore,
    transform: &dyn ImageTransform,
    target: (u32, u32),
) -> Result<Vec<u8>> {
    get_variant(photo, store, Variant::Resized, |original, mime_type| {
        transform.resize(original, mime_type, target)
    })
}

fn get_variant<F>(
    photo: &mut Photo,
    store: &dyn BlobStore,
    variant: Variant,
    derive: F,
) -> Result<Vec<u8>>
where
    F: FnOnce(&[u8], &str) -> Result<Vec<u8>>,
{
    let key = photo.variant_key(variant);

    // A computed variant whose blob has gone missing is reported as missing,
    // never silently rebuilt.
    if photo.state(variant).is_computed() {
        tracing::debug!("Serving cached {} for photo {}", variant, photo.id);
        return store.get(&key);
    }

    let original = get_original(photo, store)?;
    let data = derive(&original, &photo.mime_type)?;
    store.put(&key, &data, &photo.mime_type)?;
    photo.mark_computed(variant);

    tracing::info!(
        "Derived {} for photo {} ({} bytes)",
        variant,
        photo.id,
        data.len()
    );
    Ok(data)
}
