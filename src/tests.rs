#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::services::image::{encode, ImageTransform, RasterTransform};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        encode(&gradient(width, height), format, 85).unwrap()
    }

    #[derive(Default)]
    struct CountingTransform {
        inner: RasterTransform,
        calls: AtomicUsize,
    }

    impl CountingTransform {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ImageTransform for CountingTransform {
        fn thumbnail(&self, original: &[u8], mime_type: &str, max_side: u32) -> crate::Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.thumbnail(original, mime_type, max_side)
        }

        fn resize(&self, original: &[u8], mime_type: &str, target: (u32, u32)) -> crate::Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.resize(original, mime_type, target)
        }
    }

    fn temp_root() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("photos-test-{:016x}", rand::random::<u64>()))
    }

    mod imaging_tests {
        use super::*;
        use crate::services::image::{
            bounded_resize, crop_box, decode, oriented_box, square_crop, thumbnail, CropBox,
        };
        use image::GenericImageView;

        #[test]
        fn test_square_crop_landscape() {
            let img = square_crop(gradient(300, 200));
            assert_eq!(img.dimensions(), (200, 200));
        }

        #[test]
        fn test_square_crop_portrait() {
            let img = square_crop(gradient(200, 300));
            assert_eq!(img.dimensions(), (200, 200));
        }

        #[test]
        fn test_square_crop_leaves_square_untouched() {
            let original = gradient(64, 64);
            let cropped = square_crop(original.clone());
            assert_eq!(cropped.dimensions(), (64, 64));
            assert_eq!(cropped.as_bytes(), original.as_bytes());
            assert_eq!(crop_box(64, 64), None);
        }

        #[test]
        fn test_crop_box_odd_excess() {
            assert_eq!(
                crop_box(5, 4),
                Some(CropBox {
                    x: 0,
                    y: 0,
                    width: 4,
                    height: 4
                })
            );
            assert_eq!(
                crop_box(4, 5),
                Some(CropBox {
                    x: 0,
                    y: 0,
                    width: 4,
                    height: 4
                })
            );
        }

        #[test]
        fn test_crop_trims_more_from_the_end() {
            // excess 3: one column off the left, two off the right
            assert_eq!(
                crop_box(7, 4),
                Some(CropBox {
                    x: 1,
                    y: 0,
                    width: 4,
                    height: 4
                })
            );

            let cropped = square_crop(gradient(7, 4));
            assert_eq!(cropped.dimensions(), (4, 4));
            assert_eq!(cropped.to_rgb8().get_pixel(0, 0)[0], 1);
            assert_eq!(cropped.to_rgb8().get_pixel(3, 0)[0], 4);
        }

        #[test]
        fn test_crop_box_even_excess_is_centred() {
            assert_eq!(
                crop_box(200, 300),
                Some(CropBox {
                    x: 0,
                    y: 50,
                    width: 200,
                    height: 200
                })
            );
        }

        #[test]
        fn test_thumbnail_crops_then_shrinks() {
            let img = thumbnail(gradient(800, 600), 220);
            assert_eq!(img.dimensions(), (220, 220));
        }

        #[test]
        fn test_thumbnail_never_upscales() {
            let img = thumbnail(gradient(100, 60), 220);
            assert_eq!(img.dimensions(), (60, 60));
        }

        #[test]
        fn test_oriented_box_matches_image_orientation() {
            assert_eq!(oriented_box((800, 600), (360, 480)), (480, 360));
            assert_eq!(oriented_box((800, 600), (480, 360)), (480, 360));
            assert_eq!(oriented_box((600, 800), (480, 360)), (360, 480));
            assert_eq!(oriented_box((600, 800), (360, 480)), (360, 480));
        }

        #[test]
        fn test_bounded_resize_portrait_target_on_landscape_image() {
            let img = bounded_resize(gradient(800, 600), (360, 480));
            assert_eq!(img.dimensions(), (480, 360));
        }

        #[test]
        fn test_bounded_resize_preserves_aspect_ratio() {
            let img = bounded_resize(gradient(1000, 500), (480, 360));
            assert_eq!(img.dimensions(), (480, 240));

            let img = bounded_resize(gradient(500, 1000), (480, 360));
            assert_eq!(img.dimensions(), (240, 480));
        }

        #[test]
        fn test_bounded_resize_never_upscales() {
            let img = bounded_resize(gradient(100, 100), (480, 360));
            assert_eq!(img.dimensions(), (100, 100));
        }

        #[test]
        fn test_decode_empty_input() {
            let err = decode(&[], "image/png").unwrap_err();
            assert!(matches!(err, Error::Decode(_)));
        }

        #[test]
        fn test_decode_garbage() {
            let err = decode(b"definitely not a png", "image/png").unwrap_err();
            assert!(matches!(err, Error::Decode(_)));
        }

        #[test]
        fn test_decode_guesses_format_for_unknown_mime() {
            let data = encoded(10, 8, ImageFormat::Png);
            let (img, format) = decode(&data, "application/octet-stream").unwrap();
            assert_eq!(format, ImageFormat::Png);
            assert_eq!(img.dimensions(), (10, 8));
        }

        #[test]
        fn test_raster_transform_keeps_format() {
            let transform = RasterTransform::default();

            let jpeg = encoded(300, 200, ImageFormat::Jpeg);
            let thumb = transform.thumbnail(&jpeg, "image/jpeg", 100).unwrap();
            assert_eq!(image::guess_format(&thumb).unwrap(), ImageFormat::Jpeg);
            let (img, _) = decode(&thumb, "image/jpeg").unwrap();
            assert_eq!(img.dimensions(), (100, 100));

            let png = encoded(800, 600, ImageFormat::Png);
            let resized = transform.resize(&png, "image/png", (360, 480)).unwrap();
            assert_eq!(image::guess_format(&resized).unwrap(), ImageFormat::Png);
            let (img, _) = decode(&resized, "image/png").unwrap();
            assert_eq!(img.dimensions(), (480, 360));
        }

        #[test]
        fn test_raster_transform_is_deterministic() {
            let transform = RasterTransform::default();
            let png = encoded(320, 240, ImageFormat::Png);
            let a = transform.thumbnail(&png, "image/png", 50).unwrap();
            let b = transform.thumbnail(&png, "image/png", 50).unwrap();
            assert_eq!(a, b);
        }
    }

    mod photo_model_tests {
        use crate::error::Error;
        use crate::models::{NewPhoto, Photo, Size, Variant, VariantState, MAX_COMMENT_LENGTH};

        fn photo(id: &str, mime_type: &str) -> Photo {
            Photo::new(
                id.to_string(),
                NewPhoto {
                    mime_type: mime_type.to_string(),
                    ..Default::default()
                },
            )
            .unwrap()
        }

        #[test]
        fn test_keys_for_image_mime() {
            let p = photo("ab3F9", "image/png");
            assert_eq!(p.ext(), "png");
            assert_eq!(p.key(), "ab3F9.png");
            assert_eq!(p.variant_key(Variant::Thumbnail), "ab3F9.thumbnail.png");
            assert_eq!(p.variant_key(Variant::Resized), "ab3F9.resized.png");
        }

        #[test]
        fn test_keys_for_non_image_mime() {
            let p = photo("ab3F9", "application/pdf");
            assert_eq!(p.ext(), "ext");
            assert_eq!(p.key(), "ab3F9.ext");
            assert_eq!(p.variant_key(Variant::Thumbnail), "ab3F9.thumbnail.ext");
        }

        #[test]
        fn test_mime_type_is_lowercased() {
            let p = photo("ab3F9", "IMAGE/JPEG");
            assert_eq!(p.mime_type, "image/jpeg");
            assert_eq!(p.key(), "ab3F9.jpeg");
        }

        #[test]
        fn test_new_photo_defaults() {
            let p = photo("ab3F9", "image/gif");
            assert_eq!(p.thumbnail, VariantState::NotComputed);
            assert_eq!(p.resized, VariantState::NotComputed);
            assert!(p.published);
            assert_eq!(p.comment, "");
        }

        #[test]
        fn test_comment_length_limit() {
            let ok = NewPhoto {
                mime_type: "image/png".to_string(),
                comment: "é".repeat(MAX_COMMENT_LENGTH),
                ..Default::default()
            };
            assert!(Photo::new("aaaaa".to_string(), ok).is_ok());

            let too_long = NewPhoto {
                mime_type: "image/png".to_string(),
                comment: "x".repeat(MAX_COMMENT_LENGTH + 1),
                ..Default::default()
            };
            let err = Photo::new("aaaaa".to_string(), too_long).unwrap_err();
            assert!(matches!(err, Error::CommentTooLong { len: 141, max: 140 }));
        }

        #[test]
        fn test_variant_states_are_independent() {
            let mut p = photo("ab3F9", "image/png");
            p.mark_computed(Variant::Thumbnail);
            assert!(p.state(Variant::Thumbnail).is_computed());
            assert!(!p.state(Variant::Resized).is_computed());

            p.mark_computed(Variant::Thumbnail);
            assert_eq!(p.thumbnail, VariantState::Computed);
        }

        #[test]
        fn test_size_discriminator() {
            assert_eq!("raw".parse::<Size>(), Ok(Size::Raw));
            assert_eq!("thumbnail".parse::<Size>(), Ok(Size::Thumbnail));
            assert_eq!("resized".parse::<Size>(), Ok(Size::Resized));
            assert!("original".parse::<Size>().is_err());
            assert!("RAW".parse::<Size>().is_err());
        }
    }

    mod allocator_tests {
        use crate::error::Error;
        use crate::services::ids::{IdAllocator, ID_LENGTH};
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        #[test]
        fn test_ids_are_short_alphanumerics() {
            let mut allocator = IdAllocator::new();
            for _ in 0..200 {
                let id = allocator.allocate(|_| Ok(false)).unwrap();
                assert_eq!(id.len(), ID_LENGTH);
                assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
            }
        }

        #[test]
        fn test_retries_until_free() {
            let mut allocator = IdAllocator::with_rng(StdRng::seed_from_u64(42));
            let mut seen = Vec::new();

            let id = allocator
                .allocate(|candidate| {
                    seen.push(candidate.to_string());
                    Ok(seen.len() < 3)
                })
                .unwrap();

            assert_eq!(seen.len(), 3);
            assert_eq!(id, seen[2]);
        }

        #[test]
        fn test_seeded_allocators_agree() {
            let mut a = IdAllocator::with_rng(StdRng::seed_from_u64(7));
            let mut b = IdAllocator::with_rng(StdRng::seed_from_u64(7));
            assert_eq!(a.candidate(), b.candidate());
            assert_eq!(a.allocate(|_| Ok(false)).unwrap(), b.candidate());
        }

        #[test]
        fn test_lookup_errors_propagate() {
            let mut allocator = IdAllocator::with_rng(StdRng::seed_from_u64(1));
            let err = allocator
                .allocate(|_| Err(Error::lookup("database is locked")))
                .unwrap_err();
            assert!(matches!(err, Error::Lookup(_)));
        }

        #[test]
        fn test_bounded_allocation_gives_up() {
            let mut allocator = IdAllocator::with_rng(StdRng::seed_from_u64(3)).with_max_attempts(3);
            let mut calls = 0;
            let err = allocator
                .allocate(|_| {
                    calls += 1;
                    Ok(true)
                })
                .unwrap_err();
            assert!(matches!(err, Error::AllocationExhausted { attempts: 3 }));
            assert_eq!(calls, 3);
        }
    }

    mod storage_tests {
        use super::temp_root;
        use crate::error::Error;
        use crate::storage::{BlobStore, FsStore, MemoryStore};

        #[test]
        fn test_memory_store_miss_is_not_found() {
            let store = MemoryStore::new();
            let err = store.get("nope.png").unwrap_err();
            assert!(matches!(err, Error::NotFound { ref key } if key == "nope.png"));
        }

        #[test]
        fn test_memory_store_put_overwrites() {
            let store = MemoryStore::new();
            store.put("a.png", b"one", "image/png").unwrap();
            store.put("a.png", b"two", "image/jpeg").unwrap();
            assert_eq!(store.get("a.png").unwrap(), b"two");
            assert_eq!(store.content_type("a.png").as_deref(), Some("image/jpeg"));
            assert_eq!(store.len(), 1);
        }

        #[test]
        fn test_memory_store_out_of_band_removal() {
            let store = MemoryStore::new();
            store.put("a.png", b"data", "image/png").unwrap();
            assert!(store.remove("a.png"));
            assert!(store.get("a.png").unwrap_err().is_not_found());
        }

        #[test]
        fn test_fs_store_provisions_bucket_lazily() {
            let root = temp_root();
            let store = FsStore::new(&root, "photos");
            assert!(!store.bucket_dir().exists());

            let err = store.get("missing.png").unwrap_err();
            assert!(matches!(err, Error::NotFound { .. }));
            assert!(store.bucket_dir().exists());

            std::fs::remove_dir_all(&root).ok();
        }

        #[test]
        fn test_fs_store_put_get() {
            let root = temp_root();
            let store = FsStore::new(&root, "photos");

            store.put("ab3F9.png", b"first", "image/png").unwrap();
            assert_eq!(store.get("ab3F9.png").unwrap(), b"first");
            assert_eq!(store.content_type("ab3F9.png").unwrap(), "image/png");

            store.put("ab3F9.png", b"second", "image/png").unwrap();
            assert_eq!(store.get("ab3F9.png").unwrap(), b"second");

            // A second handle on the same directory sees the same blobs.
            let reopened = FsStore::new(&root, "photos");
            assert_eq!(reopened.get("ab3F9.png").unwrap(), b"second");

            std::fs::remove_dir_all(&root).ok();
        }

        #[test]
        fn test_fs_store_rejects_escaping_keys() {
            let root = temp_root();
            let store = FsStore::new(&root, "photos");
            for key in ["../evil", "a/b.png", "", "a\\b"] {
                let err = store.put(key, b"x", "image/png").unwrap_err();
                assert!(matches!(err, Error::InvalidKey(_)), "key {:?}", key);
            }
            std::fs::remove_dir_all(&root).ok();
        }
    }

    mod variant_tests {
        use super::*;
        use crate::models::{NewPhoto, Photo, Variant, VariantState};
        use crate::services::image::decode;
        use crate::services::variants::{get_original, get_resized, get_thumbnail, set_content};
        use crate::storage::{BlobStore, MemoryStore};
        use image::GenericImageView;

        fn photo(mime_type: &str) -> Photo {
            Photo::new(
                "ab3F9".to_string(),
                NewPhoto {
                    mime_type: mime_type.to_string(),
                    ..Default::default()
                },
            )
            .unwrap()
        }

        fn stored_png(width: u32, height: u32) -> (Photo, MemoryStore) {
            let store = MemoryStore::new();
            let photo = photo("image/png");
            set_content(&photo, &store, &encoded(width, height, ImageFormat::Png)).unwrap();
            (photo, store)
        }

        #[test]
        fn test_get_original_missing_is_not_found() {
            let store = MemoryStore::new();
            let err = get_original(&photo("image/png"), &store).unwrap_err();
            assert!(matches!(err, Error::NotFound { ref key } if key == "ab3F9.png"));
        }

        #[test]
        fn test_set_content_records_mime_type() {
            let (photo, store) = stored_png(10, 10);
            assert_eq!(store.content_type(&photo.key()).as_deref(), Some("image/png"));
            assert!(!get_original(&photo, &store).unwrap().is_empty());
        }

        #[test]
        fn test_thumbnail_is_derived_once() {
            let (mut photo, store) = stored_png(400, 300);
            let transform = CountingTransform::default();

            let first = get_thumbnail(&mut photo, &store, &transform, 220).unwrap();
            assert_eq!(photo.thumbnail, VariantState::Computed);
            assert_eq!(transform.calls(), 1);

            let second = get_thumbnail(&mut photo, &store, &transform, 220).unwrap();
            assert_eq!(first, second);
            assert_eq!(transform.calls(), 1);

            assert_eq!(store.get("ab3F9.thumbnail.png").unwrap(), first);
            assert_eq!(
                store.content_type("ab3F9.thumbnail.png").as_deref(),
                Some("image/png")
            );
            let (img, _) = decode(&first, "image/png").unwrap();
            assert_eq!(img.dimensions(), (220, 220));
        }

        #[test]
        fn test_resized_is_derived_once() {
            let (mut photo, store) = stored_png(800, 600);
            let transform = CountingTransform::default();

            let first = get_resized(&mut photo, &store, &transform, (360, 480)).unwrap();
            let second = get_resized(&mut photo, &store, &transform, (360, 480)).unwrap();
            assert_eq!(first, second);
            assert_eq!(transform.calls(), 1);
            assert_eq!(photo.resized, VariantState::Computed);
            assert_eq!(photo.thumbnail, VariantState::NotComputed);

            let (img, _) = decode(&store.get("ab3F9.resized.png").unwrap(), "image/png").unwrap();
            assert_eq!(img.dimensions(), (480, 360));
        }

        #[test]
        fn test_computed_variant_with_missing_blob_is_not_rebuilt() {
            let (mut photo, store) = stored_png(100, 100);
            let transform = CountingTransform::default();

            get_thumbnail(&mut photo, &store, &transform, 50).unwrap();
            assert!(store.remove("ab3F9.thumbnail.png"));

            let err = get_thumbnail(&mut photo, &store, &transform, 50).unwrap_err();
            assert!(matches!(err, Error::NotFound { ref key } if key == "ab3F9.thumbnail.png"));
            assert_eq!(transform.calls(), 1);
            assert_eq!(photo.thumbnail, VariantState::Computed);
            assert!(!store.contains("ab3F9.thumbnail.png"));
        }

        #[test]
        fn test_missing_original_leaves_variant_not_computed() {
            let store = MemoryStore::new();
            let mut photo = photo("image/png");
            let transform = CountingTransform::default();

            let err = get_thumbnail(&mut photo, &store, &transform, 220).unwrap_err();
            assert!(err.is_not_found());
            assert_eq!(photo.thumbnail, VariantState::NotComputed);
            assert_eq!(transform.calls(), 0);
        }

        #[test]
        fn test_failed_derivation_is_retryable() {
            let store = MemoryStore::new();
            let mut photo = photo("image/png");
            let transform = RasterTransform::default();

            set_content(&photo, &store, b"broken upload").unwrap();
            let err = get_thumbnail(&mut photo, &store, &transform, 220).unwrap_err();
            assert!(matches!(err, Error::Decode(_)));
            assert_eq!(photo.thumbnail, VariantState::NotComputed);
            assert!(!store.contains("ab3F9.thumbnail.png"));

            set_content(&photo, &store, &encoded(300, 300, ImageFormat::Png)).unwrap();
            get_thumbnail(&mut photo, &store, &transform, 220).unwrap();
            assert_eq!(photo.thumbnail, VariantState::Computed);
        }

        #[test]
        fn test_concurrent_first_access_derives_twice_harmlessly() {
            // Without the library's lock both callers see NotComputed and both
            // derive; they write identical bytes to the same key.
            let (photo, store) = stored_png(640, 480);
            let transform = CountingTransform::default();

            let mut a = photo.clone();
            let mut b = photo;
            let from_a = get_thumbnail(&mut a, &store, &transform, 220).unwrap();
            let from_b = get_thumbnail(&mut b, &store, &transform, 220).unwrap();

            assert_eq!(transform.calls(), 2);
            assert_eq!(from_a, from_b);
            assert_eq!(store.get(&a.variant_key(Variant::Thumbnail)).unwrap(), from_a);
            assert_eq!(store.len(), 2);
        }

        #[test]
        fn test_non_image_mime_uses_fallback_keys() {
            let store = MemoryStore::new();
            let mut photo = photo("application/octet-stream");
            set_content(&photo, &store, &encoded(40, 20, ImageFormat::Png)).unwrap();
            assert!(store.contains("ab3F9.ext"));

            let transform = RasterTransform::default();
            get_thumbnail(&mut photo, &store, &transform, 10).unwrap();
            assert!(store.contains("ab3F9.thumbnail.ext"));
        }
    }

    mod config_tests {
        use crate::config::{parse_size, Config, StorageBackend};
        use std::path::Path;

        const MINIMAL: &str = r#"
[database]
path = "./data/photos.db"

[storage]
"#;

        #[test]
        fn test_minimal_config_uses_defaults() {
            let config = Config::parse(MINIMAL).unwrap();
            assert_eq!(config.server.port, 3000);
            assert_eq!(config.storage.backend, StorageBackend::Filesystem);
            assert_eq!(config.storage.bucket, "photos");
            assert_eq!(config.images.thumbnail_size, 220);
            assert_eq!(config.images.resized_box(), (480, 360));
            assert_eq!(config.images.per_page, 9);
            assert_eq!(config.images.max_upload_bytes().unwrap(), 10 * 1024 * 1024);
        }

        #[test]
        fn test_volatile_backend_rejected() {
            let toml = format!("{}backend = \"memory\"\n", MINIMAL);
            assert!(Config::parse(&toml).is_err());

            let toml = format!("{}backend = \"filesystem\"\n", MINIMAL);
            let config = Config::parse(&toml).unwrap();
            assert_eq!(config.storage.backend, StorageBackend::Filesystem);
        }

        #[test]
        fn test_load_resolves_paths_against_config_dir() {
            let dir = super::temp_root();
            std::fs::create_dir_all(&dir).unwrap();
            let config_path = dir.join("photos.toml");
            std::fs::write(&config_path, MINIMAL).unwrap();

            let config = Config::load(&config_path).unwrap();
            assert_eq!(
                Path::new(&config.database.path),
                dir.join("./data/photos.db")
            );
            assert_eq!(Path::new(&config.storage.root), dir.join("./data/blobs"));

            std::fs::remove_dir_all(&dir).ok();
        }

        #[test]
        fn test_resolve_keeps_absolute_and_memory_paths() {
            let mut config = Config::parse(
                "[database]\npath = \":memory:\"\n[storage]\nroot = \"/srv/blobs\"\n",
            )
            .unwrap();
            config.resolve_paths(Path::new("/etc/photos"));
            assert_eq!(config.database.path, ":memory:");
            assert_eq!(config.storage.root, "/srv/blobs");
        }

        #[test]
        fn test_invalid_values_rejected() {
            let bad_quality = format!("{}\n[images]\njpeg_quality = 0\n", MINIMAL);
            assert!(Config::parse(&bad_quality).is_err());

            let bad_thumb = format!("{}\n[images]\nthumbnail_size = 0\n", MINIMAL);
            assert!(Config::parse(&bad_thumb).is_err());

            let bad_bucket = MINIMAL.replace("[storage]", "[storage]\nbucket = \"../up\"");
            assert!(Config::parse(&bad_bucket).is_err());

            let bad_backend = format!("{}backend = \"s3\"\n", MINIMAL);
            assert!(Config::parse(&bad_backend).is_err());
        }

        #[test]
        fn test_parse_size() {
            assert_eq!(parse_size("10MB").unwrap(), 10 * 1024 * 1024);
            assert_eq!(parse_size("512kb").unwrap(), 512 * 1024);
            assert_eq!(parse_size("1GB").unwrap(), 1024 * 1024 * 1024);
            assert_eq!(parse_size("100").unwrap(), 100);
            assert_eq!(parse_size("100B").unwrap(), 100);
            assert!(parse_size("ten MB").is_err());
            assert!(parse_size("").is_err());
        }
    }
}
