use crate::error::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

pub const DEFAULT_JPEG_QUALITY: u8 = 85;

const FILTER: FilterType = FilterType::Lanczos3;

/// Region kept by [`square_crop`], in pixels from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The centred square inside a `width × height` image, or `None` when the
/// image is already square. With an odd excess the end of the long axis
/// loses one pixel more than the start.
pub fn crop_box(width: u32, height: u32) -> Option<CropBox> {
    if width == height {
        return None;
    }

    let side = width.min(height);
    let half_excess = (width.max(height) - side) / 2;
    let (x, y) = if width > height {
        (half_excess, 0)
    } else {
        (0, half_excess)
    };

    Some(CropBox {
        x,
        y,
        width: side,
        height: side,
    })
}

pub fn square_crop(img: DynamicImage) -> DynamicImage {
    match crop_box(img.width(), img.height()) {
        Some(b) => img.crop_imm(b.x, b.y, b.width, b.height),
        None => img,
    }
}

pub fn thumbnail(img: DynamicImage, max_side: u32) -> DynamicImage {
    shrink_to_fit(square_crop(img), max_side, max_side)
}

/// Lines the target box's long side up with the image's long side.
pub fn oriented_box((width, height): (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (mut box_w, mut box_h) = target;
    if box_w < box_h {
        std::mem::swap(&mut box_w, &mut box_h);
    }
    if width < height {
        std::mem::swap(&mut box_w, &mut box_h);
    }
    (box_w, box_h)
}

pub fn bounded_resize(img: DynamicImage, target: (u32, u32)) -> DynamicImage {
    let (box_w, box_h) = oriented_box(img.dimensions(), target);
    shrink_to_fit(img, box_w, box_h)
}

/// Scales down to fit `max_width × max_height`, keeping the aspect ratio.
/// Images that already fit are returned untouched.
fn shrink_to_fit(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_width && height <= max_height {
        return img;
    }
    img.resize(max_width, max_height, FILTER)
}

pub fn format_for_mime(mime_type: &str) -> Option<ImageFormat> {
    ImageFormat::from_mime_type(mime_type)
}

/// Decodes `data` as the format named by `mime_type`, or as whatever format
/// the bytes announce when the MIME type is not an image type we know.
pub fn decode(data: &[u8], mime_type: &str) -> Result<(DynamicImage, ImageFormat)> {
    if data.is_empty() {
        return Err(Error::Decode("image data is empty".to_string()));
    }

    let format = match format_for_mime(mime_type) {
        Some(format) => format,
        None => image::guess_format(data).map_err(|e| Error::Decode(e.to_string()))?,
    };

    let img = image::load_from_memory_with_format(data, format)
        .map_err(|e| Error::Decode(e.to_string()))?;
    Ok((img, format))
}

pub fn encode(img: &DynamicImage, format: ImageFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());

    match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality);
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(encoder).map_err(Error::Encode)?;
        }
        _ => {
            img.write_to(&mut buffer, format).map_err(Error::Encode)?;
        }
    }

    Ok(buffer.into_inner())
}

/// Derivation of variant bytes from original bytes.
pub trait ImageTransform: Send + Sync {
    fn thumbnail(&self, original: &[u8], mime_type: &str, max_side: u32) -> Result<Vec<u8>>;

    fn resize(&self, original: &[u8], mime_type: &str, target: (u32, u32)) -> Result<Vec<u8>>;
}

/// Decodes with the `image` crate, transforms, and re-encodes in the
/// original's format.
#[derive(Debug, Clone, Copy)]
pub struct RasterTransform {
    pub jpeg_quality: u8,
}

impl Default for RasterTransform {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ImageTransform for RasterTransform {
    fn thumbnail(&self, original: &[u8], mime_type: &str, max_side: u32) -> Result<Vec<u8>> {
        let (img, format) = decode(original, mime_type)?;
        encode(&thumbnail(img, max_side), format, self.jpeg_quality)
    }

    fn resize(&self, original: &[u8], mime_type: &str, target: (u32, u32)) -> Result<Vec<u8>> {
        let (img, format) = decode(original, mime_type)?;
        encode(&bounded_resize(img, target), format, self.jpeg_quality)
    }
}
