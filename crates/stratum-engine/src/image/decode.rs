use std::path::Path;

use image::{DynamicImage, ImageReader};

use crate::coords::PixelSize;

use super::{ImageFormat, UncompressedImage};

/// Decodes PNG, JPEG, BMP or GIF data. Failures return
/// [`UncompressedImage::invalid`].
pub fn decode_bytes(bytes: &[u8]) -> UncompressedImage {
    match image::load_from_memory(bytes) {
        Ok(img) => from_dynamic(img),
        Err(e) => {
            log::debug!("image decode failed: {e}");
            UncompressedImage::invalid()
        }
    }
}

/// Reads and decodes an image file. Failures return
/// [`UncompressedImage::invalid`].
pub fn decode_path(path: impl AsRef<Path>) -> UncompressedImage {
    let path = path.as_ref();
    let decoded = ImageReader::open(path)
        .map_err(image::ImageError::from)
        .and_then(|r| r.with_guessed_format().map_err(image::ImageError::from))
        .and_then(|r| r.decode());
    match decoded {
        Ok(img) => from_dynamic(img),
        Err(e) => {
            log::debug!("image decode failed for {}: {e}", path.display());
            UncompressedImage::invalid()
        }
    }
}

fn from_dynamic(img: DynamicImage) -> UncompressedImage {
    let size = PixelSize::new(img.width(), img.height());
    let (format, data) = match img {
        DynamicImage::ImageLuma8(buf) => (ImageFormat::Gray, buf.into_raw()),
        DynamicImage::ImageRgb8(buf) => (ImageFormat::Rgb, buf.into_raw()),
        other if !other.color().has_alpha() && other.color().channel_count() >= 3 => {
            (ImageFormat::Rgb, other.into_rgb8().into_raw())
        }
        other if !other.color().has_color() && !other.color().has_alpha() => {
            (ImageFormat::Gray, other.into_luma8().into_raw())
        }
        other => (ImageFormat::Rgba, other.into_rgba8().into_raw()),
    };
    let pitch = size.width as usize * format.bytes_per_pixel();
    UncompressedImage::new(format, size, pitch, data)
}
