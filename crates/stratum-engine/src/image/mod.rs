//! Decoded images and the bitmaps built from them.

mod bitmap;
mod decode;

pub use bitmap::Bitmap;
pub use decode::{decode_bytes, decode_path};

use crate::coords::PixelSize;

/// Pixel layout of an [`UncompressedImage`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImageFormat {
    Invalid,
    Gray,
    Rgb,
    Rgba,
}

impl ImageFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            ImageFormat::Invalid => 0,
            ImageFormat::Gray => 1,
            ImageFormat::Rgb => 3,
            ImageFormat::Rgba => 4,
        }
    }
}

/// A decoded image in host memory.
///
/// Rows are `pitch` bytes apart and may carry padding. `flipped` images
/// store the bottom row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncompressedImage {
    format: ImageFormat,
    pitch: usize,
    size: PixelSize,
    data: Vec<u8>,
    flipped: bool,
}

impl UncompressedImage {
    /// Wraps raw pixels. Inconsistent dimensions yield the invalid image.
    pub fn new(format: ImageFormat, size: PixelSize, pitch: usize, data: Vec<u8>) -> Self {
        let row = size.width as usize * format.bytes_per_pixel();
        let rows = size.height as usize;
        let needed = if rows == 0 { 0 } else { pitch * (rows - 1) + row };
        if format == ImageFormat::Invalid || size.is_empty() || pitch < row || data.len() < needed {
            return Self::invalid();
        }
        Self { format, pitch, size, data, flipped: false }
    }

    /// The sentinel returned for every decode failure.
    pub fn invalid() -> Self {
        Self {
            format: ImageFormat::Invalid,
            pitch: 0,
            size: PixelSize::default(),
            data: Vec::new(),
            flipped: false,
        }
    }

    pub fn with_flipped(mut self, flipped: bool) -> Self {
        self.flipped = flipped;
        self
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.format != ImageFormat::Invalid
    }

    #[inline]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    #[inline]
    pub fn size(&self) -> PixelSize {
        self.size
    }

    #[inline]
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    #[inline]
    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixel rows with the padding removed.
    pub fn packed_rows(&self) -> Vec<u8> {
        let row = self.size.width as usize * self.format.bytes_per_pixel();
        if row == self.pitch {
            return self.data[..row * self.size.height as usize].to_vec();
        }
        self.data
            .chunks(self.pitch)
            .take(self.size.height as usize)
            .flat_map(|r| &r[..row])
            .copied()
            .collect()
    }
}
