use std::path::Path;

use crate::coords::PixelSize;
use crate::gpu::{import_alpha_texture, import_texture, Backend, GpuContext, GpuTexture};

use super::{decode_bytes, decode_path, ImageFormat, UncompressedImage};

/// An image uploaded to the GPU, or nothing when loading failed.
#[derive(Debug, Default)]
pub struct Bitmap {
    texture: Option<GpuTexture>,
}

impl Bitmap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads `image`. Grayscale images become alpha masks when `mask` is
    /// set, for [`Canvas::stretch_mono`](crate::canvas::Canvas::stretch_mono).
    pub fn load<B: Backend>(&mut self, ctx: &mut GpuContext<B>, image: &UncompressedImage, mask: bool) -> bool {
        self.texture = if mask && image.format() == ImageFormat::Gray {
            import_alpha_texture(ctx, image)
        } else {
            import_texture(ctx, image)
        };
        self.is_defined()
    }

    pub fn load_bytes<B: Backend>(&mut self, ctx: &mut GpuContext<B>, bytes: &[u8]) -> bool {
        self.load(ctx, &decode_bytes(bytes), false)
    }

    pub fn load_file<B: Backend>(&mut self, ctx: &mut GpuContext<B>, path: impl AsRef<Path>) -> bool {
        self.load(ctx, &decode_path(path), false)
    }

    #[inline]
    pub fn is_defined(&self) -> bool {
        self.texture.is_some()
    }

    #[inline]
    pub fn size(&self) -> PixelSize {
        self.texture.as_ref().map(|t| t.size()).unwrap_or_default()
    }

    #[inline]
    pub fn texture(&self) -> Option<&GpuTexture> {
        self.texture.as_ref()
    }

    /// Drops the texture; its GPU object is released on the next call.
    pub fn reset(&mut self) {
        self.texture = None;
    }
}
