use crate::coords::PixelSize;
use crate::gpu::software::SoftwareBackend;
use crate::gpu::{GpuContext, GpuError};
use crate::image::{ImageFormat, UncompressedImage};

use super::SurfaceProvider;

/// Headless surface backed by the software rasterizer.
///
/// The framebuffer persists between frames, so a frame that does not clear
/// draws over the previous one.
pub struct OffscreenSurface {
    ctx: GpuContext<SoftwareBackend>,
    size: PixelSize,
    frames: u64,
}

impl OffscreenSurface {
    pub fn new(size: PixelSize) -> Result<Self, GpuError> {
        let ctx = GpuContext::new(SoftwareBackend::new(size), size)?;
        Ok(Self { ctx, size, frames: 0 })
    }

    /// Changes the native size; the framebuffer is reallocated on the next
    /// acquire.
    #[inline]
    pub fn resize(&mut self, size: PixelSize) {
        self.size = size;
    }

    #[inline]
    pub fn backend(&self) -> &SoftwareBackend {
        self.ctx.backend()
    }

    #[inline]
    pub fn frames_presented(&self) -> u64 {
        self.frames
    }

    /// Copies the framebuffer into an RGBA image.
    pub fn snapshot(&self) -> UncompressedImage {
        let backend = self.ctx.backend();
        let size = backend.size();
        let data: Vec<u8> = backend.pixels().iter().flatten().copied().collect();
        UncompressedImage::new(ImageFormat::Rgba, size, size.width as usize * 4, data)
    }
}

impl SurfaceProvider for OffscreenSurface {
    type Backend = SoftwareBackend;

    #[inline]
    fn native_size(&self) -> PixelSize {
        self.size
    }

    fn acquire_drawable(&mut self, size: PixelSize) -> bool {
        if self.ctx.backend().size() != size {
            self.ctx.backend_mut().resize(size);
        }
        true
    }

    #[inline]
    fn context(&mut self) -> &mut GpuContext<SoftwareBackend> {
        &mut self.ctx
    }

    fn present(&mut self) {
        self.frames += 1;
        log::trace!("offscreen frame {} presented", self.frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::Color;
    use crate::surface::draw_frame;

    #[test]
    fn snapshot_matches_framebuffer() {
        let mut surface = OffscreenSurface::new(PixelSize::new(3, 2)).unwrap();
        draw_frame(&mut surface, None, |canvas| canvas.clear(Color::BLUE));
        let image = surface.snapshot();
        assert!(image.is_valid());
        assert_eq!(image.size(), PixelSize::new(3, 2));
        assert_eq!(&image.data()[..4], &Color::BLUE.to_array());
    }

    #[test]
    fn framebuffer_persists_between_frames() {
        let mut surface = OffscreenSurface::new(PixelSize::new(4, 4)).unwrap();
        draw_frame(&mut surface, None, |canvas| canvas.clear(Color::GREEN));
        draw_frame(&mut surface, None, |_| {});
        assert_eq!(surface.backend().pixel(1, 1), Color::GREEN);
        assert_eq!(surface.frames_presented(), 2);
    }
}
