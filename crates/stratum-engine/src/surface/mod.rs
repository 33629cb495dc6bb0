//! Drawable surfaces and the per-frame driver.
//!
//! A [`SurfaceProvider`] hands out a drawable of the current native size,
//! exposes the GPU context that draws into it and presents the result.
//! [`draw_frame`] ties one frame together: acquire, draw through a
//! [`Canvas`], present.

mod offscreen;

pub use offscreen::OffscreenSurface;

use crate::canvas::Canvas;
use crate::coords::PixelSize;
use crate::gpu::{Backend, GpuContext};
use crate::text::GlyphCache;

/// Something a frame can be drawn into.
pub trait SurfaceProvider {
    type Backend: Backend;

    /// Current drawable size. Zero when the platform surface is not ready.
    fn native_size(&self) -> PixelSize;

    /// Prepares a drawable of `size`. Returns `false` when no drawable can
    /// be had this frame; the frame is then skipped.
    fn acquire_drawable(&mut self, size: PixelSize) -> bool;

    fn context(&mut self) -> &mut GpuContext<Self::Backend>;

    /// Shows the drawable acquired last.
    fn present(&mut self);
}

/// Draws one frame into `surface`.
///
/// The viewport follows the surface size. Returns `false` when the frame
/// was skipped (zero size, or no drawable).
pub fn draw_frame<S, F>(
    surface: &mut S,
    glyphs: Option<&mut dyn GlyphCache<S::Backend>>,
    draw: F,
) -> bool
where
    S: SurfaceProvider,
    F: FnOnce(&mut Canvas<'_, S::Backend>),
{
    let size = surface.native_size();
    if size.is_empty() {
        log::trace!("frame skipped: surface not ready");
        return false;
    }
    if !surface.acquire_drawable(size) {
        log::debug!("frame skipped: no drawable");
        return false;
    }

    {
        let ctx = surface.context();
        if ctx.viewport() != size {
            log::debug!("viewport {}x{}", size.width, size.height);
            ctx.set_viewport(size);
        }

        let mut canvas = Canvas::new(ctx);
        if let Some(glyphs) = glyphs {
            canvas = canvas.with_glyphs(glyphs);
        }
        draw(&mut canvas);
    }

    surface.context().collect();
    surface.present();
    true
}
