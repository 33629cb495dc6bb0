use std::time::{Duration, Instant};

use winit::window::Window;

use crate::canvas::Canvas;
use crate::coords::PixelSize;
use crate::device::{SurfaceErrorAction, WindowSurface};
use crate::gpu::wgpu_backend::WgpuBackend;
use crate::surface::{draw_frame, SurfaceProvider};
use crate::text::GlyphCache;

use super::app::AppControl;

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameTime {
    /// Monotonic frame counter, starting at zero.
    pub index: u64,
    /// Time since the runtime started.
    pub elapsed: Duration,
    /// Seconds since the previous frame, clamped to `[0.0001, 0.25]`.
    pub dt: f32,
}

/// Produces [`FrameTime`] snapshots for one window.
#[derive(Debug, Clone)]
pub(crate) struct FrameClock {
    start: Instant,
    last: Instant,
    index: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self { start: now, last: now, index: 0 }
    }

    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last).as_secs_f32().clamp(0.0001, 0.25);
        self.last = now;
        let time = FrameTime { index: self.index, elapsed: now - self.start, dt };
        self.index = self.index.wrapping_add(1);
        time
    }
}

/// Per-frame context passed to [`super::App::on_frame`].
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window borrow carried by the surface
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub surface: &'a mut WindowSurface<'w>,
    pub time: FrameTime,
}

impl FrameCtx<'_, '_> {
    /// Drawable size in physical pixels.
    #[inline]
    pub fn size(&self) -> PixelSize {
        self.surface.native_size()
    }

    /// Draws and presents one frame through a [`Canvas`].
    ///
    /// A skipped frame is not an error; a surface that cannot be recovered
    /// asks the runtime to exit.
    pub fn draw<F>(&mut self, glyphs: Option<&mut dyn GlyphCache<WgpuBackend>>, draw: F) -> AppControl
    where
        F: FnOnce(&mut Canvas<'_, WgpuBackend>),
    {
        self.window.pre_present_notify();
        if !draw_frame(&mut *self.surface, glyphs, draw)
            && self.surface.take_surface_error() == Some(SurfaceErrorAction::Fatal)
        {
            return AppControl::Exit;
        }
        AppControl::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_counts_frames() {
        let mut clock = FrameClock::new();
        let a = clock.tick();
        let b = clock.tick();
        assert_eq!((a.index, b.index), (0, 1));
        assert!(b.elapsed >= a.elapsed);
        assert!(b.dt >= 0.0001 && b.dt <= 0.25);
    }
}
