use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::coords::PixelSize;
use crate::gpu::GpuContext;
use crate::gpu::wgpu_backend::WgpuBackend;
use crate::surface::SurfaceProvider;

use super::gpu::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};

/// A window's swapchain driven through the canvas.
///
/// Owns the [`Gpu`] bound to the window and a [`GpuContext`] over the wgpu
/// recorder. Each presented frame replays the recording into the acquired
/// surface texture.
pub struct WindowSurface<'w> {
    gpu: Gpu<'w>,
    ctx: GpuContext<WgpuBackend>,
    frame: Option<GpuFrame>,
    surface_error: Option<SurfaceErrorAction>,
}

impl<'w> WindowSurface<'w> {
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let gpu = Gpu::new(window, init).await?;
        let backend = WgpuBackend::new(gpu.surface_format(), &gpu.limits());
        let size = gpu.size();
        let ctx = GpuContext::new(backend, size).context("failed to link canvas programs")?;

        log::info!(
            "window surface ready: {}x{} {:?}",
            size.width,
            size.height,
            gpu.surface_format()
        );
        Ok(Self { gpu, ctx, frame: None, surface_error: None })
    }

    #[inline]
    pub fn gpu(&self) -> &Gpu<'w> {
        &self.gpu
    }

    /// Reconfigures the swapchain; the canvas viewport follows on the next
    /// frame.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.gpu.resize(PixelSize::new(size.width, size.height));
    }

    /// The action taken for the last failed acquire, if any.
    #[inline]
    pub fn take_surface_error(&mut self) -> Option<SurfaceErrorAction> {
        self.surface_error.take()
    }
}

impl SurfaceProvider for WindowSurface<'_> {
    type Backend = WgpuBackend;

    #[inline]
    fn native_size(&self) -> PixelSize {
        self.gpu.size()
    }

    fn acquire_drawable(&mut self, _size: PixelSize) -> bool {
        match self.gpu.begin_frame() {
            Ok(frame) => {
                self.frame = Some(frame);
                true
            }
            Err(err) => {
                let action = self.gpu.handle_surface_error(err);
                if action == SurfaceErrorAction::Fatal {
                    log::error!("surface lost beyond recovery");
                } else {
                    log::debug!("surface acquire failed: {action:?}");
                }
                self.surface_error = Some(action);
                false
            }
        }
    }

    #[inline]
    fn context(&mut self) -> &mut GpuContext<WgpuBackend> {
        &mut self.ctx
    }

    fn present(&mut self) {
        let Some(mut frame) = self.frame.take() else {
            log::warn!("present without an acquired drawable");
            return;
        };
        self.ctx.backend_mut().render(
            self.gpu.device(),
            self.gpu.queue(),
            &mut frame.encoder,
            &frame.view,
            frame.size,
        );
        self.gpu.submit(frame);
    }
}
