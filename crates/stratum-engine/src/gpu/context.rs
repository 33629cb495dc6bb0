use crate::coords::{PixelPoint, PixelRect, PixelSize, Vec2};
use crate::paint::Color;

use super::program::Programs;
use super::release::{Release, ReleaseQueue};
use super::{
    Backend, BackendCaps, BlendFactor, Capability, ColorMask, GpuError, Primitive, ProgramKind,
    StencilFunc, StencilOp, Uniform, UniformValue, VertexSource,
};

/// Callback invoked for every GPU error, after it has been logged.
pub type ErrorObserver = Box<dyn FnMut(&'static str, &GpuError)>;

/// Owns a backend and funnels every call through error checking.
///
/// Also tracks the state the canvas layers on top: the current viewport,
/// the translation applied to all programs, enabled capabilities and the
/// deferred-release queue for resources that have been dropped.
pub struct GpuContext<B: Backend> {
    backend: B,
    caps: BackendCaps,
    programs: Programs,
    releases: ReleaseQueue,

    enabled: [bool; 3],
    viewport: PixelSize,
    translate: PixelPoint,

    error_count: u64,
    last_error: Option<GpuError>,
    observer: Option<ErrorObserver>,
}

impl<B: Backend> GpuContext<B> {
    /// Links all programs and sets the initial viewport.
    ///
    /// Fails if any program fails to link; nothing can be drawn without them.
    pub fn new(mut backend: B, viewport: PixelSize) -> Result<Self, GpuError> {
        let releases = ReleaseQueue::default();
        let programs = Programs::link_all(&mut backend, &releases)?;
        let caps = backend.caps();

        let mut ctx = Self {
            backend,
            caps,
            programs,
            releases,
            enabled: [false; 3],
            viewport: PixelSize::default(),
            translate: PixelPoint::default(),
            error_count: 0,
            last_error: None,
            observer: None,
        };
        ctx.set_viewport(viewport);
        ctx.set_translate(PixelPoint::default());

        log::debug!(
            "gpu context ready: {}x{}, caps {:?}",
            viewport.width,
            viewport.height,
            caps
        );
        Ok(ctx)
    }

    // ── checked calls ────────────────────────────────────────────────────

    /// Runs `f` against the backend, then drains and logs every error it
    /// raised. Pending resource releases are processed first.
    #[inline]
    pub fn call<R>(&mut self, op: &'static str, f: impl FnOnce(&mut B) -> R) -> R {
        if !self.releases.is_empty() {
            self.collect();
        }
        let out = f(&mut self.backend);
        self.check(op);
        out
    }

    fn check(&mut self, op: &'static str) {
        while let Some(err) = self.backend.take_error() {
            log::warn!("GPU error in {op}: {err}");
            self.error_count += 1;
            if let Some(observer) = self.observer.as_mut() {
                observer(op, &err);
            }
            self.last_error = Some(err);
        }
    }

    /// Deletes the backend objects of every dropped resource.
    pub fn collect(&mut self) {
        for release in self.releases.take() {
            match release {
                Release::Buffer(id) => {
                    self.backend.delete_buffer(id);
                    self.check("delete_buffer");
                }
                Release::Texture(id) => {
                    self.backend.delete_texture(id);
                    self.check("delete_texture");
                }
                Release::Program(id) => {
                    self.backend.delete_program(id);
                    self.check("delete_program");
                }
            }
        }
    }

    /// Releases programs and pending resources. The context is unusable
    /// for drawing afterwards; `Drop` calls this too.
    pub fn shutdown(&mut self) {
        if !self.programs.is_empty() {
            log::debug!("gpu context shutting down");
        }
        self.programs.clear();
        self.collect();
    }

    // ── accessors ────────────────────────────────────────────────────────

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Unchecked backend access. Errors raised here are picked up by the
    /// next checked call.
    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    pub fn caps(&self) -> BackendCaps {
        self.caps
    }

    #[inline]
    pub fn programs(&self) -> &Programs {
        &self.programs
    }

    #[inline]
    pub(crate) fn releases(&self) -> &ReleaseQueue {
        &self.releases
    }

    #[inline]
    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    #[inline]
    pub fn last_error(&self) -> Option<&GpuError> {
        self.last_error.as_ref()
    }

    pub fn set_error_observer(&mut self, observer: Option<ErrorObserver>) {
        self.observer = observer;
    }

    // ── viewport / translation ───────────────────────────────────────────

    #[inline]
    pub fn viewport(&self) -> PixelSize {
        self.viewport
    }

    pub fn set_viewport(&mut self, size: PixelSize) {
        self.viewport = size;
        self.call("viewport", |b| b.viewport(size));
    }

    #[inline]
    pub fn translate(&self) -> PixelPoint {
        self.translate
    }

    /// Sets the pixel offset applied to every program's vertices.
    pub fn set_translate(&mut self, offset: PixelPoint) {
        self.translate = offset;
        let value = UniformValue::Vec2([offset.x as f32, offset.y as f32]);
        let ids: Vec<_> = self.programs.iter().map(|p| p.id()).collect();
        for id in ids {
            self.call("uniform(translate)", |b| b.uniform(id, Uniform::Translate, value));
        }
    }

    /// Canvas position to normalized device coordinates (y up), including
    /// the current translation.
    #[inline]
    pub fn to_ndc(&self, p: Vec2) -> Vec2 {
        let w = self.viewport.width.max(1) as f32;
        let h = self.viewport.height.max(1) as f32;
        let x = p.x + self.translate.x as f32;
        let y = p.y + self.translate.y as f32;
        Vec2::new(x / w * 2.0 - 1.0, 1.0 - y / h * 2.0)
    }

    // ── programs ─────────────────────────────────────────────────────────

    pub fn use_program(&mut self, kind: ProgramKind) {
        let Some(id) = self.programs.get(kind).map(|p| p.id()) else {
            log::error!("{} program is not linked", kind.name());
            return;
        };
        self.call("use_program", |b| b.use_program(Some(id)));
    }

    pub fn set_uniform(&mut self, kind: ProgramKind, uniform: Uniform, value: UniformValue) {
        let Some(id) = self.programs.get(kind).map(|p| p.id()) else {
            return;
        };
        self.call("uniform", |b| b.uniform(id, uniform, value));
    }

    #[inline]
    pub fn set_color(&mut self, kind: ProgramKind, color: Color) {
        self.set_uniform(kind, Uniform::Color, UniformValue::Vec4(color.to_f32()));
    }

    // ── fixed-function state ─────────────────────────────────────────────

    #[inline]
    pub fn is_enabled(&self, cap: Capability) -> bool {
        self.enabled[cap.index()]
    }

    /// Only scope guards toggle capabilities, so enable/disable always pair.
    pub(crate) fn set_capability(&mut self, cap: Capability, enabled: bool) {
        self.enabled[cap.index()] = enabled;
        self.call("set_capability", |b| b.set_capability(cap, enabled));
    }

    pub fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.call("blend_func", |b| b.blend_func(src, dst));
    }

    pub fn blend_color(&mut self, color: [f32; 4]) {
        self.call("blend_color", |b| b.blend_color(color));
    }

    pub fn color_mask(&mut self, mask: ColorMask) {
        self.call("color_mask", |b| b.color_mask(mask));
    }

    pub fn stencil_func(&mut self, func: StencilFunc, reference: u8, mask: u8) {
        self.call("stencil_func", |b| b.stencil_func(func, reference, mask));
    }

    pub fn stencil_op(&mut self, fail: StencilOp, zfail: StencilOp, pass: StencilOp) {
        self.call("stencil_op", |b| b.stencil_op(fail, zfail, pass));
    }

    pub fn stencil_mask(&mut self, mask: u8) {
        self.call("stencil_mask", |b| b.stencil_mask(mask));
    }

    /// `rect` is in canvas coordinates; the current translation is applied.
    pub fn scissor(&mut self, rect: PixelRect) {
        let r = rect.offset(self.translate.x, self.translate.y);
        self.call("scissor", |b| b.scissor(r));
    }

    pub fn line_width(&mut self, width: f32) {
        self.call("line_width", |b| b.line_width(width));
    }

    pub fn clear_color(&mut self, color: Color) {
        self.call("clear(color)", |b| b.clear(Some(color.to_f32()), None));
    }

    pub fn clear_stencil(&mut self, value: u8) {
        self.call("clear(stencil)", |b| b.clear(None, Some(value)));
    }

    // ── draws ────────────────────────────────────────────────────────────

    pub fn draw_arrays(&mut self, primitive: Primitive, source: VertexSource<'_>, first: usize, count: usize) {
        if count == 0 {
            return;
        }
        self.call("draw_arrays", |b| b.draw_arrays(primitive, source, first, count));
    }

    pub fn draw_elements(&mut self, primitive: Primitive, source: VertexSource<'_>, indices: &[u16]) {
        if indices.is_empty() {
            return;
        }
        self.call("draw_elements", |b| b.draw_elements(primitive, source, indices));
    }

    /// Draws every vertex of `positions`.
    #[inline]
    pub fn draw(&mut self, primitive: Primitive, positions: &[Vec2]) {
        self.draw_arrays(primitive, VertexSource::positions(positions), 0, positions.len());
    }
}

impl<B: Backend> Drop for GpuContext<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::gpu::software::SoftwareBackend;
    use crate::gpu::{GpuBuffer, BufferTarget};

    fn ctx() -> GpuContext<SoftwareBackend> {
        crate::logging::init_test_logging();
        GpuContext::new(SoftwareBackend::new(PixelSize::new(16, 16)), PixelSize::new(16, 16)).unwrap()
    }

    // ── error checking ───────────────────────────────────────────────────

    #[test]
    fn injected_error_is_counted_and_kept() {
        let mut ctx = ctx();
        assert_eq!(ctx.error_count(), 0);

        ctx.backend_mut().inject_error(GpuError::OutOfMemory("test"));
        ctx.line_width(1.0);

        assert_eq!(ctx.error_count(), 1);
        assert_eq!(ctx.last_error(), Some(&GpuError::OutOfMemory("test")));
    }

    #[test]
    fn every_queued_error_is_drained() {
        let mut ctx = ctx();
        ctx.backend_mut().inject_error(GpuError::InvalidEnum("a"));
        ctx.backend_mut().inject_error(GpuError::InvalidValue("b"));
        ctx.line_width(1.0);
        assert_eq!(ctx.error_count(), 2);
        assert_eq!(ctx.last_error(), Some(&GpuError::InvalidValue("b")));
    }

    #[test]
    fn observer_sees_operation_name() {
        let mut ctx = ctx();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        ctx.set_error_observer(Some(Box::new(move |op, err| {
            sink.borrow_mut().push((op, err.clone()));
        })));

        ctx.backend_mut().inject_error(GpuError::InvalidOperation("x"));
        ctx.stencil_mask(0xff);

        assert_eq!(&*seen.borrow(), &[("stencil_mask", GpuError::InvalidOperation("x"))]);
    }

    #[test]
    fn draw_without_program_reports_error() {
        let mut ctx = ctx();
        ctx.call("use_program", |b| b.use_program(None));
        ctx.draw(Primitive::Triangles, &[Vec2::zero(); 3]);
        assert_eq!(ctx.error_count(), 1);
    }

    // ── lifetime ─────────────────────────────────────────────────────────

    #[test]
    fn programs_are_linked_once_each() {
        let ctx = ctx();
        assert_eq!(ctx.backend().live_programs(), ProgramKind::ALL.len());
    }

    #[test]
    fn dropped_buffer_is_deleted_on_next_call() {
        let mut ctx = ctx();
        let buffer = GpuBuffer::new(&mut ctx, BufferTarget::Array).unwrap();
        assert_eq!(ctx.backend().live_buffers(), 1);

        drop(buffer);
        assert_eq!(ctx.backend().live_buffers(), 1);

        ctx.line_width(1.0);
        assert_eq!(ctx.backend().live_buffers(), 0);
        assert_eq!(ctx.error_count(), 0);
    }

    #[test]
    fn shutdown_deletes_programs() {
        let mut ctx = ctx();
        ctx.shutdown();
        assert_eq!(ctx.backend().live_programs(), 0);
        assert_eq!(ctx.error_count(), 0);
    }

    #[test]
    fn random_resource_churn_releases_everything_once() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        use crate::gpu::{GpuTexture, PixelFormat};

        let mut ctx = ctx();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut buffers: Vec<GpuBuffer> = Vec::new();
        let mut textures: Vec<GpuTexture> = Vec::new();

        for _ in 0..2000 {
            match rng.random_range(0..6) {
                0 => buffers.extend(GpuBuffer::new(&mut ctx, BufferTarget::Array)),
                1 => {
                    let size = PixelSize::new(rng.random_range(1..20), rng.random_range(1..20));
                    textures.extend(GpuTexture::new(&mut ctx, PixelFormat::Rgba, size, None));
                }
                2 if !buffers.is_empty() => {
                    let i = rng.random_range(0..buffers.len());
                    buffers[i].bind(&mut ctx);
                    buffers[i].load(&mut ctx, &[1, 2, 3, 4]);
                    GpuBuffer::unbind(&mut ctx, BufferTarget::Array);
                }
                3 if !textures.is_empty() => {
                    let i = rng.random_range(0..textures.len());
                    textures[i].bind(&mut ctx);
                }
                4 if !buffers.is_empty() => {
                    let i = rng.random_range(0..buffers.len());
                    drop(buffers.swap_remove(i));
                }
                5 if !textures.is_empty() => {
                    let i = rng.random_range(0..textures.len());
                    drop(textures.swap_remove(i));
                }
                _ => {}
            }
        }

        drop(buffers);
        drop(textures);
        ctx.shutdown();

        let stats = ctx.backend().stats();
        assert!(stats.buffers_created > 0 && stats.textures_created > 0);
        assert_eq!(stats.buffers_created, stats.buffers_deleted);
        assert_eq!(stats.textures_created, stats.textures_deleted);
        assert_eq!(stats.programs_created, stats.programs_deleted);
        assert_eq!(ctx.error_count(), 0);
    }

    #[test]
    fn translate_reaches_every_program() {
        let mut ctx = ctx();
        ctx.set_translate(PixelPoint::new(3, 4));
        for p in ctx.programs().iter() {
            assert_eq!(ctx.backend().uniforms(p.id()).unwrap().translate, [3.0, 4.0]);
        }
    }

    #[test]
    fn ndc_includes_translation() {
        let mut ctx = ctx();
        assert_eq!(ctx.to_ndc(Vec2::new(0.0, 0.0)), Vec2::new(-1.0, 1.0));
        ctx.set_translate(PixelPoint::new(8, 8));
        assert_eq!(ctx.to_ndc(Vec2::new(0.0, 0.0)), Vec2::new(0.0, 0.0));
    }
}
