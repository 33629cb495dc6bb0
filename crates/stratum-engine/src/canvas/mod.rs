//! Immediate-mode drawing context.
//!
//! A [`Canvas`] borrows a [`GpuContext`] for the duration of a frame (or a
//! part of one) and layers drawing state on top: pen, brush, font, text
//! colours, background mode, translation and clip. Every operation checks
//! that state first and returns without touching the GPU when there is
//! nothing to draw.
//!
//! Blending is not implied by translucent colours; wrap the canvas in a
//! [`ScopeBlend`](crate::gpu::scope::ScopeBlend) for that.

mod bitmap;
mod shapes;
mod text;

use crate::coords::{Angle, PixelPoint, PixelRect, PixelSize, Vec2};
use crate::geometry::line_to_triangles;
use crate::gpu::scope::{GpuScope, ScopeRotateShift, ScopeScissor};
use crate::gpu::{Backend, GpuContext, Primitive, ProgramKind, Uniform, UniformValue};
use crate::paint::{Brush, Color, Pen};
use crate::text::{Font, GlyphCache};

/// Whether text is drawn over a filled box.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum BackgroundMode {
    #[default]
    Transparent,
    Opaque,
}

pub struct Canvas<'a, B: Backend> {
    ctx: &'a mut GpuContext<B>,
    glyphs: Option<&'a mut dyn GlyphCache<B>>,

    size: PixelSize,
    offset: PixelPoint,
    clip: Option<PixelRect>,

    pen: Pen,
    brush: Brush,
    font: Option<Font>,
    text_color: Color,
    background_color: Color,
    background_mode: BackgroundMode,
}

impl<'a, B: Backend> Canvas<'a, B> {
    /// A canvas covering the context's whole viewport.
    pub fn new(ctx: &'a mut GpuContext<B>) -> Self {
        let size = ctx.viewport();
        let offset = ctx.translate();
        Self {
            ctx,
            glyphs: None,
            size,
            offset,
            clip: None,
            pen: Pen::NULL,
            brush: Brush::Hollow,
            font: None,
            text_color: Color::BLACK,
            background_color: Color::WHITE,
            background_mode: BackgroundMode::Transparent,
        }
    }

    /// Attaches the cache text is measured and rendered through.
    pub fn with_glyphs(mut self, glyphs: &'a mut dyn GlyphCache<B>) -> Self {
        self.glyphs = Some(glyphs);
        self
    }

    // ── geometry ─────────────────────────────────────────────────────────

    #[inline]
    pub fn size(&self) -> PixelSize {
        self.size
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.size.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.size.height
    }

    #[inline]
    pub fn rect(&self) -> PixelRect {
        PixelRect::from_size(self.size)
    }

    /// Offset of this canvas' origin on the surface.
    #[inline]
    pub fn offset(&self) -> PixelPoint {
        self.offset
    }

    /// Current clip rectangle in canvas coordinates, if any.
    #[inline]
    pub fn clip(&self) -> Option<PixelRect> {
        self.clip
    }

    // ── state ────────────────────────────────────────────────────────────

    #[inline]
    pub fn pen(&self) -> Pen {
        self.pen
    }

    #[inline]
    pub fn brush(&self) -> Brush {
        self.brush
    }

    #[inline]
    pub fn font(&self) -> Option<Font> {
        self.font
    }

    #[inline]
    pub fn text_color(&self) -> Color {
        self.text_color
    }

    #[inline]
    pub fn background_mode(&self) -> BackgroundMode {
        self.background_mode
    }

    #[inline]
    pub fn select_pen(&mut self, pen: Pen) {
        self.pen = pen;
    }

    #[inline]
    pub fn select_null_pen(&mut self) {
        self.pen = Pen::NULL;
    }

    #[inline]
    pub fn select_white_pen(&mut self) {
        self.pen = Pen::new(1, Color::WHITE);
    }

    #[inline]
    pub fn select_black_pen(&mut self) {
        self.pen = Pen::new(1, Color::BLACK);
    }

    #[inline]
    pub fn select_brush(&mut self, brush: Brush) {
        self.brush = brush;
    }

    #[inline]
    pub fn select_hollow_brush(&mut self) {
        self.brush = Brush::Hollow;
    }

    #[inline]
    pub fn select_white_brush(&mut self) {
        self.brush = Brush::solid(Color::WHITE);
    }

    #[inline]
    pub fn select_black_brush(&mut self) {
        self.brush = Brush::solid(Color::BLACK);
    }

    #[inline]
    pub fn select_font(&mut self, font: Font) {
        self.font = Some(font);
    }

    #[inline]
    pub fn set_text_color(&mut self, color: Color) {
        self.text_color = color;
    }

    #[inline]
    pub fn set_background_color(&mut self, color: Color) {
        self.background_color = color;
    }

    #[inline]
    pub fn set_background_mode(&mut self, mode: BackgroundMode) {
        self.background_mode = mode;
    }

    #[inline]
    pub fn set_background_transparent(&mut self) {
        self.background_mode = BackgroundMode::Transparent;
    }

    #[inline]
    pub fn set_background_opaque(&mut self) {
        self.background_mode = BackgroundMode::Opaque;
    }

    /// Whether shapes get an outline on top of their fill.
    #[inline]
    pub fn is_pen_over_brush(&self) -> bool {
        self.pen.is_defined()
    }

    // ── scopes ───────────────────────────────────────────────────────────

    /// Runs `f` with drawing restricted to `rect` (canvas coordinates),
    /// intersected with the surface and any enclosing clip.
    pub fn clipped<R>(&mut self, rect: PixelRect, f: impl FnOnce(&mut Self) -> R) -> R {
        let outer = self.clip;
        let clip = outer.unwrap_or(self.rect()).intersect(rect).unwrap_or_default();

        self.clip = Some(clip);
        let out = {
            let mut scissor = ScopeScissor::new(self, clip);
            f(&mut *scissor)
        };
        self.clip = outer;

        if let Some(outer) = outer {
            self.ctx.scissor(outer);
        }
        out
    }

    /// Runs `f` on the sub-area `rect`: coordinates inside are relative to
    /// its top-left corner and drawing is clipped to it.
    pub fn translated<R>(&mut self, rect: PixelRect, f: impl FnOnce(&mut Self) -> R) -> R {
        let rect = rect.normalized();
        let (offset, size, clip) = (self.offset, self.size, self.clip);

        self.offset = offset + rect.top_left();
        self.size = rect.size();
        self.clip = clip.map(|c| c.offset(-rect.left, -rect.top));
        self.ctx.set_translate(self.offset);

        let out = self.clipped(PixelRect::from_size(rect.size()), f);

        self.offset = offset;
        self.size = size;
        self.clip = clip;
        self.ctx.set_translate(offset);
        out
    }

    /// Runs `f` with solid-colour geometry rotated by `angle`, scaled and
    /// moved to `origin`. Points inside are relative to `origin`.
    pub fn with_rotate_shift<R>(
        &mut self,
        origin: PixelPoint,
        angle: Angle,
        scale: f32,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let mut guard = ScopeRotateShift::new(self, origin, angle, scale);
        f(&mut *guard)
    }

    // ── internal drawing helpers ─────────────────────────────────────────

    pub(crate) fn use_solid(&mut self, color: Color) {
        self.ctx.set_color(ProgramKind::Solid, color);
        self.ctx.use_program(ProgramKind::Solid);
    }

    /// Selects the program for pen strokes. Dashed pens measure dash phase
    /// from `start`.
    fn bind_pen(&mut self, start: Vec2) {
        let pen = self.pen;
        match pen.dash_pattern() {
            None => self.use_solid(pen.color()),
            Some((period, ratio)) => {
                let ndc = self.ctx.to_ndc(start);
                let ctx = &mut *self.ctx;
                ctx.set_color(ProgramKind::Dashed, pen.color());
                ctx.set_uniform(ProgramKind::Dashed, Uniform::DashPeriod, UniformValue::Float(period));
                ctx.set_uniform(ProgramKind::Dashed, Uniform::DashRatio, UniformValue::Float(ratio));
                ctx.set_uniform(ProgramKind::Dashed, Uniform::DashStart, UniformValue::Vec2([ndc.x, ndc.y]));
                ctx.use_program(ProgramKind::Dashed);
            }
        }
    }

    /// Strokes `points` (pixel centres) with the current pen. Thin pens use
    /// line primitives, thicker ones a triangle strip.
    pub(crate) fn stroke(&mut self, points: &[Vec2], closed: bool, extend_caps: bool) {
        let pen = self.pen;
        if !pen.is_defined() || points.len() < 2 {
            return;
        }

        self.bind_pen(points[0]);
        if pen.is_thin() {
            let primitive = if closed { Primitive::LineLoop } else { Primitive::LineStrip };
            self.ctx.line_width(pen.width() as f32);
            self.ctx.draw(primitive, points);
        } else {
            let strip = line_to_triangles(points, pen.width() as f32, closed, extend_caps);
            self.ctx.draw(Primitive::TriangleStrip, &strip);
        }
    }

    /// Fills a triangle list over `positions` with the brush colour.
    pub(crate) fn fill_indexed(&mut self, positions: &[Vec2], indices: &[u16]) {
        let Some(color) = self.brush.color() else {
            return;
        };
        if indices.is_empty() {
            return;
        }
        self.use_solid(color);
        self.ctx
            .draw_elements(Primitive::Triangles, crate::gpu::VertexSource::positions(positions), indices);
    }
}

impl<B: Backend> GpuScope for Canvas<'_, B> {
    type Backend = B;

    #[inline]
    fn gpu(&mut self) -> &mut GpuContext<B> {
        self.ctx
    }
}

#[inline]
pub(crate) fn exact(points: &[PixelPoint]) -> Vec<Vec2> {
    points.iter().map(|p| p.to_exact_vec2()).collect()
}

#[inline]
pub(crate) fn corners(points: &[PixelPoint]) -> Vec<Vec2> {
    points.iter().map(|p| p.to_vec2()).collect()
}
