use crate::canvas::Canvas;
use crate::coords::PixelPoint;
use crate::gpu::scope::{GpuScope, ScopeBlend, ScopeColorMask, ScopeEnable};
use crate::gpu::{Backend, BlendFactor, Capability, StencilFunc, StencilOp};
use crate::paint::{Brush, Color, Pen};

use super::{
    FillMode, FillPolicy, RegionLook, RegionSettings, RegionShape, ShapeGeometry, FILL_MASK_BIT,
    OUTLINE_MASK_BIT,
};

const BOTH_BITS: u8 = FILL_MASK_BIT | OUTLINE_MASK_BIT;

/// One compositing pass over a set of regions.
///
/// In precise mode the stencil buffer is cleared on [`begin`] and the two
/// reserved bits are cleared again when the pass is finished or dropped.
/// The canvas pen and brush are restored at the end as well.
///
/// [`begin`]: RegionPass::begin
pub struct RegionPass<'c, 'a, B: Backend> {
    canvas: &'c mut Canvas<'a, B>,
    settings: RegionSettings,
    look: RegionLook,
    saved: (Pen, Brush),
    drawn: usize,
}

impl<'c, 'a, B: Backend> RegionPass<'c, 'a, B> {
    pub fn begin(canvas: &'c mut Canvas<'a, B>, settings: RegionSettings, look: RegionLook) -> Self {
        let saved = (canvas.pen(), canvas.brush());
        let gpu = canvas.gpu();
        if settings.is_precise() {
            gpu.stencil_mask(0xff);
            gpu.clear_stencil(0);
        }
        gpu.blend_func(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);

        Self { canvas, settings, look, saved, drawn: 0 }
    }

    #[inline]
    pub fn settings(&self) -> RegionSettings {
        self.settings
    }

    /// Fills and outlines one region. Regions drawn later never paint over
    /// outlines drawn earlier in the same pass.
    pub fn draw_shape(&mut self, shape: &RegionShape) {
        if !shape.is_drawable() {
            return;
        }
        if self.settings.is_precise() {
            self.draw_precise(shape);
        } else {
            self.draw_cheap(shape);
        }
        self.drawn += 1;
    }

    /// Ends the pass. Dropping it has the same effect.
    pub fn finish(self) {}

    // ── cheap renderer ───────────────────────────────────────────────────

    fn draw_cheap(&mut self, shape: &RegionShape) {
        let canvas = &mut *self.canvas;

        if self.settings.fill_mode == FillMode::All {
            canvas.select_brush(Brush::solid(shape.fill_color.with_alpha(self.look.cheap_fill_alpha)));
            canvas.select_null_pen();
            let mut blend = ScopeBlend::alpha(&mut *canvas);
            draw_geometry(&mut *blend, &shape.geometry);
        }

        if select_outline(canvas, &self.settings, shape) {
            draw_geometry(canvas, &shape.geometry);
        }
    }

    // ── precise renderer ─────────────────────────────────────────────────

    fn draw_precise(&mut self, shape: &RegionShape) {
        let look = self.look;
        let canvas = &mut *self.canvas;

        if shape.fill != FillPolicy::None {
            let fill = shape.fill_color.with_alpha(look.fill_alpha);
            let whole = shape.selected || shape.fill == FillPolicy::Always;
            let mut stencil = ScopeEnable::new(&mut *canvas, Capability::StencilTest);

            match &shape.geometry {
                &ShapeGeometry::Circle { center, radius } => {
                    let gpu = stencil.gpu();
                    gpu.stencil_func(StencilFunc::Equal, 0, OUTLINE_MASK_BIT);
                    gpu.stencil_op(StencilOp::Keep, StencilOp::Keep, StencilOp::Keep);

                    let band_radius = if whole || look.thick_pen_width >= 2 * radius {
                        stencil.select_brush(Brush::solid(fill));
                        stencil.select_null_pen();
                        radius
                    } else {
                        // Band [r - 3t/4, r - t/4]: half the thick pen, set in from the rim.
                        stencil.select_hollow_brush();
                        stencil.select_pen(Pen::new(look.thick_pen_width / 2, fill));
                        radius.saturating_sub(look.thick_pen_width / 4)
                    };
                    let mut blend = ScopeBlend::alpha(&mut *stencil);
                    blend.draw_circle(center, band_radius);
                }
                ShapeGeometry::Polygon(points) => {
                    if !whole {
                        stamp_fill_mask(&mut *stencil, points, look.thick_pen_width, StencilOp::Replace);
                    }

                    let gpu = stencil.gpu();
                    if whole {
                        gpu.stencil_func(StencilFunc::Equal, 0, OUTLINE_MASK_BIT);
                    } else {
                        gpu.stencil_func(StencilFunc::Equal, FILL_MASK_BIT, BOTH_BITS);
                    }
                    gpu.stencil_op(StencilOp::Keep, StencilOp::Keep, StencilOp::Keep);
                    stencil.select_brush(Brush::solid(fill));
                    stencil.select_null_pen();
                    {
                        let mut blend = ScopeBlend::alpha(&mut *stencil);
                        blend.draw_polygon(points);
                    }

                    if !whole {
                        stamp_fill_mask(&mut *stencil, points, look.thick_pen_width, StencilOp::Zero);
                    }
                }
            }
        }

        if select_outline(canvas, &self.settings, shape) {
            let mut stencil = ScopeEnable::new(&mut *canvas, Capability::StencilTest);
            let gpu = stencil.gpu();
            gpu.stencil_func(StencilFunc::Always, BOTH_BITS, BOTH_BITS);
            gpu.stencil_mask(OUTLINE_MASK_BIT);
            gpu.stencil_op(StencilOp::Keep, StencilOp::Keep, StencilOp::Replace);
            draw_geometry(&mut *stencil, &shape.geometry);
        }
    }
}

impl<B: Backend> Drop for RegionPass<'_, '_, B> {
    fn drop(&mut self) {
        if self.settings.is_precise() {
            let gpu = self.canvas.gpu();
            gpu.stencil_mask(BOTH_BITS);
            gpu.clear_stencil(0);
            gpu.stencil_mask(0xff);
        }
        let (pen, brush) = self.saved;
        self.canvas.select_pen(pen);
        self.canvas.select_brush(brush);
        log::trace!("region pass done: {} shapes, {:?}", self.drawn, self.settings.fill_mode);
    }
}

/// Composites every visible shape in one pass.
pub fn draw_regions<'s, B: Backend>(
    canvas: &mut Canvas<'_, B>,
    settings: RegionSettings,
    look: RegionLook,
    shapes: impl IntoIterator<Item = &'s RegionShape>,
    mut visible: impl FnMut(&RegionShape) -> bool,
) {
    let mut pass = RegionPass::begin(canvas, settings, look);
    for shape in shapes {
        if visible(shape) {
            pass.draw_shape(shape);
        }
    }
    pass.finish();
}

fn draw_geometry<B: Backend>(canvas: &mut Canvas<'_, B>, geometry: &ShapeGeometry) {
    match geometry {
        ShapeGeometry::Circle { center, radius } => canvas.draw_circle(*center, *radius),
        ShapeGeometry::Polygon(points) => canvas.draw_polygon(points),
    }
}

/// Selects the outline pen, or returns `false` when no outline is drawn.
fn select_outline<B: Backend>(canvas: &mut Canvas<'_, B>, settings: &RegionSettings, shape: &RegionShape) -> bool {
    let pen = if settings.black_outline {
        Pen::new(1, Color::BLACK)
    } else if shape.outline.width == 0 {
        return false;
    } else {
        Pen::new(shape.outline.width, shape.outline.color)
    };
    canvas.select_pen(pen);
    canvas.select_hollow_brush();
    true
}

/// Sets (`Replace`) or clears (`Zero`) the fill-mask bit under a thick
/// stroke along the polygon, without touching colour.
fn stamp_fill_mask<B: Backend>(canvas: &mut Canvas<'_, B>, points: &[PixelPoint], width: u32, op: StencilOp) {
    let mut mask = ScopeColorMask::none(canvas);
    let gpu = mask.gpu();
    gpu.stencil_func(StencilFunc::Always, BOTH_BITS, BOTH_BITS);
    gpu.stencil_mask(FILL_MASK_BIT);
    gpu.stencil_op(StencilOp::Keep, StencilOp::Keep, op);
    mask.select_hollow_brush();
    mask.select_pen(Pen::new(width, Color::BLACK));
    mask.draw_polygon(points);
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::coords::PixelSize;
    use crate::gpu::software::SoftwareBackend;
    use crate::gpu::GpuContext;

    fn ctx(w: u32, h: u32) -> GpuContext<SoftwareBackend> {
        GpuContext::new(SoftwareBackend::new(PixelSize::new(w, h)), PixelSize::new(w, h)).unwrap()
    }

    fn px(ctx: &GpuContext<SoftwareBackend>, x: i32, y: i32) -> Color {
        ctx.backend().pixel(x, y)
    }

    /// Straight-alpha "over", rounded like the framebuffer.
    fn over(dst: Color, src: Color) -> Color {
        let (s, d) = (src.to_f32(), dst.to_f32());
        let a = s[3];
        let ch = |i: usize| ((s[i] * a + d[i] * (1.0 - a)).clamp(0.0, 1.0) * 255.0).round() as u8;
        Color::new(ch(0), ch(1), ch(2), ch(3))
    }

    fn square(l: i32, t: i32, r: i32, b: i32) -> Vec<PixelPoint> {
        vec![PixelPoint::new(l, t), PixelPoint::new(r, t), PixelPoint::new(r, b), PixelPoint::new(l, b)]
    }

    fn stencil_is_clear(ctx: &GpuContext<SoftwareBackend>) -> bool {
        ctx.backend().stencil_buffer().iter().all(|&s| s == 0)
    }

    // ── precise ──────────────────────────────────────────────────────────

    #[test]
    fn overlapping_circles_keep_outlines_and_blend_each_fill_once() {
        let mut ctx = ctx(140, 100);
        let a = RegionShape::circle(PixelPoint::new(50, 50), 30)
            .with_fill(FillPolicy::IfSelected, Color::RED)
            .with_outline(2, Color::BLACK);
        let b = RegionShape::circle(PixelPoint::new(90, 50), 30)
            .with_fill(FillPolicy::IfSelected, Color::BLUE)
            .with_outline(2, Color::BLACK);

        {
            let mut canvas = Canvas::new(&mut ctx);
            draw_regions(&mut canvas, RegionSettings::default(), RegionLook::default(), [&a, &b], |_| true);
        }

        let red = Color::RED.with_alpha(90);
        let blue = Color::BLUE.with_alpha(90);

        // Band of A only.
        assert_eq!(px(&ctx, 23, 50), over(Color::TRANSPARENT, red));
        // Lens where both bands meet: each fill exactly once.
        assert_eq!(px(&ctx, 70, 33), over(over(Color::TRANSPARENT, red), blue));
        // Inside both circles but outside both bands.
        assert_eq!(px(&ctx, 70, 50), Color::TRANSPARENT);
        // A's outline crossing B's band survives B's later fill.
        assert_eq!(px(&ctx, 72, 31), Color::BLACK);
        // B's outline crossing A's band.
        assert_eq!(px(&ctx, 68, 31), Color::BLACK);
        // Plain outline pixels.
        assert_eq!(px(&ctx, 50, 21), Color::BLACK);
        assert_eq!(px(&ctx, 119, 50), Color::BLACK);

        assert!(stencil_is_clear(&ctx));
    }

    #[test]
    fn selected_circle_is_filled_whole() {
        let mut ctx = ctx(64, 64);
        let shape = RegionShape::circle(PixelPoint::new(32, 32), 20)
            .with_fill(FillPolicy::IfSelected, Color::GREEN)
            .with_selected(true);
        {
            let mut canvas = Canvas::new(&mut ctx);
            draw_regions(&mut canvas, RegionSettings::default(), RegionLook::default(), [&shape], |_| true);
        }
        assert_eq!(px(&ctx, 32, 32), over(Color::TRANSPARENT, Color::GREEN.with_alpha(90)));
    }

    #[test]
    fn circle_band_is_set_in_from_the_rim() {
        let mut ctx = ctx(100, 100);
        let shape = RegionShape::circle(PixelPoint::new(50, 50), 30).with_fill(FillPolicy::IfSelected, Color::RED);
        {
            let mut canvas = Canvas::new(&mut ctx);
            draw_regions(&mut canvas, RegionSettings::default(), RegionLook::default(), [&shape], |_| true);
        }
        // Thick pen 10: the band spans radii 23 to 28.
        let red = over(Color::TRANSPARENT, Color::RED.with_alpha(90));
        assert_eq!(px(&ctx, 75, 50), red);
        assert_eq!(px(&ctx, 50, 26), red);
        assert_eq!(px(&ctx, 79, 50), Color::TRANSPARENT);
        assert_eq!(px(&ctx, 71, 50), Color::TRANSPARENT);
        assert!(stencil_is_clear(&ctx));
    }

    #[test]
    fn polygon_band_leaves_interior_empty() {
        let mut ctx = ctx(100, 100);
        let shape = RegionShape::polygon(square(10, 10, 90, 90)).with_fill(FillPolicy::IfSelected, Color::RED);
        {
            let mut canvas = Canvas::new(&mut ctx);
            draw_regions(&mut canvas, RegionSettings::default(), RegionLook::default(), [&shape], |_| true);
        }
        let red = over(Color::TRANSPARENT, Color::RED.with_alpha(90));
        assert_eq!(px(&ctx, 12, 50), red);
        assert_eq!(px(&ctx, 50, 87), red);
        assert_eq!(px(&ctx, 50, 50), Color::TRANSPARENT);
        // Nothing outside the polygon, even under the thick stroke.
        assert_eq!(px(&ctx, 7, 50), Color::TRANSPARENT);
        assert!(stencil_is_clear(&ctx));
    }

    #[test]
    fn later_fill_does_not_cover_earlier_outline() {
        let mut ctx = ctx(100, 100);
        let first = RegionShape::polygon(square(10, 10, 50, 50))
            .with_fill(FillPolicy::None, Color::RED)
            .with_outline(1, Color::BLACK);
        let second = RegionShape::polygon(square(30, 30, 80, 80)).with_fill(FillPolicy::Always, Color::BLUE);
        {
            let mut canvas = Canvas::new(&mut ctx);
            draw_regions(&mut canvas, RegionSettings::default(), RegionLook::default(), [&first, &second], |_| true);
        }
        // The first square's right edge runs through the second square.
        assert_eq!(px(&ctx, 50, 40), Color::BLACK);
        assert_eq!(px(&ctx, 60, 60), over(Color::TRANSPARENT, Color::BLUE.with_alpha(90)));
        // No fill for the first square.
        assert_eq!(px(&ctx, 20, 20), Color::TRANSPARENT);
    }

    #[test]
    fn outline_skipped_without_width_unless_black() {
        let shape = RegionShape::circle(PixelPoint::new(16, 16), 10).with_fill(FillPolicy::None, Color::RED);

        let mut ctx1 = ctx(32, 32);
        {
            let mut canvas = Canvas::new(&mut ctx1);
            draw_regions(&mut canvas, RegionSettings::default(), RegionLook::default(), [&shape], |_| true);
        }
        assert_eq!(ctx1.backend().count_color(Color::TRANSPARENT), 32 * 32);

        let mut ctx2 = ctx(32, 32);
        let settings = RegionSettings { black_outline: true, ..RegionSettings::default() };
        {
            let mut canvas = Canvas::new(&mut ctx2);
            draw_regions(&mut canvas, settings, RegionLook::default(), [&shape], |_| true);
        }
        assert_eq!(px(&ctx2, 25, 16), Color::BLACK);
    }

    #[test]
    fn invisible_shapes_are_skipped() {
        let mut ctx = ctx(32, 32);
        let shape = RegionShape::circle(PixelPoint::new(16, 16), 10).with_outline(2, Color::BLACK);
        {
            let mut canvas = Canvas::new(&mut ctx);
            draw_regions(&mut canvas, RegionSettings::default(), RegionLook::default(), [&shape], |_| false);
        }
        assert_eq!(ctx.backend().count_color(Color::BLACK), 0);
    }

    #[test]
    fn pass_restores_canvas_and_gpu_state() {
        let mut ctx = ctx(32, 32);
        let shape = RegionShape::polygon(square(4, 4, 28, 28))
            .with_fill(FillPolicy::IfSelected, Color::RED)
            .with_outline(3, Color::BLACK);
        {
            let mut canvas = Canvas::new(&mut ctx);
            canvas.select_pen(Pen::new(1, Color::GREEN));
            draw_regions(&mut canvas, RegionSettings::default(), RegionLook::default(), [&shape], |_| true);
            assert_eq!(canvas.pen(), Pen::new(1, Color::GREEN));
            assert!(canvas.brush().is_hollow());
        }
        let state = ctx.backend().state();
        assert_eq!(state.stencil_write_mask, 0xff);
        assert!(!state.is_enabled(Capability::StencilTest));
        assert!(!state.is_enabled(Capability::Blend));
        assert!(stencil_is_clear(&ctx));
    }

    #[test]
    fn stencil_bits_return_to_zero_for_random_scenes() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..8 {
            let mut ctx = ctx(96, 96);
            let shapes: Vec<RegionShape> = (0..12)
                .map(|_| {
                    let fill = match rng.random_range(0..3) {
                        0 => FillPolicy::None,
                        1 => FillPolicy::IfSelected,
                        _ => FillPolicy::Always,
                    };
                    let base = if rng.random_bool(0.5) {
                        let c = PixelPoint::new(rng.random_range(0..96), rng.random_range(0..96));
                        RegionShape::circle(c, rng.random_range(1..40))
                    } else {
                        let (x, y) = (rng.random_range(-10..80), rng.random_range(-10..80));
                        let (w, h) = (rng.random_range(3..40), rng.random_range(3..40));
                        let skew = rng.random_range(-10..10);
                        RegionShape::polygon(vec![
                            PixelPoint::new(x, y),
                            PixelPoint::new(x + w, y + skew),
                            PixelPoint::new(x + w, y + h),
                            PixelPoint::new(x, y + h),
                        ])
                    };
                    base.with_fill(fill, Color::RED)
                        .with_selected(rng.random_bool(0.3))
                        .with_outline(rng.random_range(0..4), Color::BLACK)
                })
                .collect();

            let mut canvas = Canvas::new(&mut ctx);
            let mut pass = RegionPass::begin(&mut canvas, RegionSettings::default(), RegionLook::default());
            for shape in &shapes {
                pass.draw_shape(shape);
                let stencil = pass.canvas.gpu().backend().stencil_buffer();
                assert!(stencil.iter().all(|&s| s & FILL_MASK_BIT == 0));
            }
            pass.finish();
            drop(canvas);
            assert!(stencil_is_clear(&ctx));
        }
    }

    // ── cheap ────────────────────────────────────────────────────────────

    #[test]
    fn cheap_fill_all_blends_without_stencil() {
        let mut ctx = ctx(140, 100);
        let a = RegionShape::circle(PixelPoint::new(50, 50), 30).with_fill(FillPolicy::IfSelected, Color::RED);
        let b = RegionShape::circle(PixelPoint::new(90, 50), 30).with_fill(FillPolicy::IfSelected, Color::BLUE);
        let settings = RegionSettings { fill_mode: FillMode::All, black_outline: false };
        {
            let mut canvas = Canvas::new(&mut ctx);
            draw_regions(&mut canvas, settings, RegionLook::default(), [&a, &b], |_| true);
        }
        let red = Color::RED.with_alpha(48);
        let blue = Color::BLUE.with_alpha(48);
        assert_eq!(px(&ctx, 50, 50), over(Color::TRANSPARENT, red));
        assert_eq!(px(&ctx, 70, 50), over(over(Color::TRANSPARENT, red), blue));
        assert!(!ctx.backend().state().is_enabled(Capability::StencilTest));
        assert!(stencil_is_clear(&ctx));
    }

    #[test]
    fn cheap_fill_all_ignores_per_shape_policy() {
        let mut ctx = ctx(64, 64);
        let shape = RegionShape::circle(PixelPoint::new(32, 32), 20)
            .with_fill(FillPolicy::None, Color::RED)
            .with_outline(1, Color::BLACK);
        let settings = RegionSettings { fill_mode: FillMode::All, black_outline: false };
        {
            let mut canvas = Canvas::new(&mut ctx);
            draw_regions(&mut canvas, settings, RegionLook::default(), [&shape], |_| true);
        }
        assert_eq!(px(&ctx, 32, 32), over(Color::TRANSPARENT, Color::RED.with_alpha(48)));
        assert_eq!(px(&ctx, 32, 13), Color::BLACK);
    }

    #[test]
    fn cheap_fill_none_draws_outlines_only() {
        let mut ctx = ctx(64, 64);
        let shape = RegionShape::circle(PixelPoint::new(32, 32), 20)
            .with_fill(FillPolicy::Always, Color::RED)
            .with_outline(2, Color::BLACK);
        let settings = RegionSettings { fill_mode: FillMode::None, black_outline: false };
        {
            let mut canvas = Canvas::new(&mut ctx);
            draw_regions(&mut canvas, settings, RegionLook::default(), [&shape], |_| true);
        }
        assert_eq!(px(&ctx, 32, 32), Color::TRANSPARENT);
        assert_eq!(px(&ctx, 32, 13), Color::BLACK);
    }
}
