use crate::coords::{Angle, PixelPoint, PixelRect, Vec2};
use crate::geometry::{
    angle_to_donut_vertices, annulus_points, arc_points, donut_strips, keyhole_points,
    polygon_to_triangles, round_rect_points, segment_points, DonutVertices, MAX_ANGLE,
};
use crate::gpu::{Backend, BufferTarget, GpuBuffer, Primitive, ProgramKind, Uniform, UniformValue, VertexSource};
use crate::paint::Color;

use super::{corners, exact, Canvas};

/// Quad covering `[c - r, c + r]` on both axes, as a triangle strip.
fn bounding_square(c: Vec2, r: f32) -> [Vec2; 4] {
    [
        Vec2::new(c.x - r, c.y - r),
        Vec2::new(c.x + r, c.y - r),
        Vec2::new(c.x - r, c.y + r),
        Vec2::new(c.x + r, c.y + r),
    ]
}

/// Pixel centres of the one-pixel border just inside `rect`.
fn inner_border(rect: PixelRect) -> [Vec2; 4] {
    let (l, t, r, b) = (rect.left, rect.top, rect.right - 1, rect.bottom - 1);
    [
        PixelPoint::new(l, t).to_exact_vec2(),
        PixelPoint::new(r, t).to_exact_vec2(),
        PixelPoint::new(r, b).to_exact_vec2(),
        PixelPoint::new(l, b).to_exact_vec2(),
    ]
}

impl<B: Backend> Canvas<'_, B> {
    // ── rectangles ───────────────────────────────────────────────────────

    /// Fills the whole canvas.
    pub fn clear(&mut self, color: Color) {
        let rect = self.rect();
        self.draw_filled_rectangle(rect, color);
    }

    pub fn draw_filled_rectangle(&mut self, rect: PixelRect, color: Color) {
        let rect = rect.normalized();
        if rect.is_empty() {
            return;
        }
        let quad = [
            rect.top_left().to_vec2(),
            rect.top_right().to_vec2(),
            rect.bottom_left().to_vec2(),
            rect.bottom_right().to_vec2(),
        ];
        self.use_solid(color);
        self.ctx.draw(Primitive::TriangleStrip, &quad);
    }

    /// One-pixel frame along the inside of `rect`.
    pub fn draw_outline_rectangle(&mut self, rect: PixelRect, color: Color) {
        let rect = rect.normalized();
        if rect.is_empty() {
            return;
        }
        self.use_solid(color);
        self.ctx.line_width(1.0);
        self.ctx.draw(Primitive::LineLoop, &inner_border(rect));
    }

    /// Rectangle filled with the brush and outlined with the pen.
    pub fn draw_rectangle(&mut self, rect: PixelRect) {
        let rect = rect.normalized();
        if rect.is_empty() {
            return;
        }
        if let Some(color) = self.brush.color() {
            self.draw_filled_rectangle(rect, color);
        }
        self.stroke(&inner_border(rect), true, false);
    }

    /// Keyboard-focus frame.
    #[inline]
    pub fn draw_focus_rectangle(&mut self, rect: PixelRect) {
        self.draw_outline_rectangle(rect, Color::DARK_GRAY);
    }

    pub fn draw_round_rectangle(&mut self, rect: PixelRect, radius: u32) {
        let rect = rect.normalized();
        if rect.is_empty() {
            return;
        }
        self.draw_polygon(&round_rect_points(rect, radius));
    }

    // ── lines ────────────────────────────────────────────────────────────

    /// Single-row line from `x1` to `x2` (exclusive), ignoring the pen.
    pub fn draw_h_line(&mut self, x1: i32, x2: i32, y: i32, color: Color) {
        self.draw_filled_rectangle(PixelRect::new(x1.min(x2), y, x1.max(x2), y + 1), color);
    }

    pub fn draw_line(&mut self, a: PixelPoint, b: PixelPoint) {
        if a == b {
            return;
        }
        self.stroke(&[a.to_exact_vec2(), b.to_exact_vec2()], false, false);
    }

    /// Line between sub-pixel positions.
    pub fn draw_exact_line(&mut self, a: Vec2, b: Vec2) {
        if a == b || !a.is_finite() || !b.is_finite() {
            return;
        }
        self.stroke(&[a, b], false, false);
    }

    /// Line whose thick ends are squared off past the endpoints, so pieces
    /// of a longer path join without gaps.
    pub fn draw_line_piece(&mut self, a: PixelPoint, b: PixelPoint) {
        if a == b {
            return;
        }
        self.stroke(&[a.to_exact_vec2(), b.to_exact_vec2()], false, true);
    }

    #[inline]
    pub fn draw_two_lines(&mut self, a: PixelPoint, b: PixelPoint, c: PixelPoint) {
        self.draw_polyline(&[a, b, c]);
    }

    pub fn draw_polyline(&mut self, points: &[PixelPoint]) {
        self.stroke(&exact(points), false, false);
    }

    // ── polygons ─────────────────────────────────────────────────────────

    /// Polygon filled with the brush (even-odd) and outlined with the pen.
    /// Degenerate outlines get no fill.
    pub fn draw_polygon(&mut self, points: &[PixelPoint]) {
        if points.len() < 3 || (self.brush.is_hollow() && !self.pen.is_defined()) {
            return;
        }

        if !self.brush.is_hollow() {
            let triangles = polygon_to_triangles(points);
            self.fill_indexed(&triangles.vertices, &triangles.indices);
        }
        self.stroke(&exact(points), true, false);
    }

    /// Convex fan around `points[0]`, drawn without triangulation.
    pub fn draw_triangle_fan(&mut self, points: &[PixelPoint]) {
        if points.len() < 3 {
            return;
        }
        if let Some(color) = self.brush.color() {
            self.use_solid(color);
            self.ctx.draw(Primitive::TriangleFan, &corners(points));
        }
        self.stroke(&exact(points), true, false);
    }

    // ── circles ──────────────────────────────────────────────────────────

    /// Circle shaded per pixel over its bounding square.
    ///
    /// With a hollow brush only the pen ring `[radius - pen width, radius]`
    /// is drawn. Otherwise the inside takes the brush colour and the ring
    /// the pen colour.
    pub fn draw_circle(&mut self, center: PixelPoint, radius: u32) {
        if radius == 0 {
            return;
        }
        let pen = self.pen;
        let c = center.to_exact_vec2();
        let r = radius as f32;
        let ring_inner = (r - pen.width() as f32).max(0.0);

        let ctx = &mut *self.ctx;
        match self.brush.color() {
            None => {
                if !pen.is_defined() {
                    return;
                }
                let kind = ProgramKind::CircleOutline;
                ctx.set_color(kind, pen.color());
                ctx.set_uniform(kind, Uniform::CircleCenter, UniformValue::Vec2([c.x, c.y]));
                ctx.set_uniform(kind, Uniform::CircleRadius1, UniformValue::Float(ring_inner));
                ctx.set_uniform(kind, Uniform::CircleRadius2, UniformValue::Float(r));
                ctx.use_program(kind);
            }
            Some(fill) => {
                let (inner, edge) = if pen.is_defined() { (ring_inner, pen.color()) } else { (r, fill) };
                let kind = ProgramKind::FilledCircle;
                ctx.set_uniform(kind, Uniform::CircleCenter, UniformValue::Vec2([c.x, c.y]));
                ctx.set_uniform(kind, Uniform::CircleRadius1, UniformValue::Float(inner));
                ctx.set_uniform(kind, Uniform::CircleRadius2, UniformValue::Float(r));
                ctx.set_uniform(kind, Uniform::CircleColor1, UniformValue::Vec4(fill.to_f32()));
                ctx.set_uniform(kind, Uniform::CircleColor2, UniformValue::Vec4(edge.to_f32()));
                ctx.use_program(kind);
            }
        }
        ctx.draw(Primitive::TriangleStrip, &bounding_square(c, r + 1.0));
    }

    // ── arcs ─────────────────────────────────────────────────────────────

    /// Pen-only arc, clockwise from `start` to `end`.
    pub fn draw_arc(&mut self, center: PixelPoint, radius: u32, start: Angle, end: Angle) {
        if radius == 0 {
            return;
        }
        self.stroke(&exact(&arc_points(center, radius, start, end)), false, false);
    }

    /// Pie slice; with `horizon` the chord replaces the two radii.
    pub fn draw_segment(&mut self, center: PixelPoint, radius: u32, start: Angle, end: Angle, horizon: bool) {
        if radius == 0 {
            return;
        }
        self.draw_polygon(&segment_points(center, radius, start, end, horizon));
    }

    /// Ring sector between two radii. Equal angles draw the whole ring.
    pub fn draw_annulus(
        &mut self,
        center: PixelPoint,
        small_radius: u32,
        big_radius: u32,
        start: Angle,
        end: Angle,
    ) {
        if big_radius == 0 || small_radius >= big_radius {
            return;
        }
        if self.brush.is_hollow() && !self.pen.is_defined() {
            return;
        }

        let (istart, iend) = angle_to_donut_vertices(start, end);
        let full = istart == 0 && iend == MAX_ANGLE;
        let donut = DonutVertices::new(center.to_exact_vec2(), small_radius as f32, big_radius as f32);

        if let Some(color) = self.brush.color() {
            self.use_solid(color);
            self.fill_donut(&donut, istart, iend);
        }

        if full {
            self.stroke(&donut.outer_circle(), true, false);
            if small_radius > 0 {
                self.stroke(&donut.inner_circle(), true, false);
            }
        } else {
            let outline = annulus_points(center, small_radius, big_radius, start, end);
            self.stroke(&exact(&outline), true, false);
        }
    }

    /// Uploads the donut table into an array buffer and draws the strips
    /// from it. Falls back to client arrays when no buffer can be created.
    fn fill_donut(&mut self, donut: &DonutVertices, istart: usize, iend: usize) {
        let vertices = donut.vertices();
        let Some(mut buffer) = GpuBuffer::new(self.ctx, BufferTarget::Array) else {
            let source = VertexSource::positions(vertices);
            for (first, count) in donut_strips(istart, iend) {
                self.ctx.draw_arrays(Primitive::TriangleStrip, source, first, count);
            }
            return;
        };

        let mut write = buffer.begin_write(self.ctx, std::mem::size_of_val(vertices));
        write.write_pod(vertices);
        write.commit();

        buffer.bind(self.ctx);
        for (first, count) in donut_strips(istart, iend) {
            self.ctx.draw_arrays(Primitive::TriangleStrip, VertexSource::Bound, first, count);
        }
        GpuBuffer::unbind(self.ctx, BufferTarget::Array);
    }

    /// Sector of `big_radius` merged with a full circle of `small_radius`.
    pub fn draw_keyhole(
        &mut self,
        center: PixelPoint,
        small_radius: u32,
        big_radius: u32,
        start: Angle,
        end: Angle,
    ) {
        self.draw_polygon(&keyhole_points(center, small_radius, big_radius, start, end));
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::paint::{Brush, Pen, PenStyle};

    // ── rectangles ───────────────────────────────────────────────────────

    #[test]
    fn filled_rectangle_covers_exactly_its_pixels() {
        let mut ctx = ctx(8, 8);
        Canvas::new(&mut ctx).draw_filled_rectangle(PixelRect::new(1, 1, 4, 3), Color::RED);
        assert_eq!(ctx.backend().count_color(Color::RED), 6);
        assert_eq!(px(&ctx, 0, 0), Color::TRANSPARENT);
        assert_eq!(px(&ctx, 3, 2), Color::RED);
        assert_eq!(px(&ctx, 4, 2), Color::TRANSPARENT);
    }

    #[test]
    fn outline_rectangle_is_one_pixel_frame() {
        let mut ctx = ctx(8, 8);
        Canvas::new(&mut ctx).draw_outline_rectangle(PixelRect::new(1, 1, 5, 5), Color::BLUE);
        assert_eq!(ctx.backend().count_color(Color::BLUE), 12);
        assert_eq!(px(&ctx, 2, 2), Color::TRANSPARENT);
        assert_eq!(px(&ctx, 4, 4), Color::BLUE);
    }

    #[test]
    fn empty_rectangle_issues_no_draw() {
        let mut ctx = ctx(8, 8);
        let before = ctx.backend().draw_call_count();
        Canvas::new(&mut ctx).draw_filled_rectangle(PixelRect::new(3, 3, 3, 6), Color::RED);
        assert_eq!(ctx.backend().draw_call_count(), before);
    }

    #[test]
    fn clear_fills_canvas() {
        let mut ctx = ctx(4, 4);
        Canvas::new(&mut ctx).clear(Color::WHITE);
        assert_eq!(ctx.backend().count_color(Color::WHITE), 16);
    }

    // ── polygons ─────────────────────────────────────────────────────────

    #[test]
    fn hollow_polygon_without_pen_is_noop() {
        let mut ctx = ctx(8, 8);
        let before = ctx.backend().draw_call_count();
        let pts = [PixelPoint::new(0, 0), PixelPoint::new(6, 0), PixelPoint::new(0, 6)];
        Canvas::new(&mut ctx).draw_polygon(&pts);
        assert_eq!(ctx.backend().draw_call_count(), before);
        assert_eq!(ctx.error_count(), 0);
    }

    #[test]
    fn degenerate_polygon_gets_no_fill() {
        let mut ctx = ctx(8, 8);
        let before = ctx.backend().draw_call_count();
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_brush(Brush::solid(Color::RED));
            c.draw_polygon(&[PixelPoint::new(0, 0), PixelPoint::new(2, 2), PixelPoint::new(4, 4)]);
        }
        assert_eq!(ctx.backend().draw_call_count(), before);
    }

    #[test]
    fn filled_square_polygon() {
        let mut ctx = ctx(8, 8);
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_brush(Brush::solid(Color::RED));
            c.draw_polygon(&[
                PixelPoint::new(0, 0),
                PixelPoint::new(4, 0),
                PixelPoint::new(4, 4),
                PixelPoint::new(0, 4),
            ]);
        }
        assert_eq!(ctx.backend().count_color(Color::RED), 16);
    }

    #[test]
    fn polygon_outline_drawn_over_fill() {
        let mut ctx = ctx(8, 8);
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_brush(Brush::solid(Color::RED));
            c.select_pen(Pen::new(1, Color::BLUE));
            c.draw_polygon(&[
                PixelPoint::new(1, 1),
                PixelPoint::new(6, 1),
                PixelPoint::new(6, 6),
                PixelPoint::new(1, 6),
            ]);
        }
        assert_eq!(px(&ctx, 1, 1), Color::BLUE);
        assert_eq!(px(&ctx, 3, 3), Color::RED);
    }

    #[test]
    fn bowtie_polygon_fills_both_lobes() {
        let mut ctx = ctx(16, 16);
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_brush(Brush::solid(Color::RED));
            c.draw_polygon(&[
                PixelPoint::new(0, 0),
                PixelPoint::new(12, 12),
                PixelPoint::new(12, 0),
                PixelPoint::new(0, 12),
            ]);
        }
        assert_eq!(px(&ctx, 1, 6), Color::RED);
        assert_eq!(px(&ctx, 10, 6), Color::RED);
        assert_eq!(px(&ctx, 6, 1), Color::TRANSPARENT);
        assert_eq!(ctx.error_count(), 0);
    }

    #[test]
    fn triangle_fan_fills() {
        let mut ctx = ctx(8, 8);
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_brush(Brush::solid(Color::GREEN));
            c.draw_triangle_fan(&[
                PixelPoint::new(0, 0),
                PixelPoint::new(8, 0),
                PixelPoint::new(8, 8),
                PixelPoint::new(0, 8),
            ]);
        }
        assert_eq!(ctx.backend().count_color(Color::GREEN), 64);
    }

    // ── lines ────────────────────────────────────────────────────────────

    #[test]
    fn thin_line_is_half_open() {
        let mut ctx = ctx(8, 8);
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_pen(Pen::new(1, Color::RED));
            c.draw_line(PixelPoint::new(1, 2), PixelPoint::new(6, 2));
        }
        assert_eq!(ctx.backend().count_color(Color::RED), 5);
        assert_eq!(px(&ctx, 6, 2), Color::TRANSPARENT);
    }

    #[test]
    fn null_pen_draws_no_line() {
        let mut ctx = ctx(8, 8);
        let before = ctx.backend().draw_call_count();
        Canvas::new(&mut ctx).draw_line(PixelPoint::new(1, 2), PixelPoint::new(6, 2));
        assert_eq!(ctx.backend().draw_call_count(), before);
    }

    #[test]
    fn thick_line_is_a_strip_of_pen_width() {
        let mut ctx = ctx(16, 16);
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_pen(Pen::new(4, Color::RED));
            c.draw_line(PixelPoint::new(2, 8), PixelPoint::new(12, 8));
        }
        for y in 7..=9 {
            assert_eq!(px(&ctx, 6, y), Color::RED, "row {y}");
        }
        assert_eq!(px(&ctx, 6, 5), Color::TRANSPARENT);
        assert_eq!(px(&ctx, 6, 11), Color::TRANSPARENT);
    }

    #[test]
    fn pen_width_picks_line_or_strip_primitive() {
        let mut ctx = ctx(16, 16);
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_pen(Pen::new(2, Color::RED));
            c.draw_line(PixelPoint::new(2, 8), PixelPoint::new(12, 8));
        }
        assert_eq!(ctx.backend().last_primitive(), Some(Primitive::LineStrip));
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_pen(Pen::new(2, Color::RED));
            c.draw_polyline(&[PixelPoint::new(2, 2), PixelPoint::new(12, 2), PixelPoint::new(12, 12)]);
            assert!(c.pen().is_thin());
        }
        assert_eq!(ctx.backend().last_primitive(), Some(Primitive::LineStrip));
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_pen(Pen::new(3, Color::RED));
            c.draw_line(PixelPoint::new(2, 8), PixelPoint::new(12, 8));
        }
        assert_eq!(ctx.backend().last_primitive(), Some(Primitive::TriangleStrip));
    }

    #[test]
    fn thin_closed_outline_is_a_line_loop() {
        let mut ctx = ctx(16, 16);
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_pen(Pen::new(1, Color::BLUE));
            c.draw_polygon(&[PixelPoint::new(2, 2), PixelPoint::new(12, 2), PixelPoint::new(12, 12)]);
        }
        assert_eq!(ctx.backend().last_primitive(), Some(Primitive::LineLoop));
    }

    #[test]
    fn dashed_line_alternates_from_start() {
        let mut ctx = ctx(64, 8);
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_pen(Pen::new(1, Color::RED).with_style(PenStyle::Dash1));
            c.draw_line(PixelPoint::new(0, 4), PixelPoint::new(63, 4));
        }
        assert_eq!(px(&ctx, 5, 4), Color::RED);
        assert_eq!(px(&ctx, 25, 4), Color::TRANSPARENT);
        assert_eq!(px(&ctx, 40, 4), Color::RED);
        assert_eq!(px(&ctx, 58, 4), Color::TRANSPARENT);
    }

    #[test]
    fn dash_phase_follows_translation() {
        let mut ctx = ctx(64, 8);
        {
            let mut c = Canvas::new(&mut ctx);
            c.translated(PixelRect::new(10, 0, 64, 8), |c| {
                c.select_pen(Pen::new(1, Color::RED).with_style(PenStyle::Dash1));
                c.draw_line(PixelPoint::new(0, 4), PixelPoint::new(50, 4));
            });
        }
        // Dash starts at the translated origin.
        assert_eq!(px(&ctx, 15, 4), Color::RED);
        assert_eq!(px(&ctx, 35, 4), Color::TRANSPARENT);
    }

    // ── circles ──────────────────────────────────────────────────────────

    #[test]
    fn hollow_circle_draws_ring_only() {
        let mut ctx = ctx(32, 32);
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_pen(Pen::new(2, Color::BLUE));
            c.draw_circle(PixelPoint::new(16, 16), 10);
        }
        assert_eq!(px(&ctx, 25, 16), Color::BLUE);
        assert_eq!(px(&ctx, 16, 7), Color::BLUE);
        assert_eq!(px(&ctx, 16, 16), Color::TRANSPARENT);
        assert_eq!(px(&ctx, 28, 16), Color::TRANSPARENT);
    }

    #[test]
    fn filled_circle_uses_pen_for_rim() {
        let mut ctx = ctx(32, 32);
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_brush(Brush::solid(Color::GREEN));
            c.select_pen(Pen::new(2, Color::BLUE));
            c.draw_circle(PixelPoint::new(16, 16), 10);
        }
        assert_eq!(px(&ctx, 16, 16), Color::GREEN);
        assert_eq!(px(&ctx, 25, 16), Color::BLUE);
        assert_eq!(px(&ctx, 28, 16), Color::TRANSPARENT);
    }

    #[test]
    fn filled_circle_without_pen_is_one_colour() {
        let mut ctx = ctx(32, 32);
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_brush(Brush::solid(Color::GREEN));
            c.draw_circle(PixelPoint::new(16, 16), 10);
        }
        assert_eq!(px(&ctx, 25, 16), Color::GREEN);
        assert_eq!(ctx.backend().count_color(Color::BLUE), 0);
    }

    // ── annulus ──────────────────────────────────────────────────────────

    #[test]
    fn full_annulus_leaves_hole() {
        let mut ctx = ctx(32, 32);
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_brush(Brush::solid(Color::RED));
            c.draw_annulus(PixelPoint::new(16, 16), 5, 10, Angle::ZERO, Angle::ZERO);
        }
        assert_eq!(px(&ctx, 16, 16), Color::TRANSPARENT);
        assert_eq!(px(&ctx, 23, 16), Color::RED);
        assert_eq!(px(&ctx, 9, 16), Color::RED);
        assert_eq!(px(&ctx, 16, 9), Color::RED);
    }

    #[test]
    fn annulus_fill_draws_from_an_uploaded_buffer() {
        let mut ctx = ctx(32, 32);
        let before = ctx.backend().stats();
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_brush(Brush::solid(Color::RED));
            c.draw_annulus(PixelPoint::new(16, 16), 5, 10, Angle::degrees(270.0), Angle::degrees(90.0));
        }
        ctx.collect();
        let after = ctx.backend().stats();
        assert_eq!(after.buffers_created, before.buffers_created + 1);
        assert_eq!(after.buffers_deleted, before.buffers_deleted + 1);
        assert_eq!(ctx.backend().bound_buffer(BufferTarget::Array), None);
        assert_eq!(ctx.error_count(), 0);
        assert_eq!(px(&ctx, 21, 11), Color::RED);
    }

    #[test]
    fn quarter_annulus_covers_north_east_only() {
        let mut ctx = ctx(32, 32);
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_brush(Brush::solid(Color::RED));
            c.draw_annulus(PixelPoint::new(16, 16), 5, 10, Angle::ZERO, Angle::degrees(90.0));
        }
        assert_eq!(px(&ctx, 21, 11), Color::RED);
        assert_eq!(px(&ctx, 11, 21), Color::TRANSPARENT);
        assert_eq!(px(&ctx, 11, 11), Color::TRANSPARENT);
    }

    #[test]
    fn wrapping_annulus_draws_both_parts() {
        let mut ctx = ctx(32, 32);
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_brush(Brush::solid(Color::RED));
            c.draw_annulus(PixelPoint::new(16, 16), 5, 10, Angle::degrees(270.0), Angle::degrees(90.0));
        }
        assert_eq!(px(&ctx, 21, 11), Color::RED);
        assert_eq!(px(&ctx, 11, 11), Color::RED);
        assert_eq!(px(&ctx, 21, 21), Color::TRANSPARENT);
        assert_eq!(px(&ctx, 11, 21), Color::TRANSPARENT);
    }

    #[test]
    fn segment_fills_pie_slice() {
        let mut ctx = ctx(32, 32);
        {
            let mut c = Canvas::new(&mut ctx);
            c.select_brush(Brush::solid(Color::RED));
            c.draw_segment(PixelPoint::new(16, 16), 10, Angle::degrees(90.0), Angle::degrees(180.0), false);
        }
        assert_eq!(px(&ctx, 20, 20), Color::RED);
        assert_eq!(px(&ctx, 12, 12), Color::TRANSPARENT);
    }
}
