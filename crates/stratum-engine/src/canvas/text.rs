use crate::coords::{PixelPoint, PixelRect, PixelSize};
use crate::gpu::scope::ScopeBlend;
use crate::gpu::{Backend, ProgramKind};

use super::{BackgroundMode, Canvas};

impl<B: Backend> Canvas<'_, B> {
    // ── measuring ────────────────────────────────────────────────────────

    /// Size of `text` in the selected font; zero without a font or cache.
    pub fn calc_text_size(&mut self, text: &str) -> PixelSize {
        let Some(font) = self.font else {
            return PixelSize::default();
        };
        match self.glyphs.as_deref_mut() {
            Some(glyphs) => glyphs.get_size(font, text),
            None => PixelSize::default(),
        }
    }

    #[inline]
    pub fn calc_text_width(&mut self, text: &str) -> u32 {
        self.calc_text_size(text).width
    }

    #[inline]
    pub fn calc_text_height(&mut self, text: &str) -> u32 {
        self.calc_text_size(text).height
    }

    // ── drawing ──────────────────────────────────────────────────────────

    /// Cuts `text` to roughly what can be visible from `p` onwards.
    fn clip_text<'t>(&self, text: &'t str, p: PixelPoint) -> &'t str {
        let Some(font) = self.font else {
            return "";
        };
        let (w, h) = (self.width() as i32, self.height() as i32);
        if p.x >= w || p.y >= h {
            return "";
        }

        let available = u32::try_from(i64::from(w) - i64::from(p.x)).unwrap_or(u32::MAX);
        let max_chars = available.div_ceil(font.approximate_char_width()) as usize;
        match text.char_indices().nth(max_chars) {
            Some((end, _)) => &text[..end],
            None => text,
        }
    }

    /// Draws `text` with its top-left corner at `p`, over a box in the
    /// background colour when the background mode is opaque.
    pub fn draw_text(&mut self, p: PixelPoint, text: &str) {
        self.render_text(p, text, self.background_mode == BackgroundMode::Opaque);
    }

    /// Draws `text` without a background box, whatever the mode.
    pub fn draw_transparent_text(&mut self, p: PixelPoint, text: &str) {
        self.render_text(p, text, false);
    }

    /// Draws `text` clipped to `clip`.
    pub fn draw_clipped_text(&mut self, p: PixelPoint, clip: PixelRect, text: &str) {
        self.clipped(clip, |c| c.draw_text(p, text));
    }

    fn render_text(&mut self, p: PixelPoint, text: &str, opaque: bool) {
        let text = self.clip_text(text, p);
        if text.is_empty() {
            return;
        }
        let Some(font) = self.font else {
            return;
        };

        if opaque {
            let size = self.calc_text_size(text);
            let background = self.background_color;
            self.draw_filled_rectangle(PixelRect::from_origin_size(p, size), background);
        }

        let color = self.text_color;
        let Some(glyphs) = self.glyphs.as_deref_mut() else {
            return;
        };
        let Some(texture) = glyphs.get(&mut *self.ctx, font, text) else {
            return;
        };

        let mut blend = ScopeBlend::alpha(&mut *self.ctx);
        blend.set_color(ProgramKind::Alpha, color);
        blend.use_program(ProgramKind::Alpha);
        texture.draw_at(&mut *blend, p);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::gpu::software::SoftwareBackend;
    use crate::gpu::{GpuContext, GpuTexture, PixelFormat};
    use crate::paint::Color;
    use crate::text::{Font, FontId, GlyphCache};

    /// Renders every run as a solid block, one 2x4 cell per character.
    #[derive(Default)]
    struct BlockGlyphs {
        runs: Vec<(String, GpuTexture)>,
        requests: Vec<String>,
    }

    fn block_size(text: &str) -> PixelSize {
        PixelSize::new(2 * text.chars().count() as u32, 4)
    }

    impl GlyphCache<SoftwareBackend> for BlockGlyphs {
        fn lookup_size(&self, _font: Font, text: &str) -> Option<PixelSize> {
            self.runs.iter().any(|(t, _)| t == text).then(|| block_size(text))
        }

        fn get_size(&mut self, _font: Font, text: &str) -> PixelSize {
            block_size(text)
        }

        fn get(&mut self, ctx: &mut GpuContext<SoftwareBackend>, _font: Font, text: &str) -> Option<&GpuTexture> {
            self.requests.push(text.to_owned());
            if !self.runs.iter().any(|(t, _)| t == text) {
                let size = block_size(text);
                let coverage = vec![255; size.area()];
                let texture = GpuTexture::new(ctx, PixelFormat::Alpha, size, Some(&coverage))?;
                self.runs.push((text.to_owned(), texture));
            }
            self.runs.iter().find(|(t, _)| t == text).map(|(_, tex)| tex)
        }
    }

    fn font() -> Font {
        Font::new(FontId(0), 8)
    }

    #[test]
    fn text_without_font_is_skipped() {
        let mut ctx = ctx(16, 8);
        let mut glyphs = BlockGlyphs::default();
        {
            let mut c = Canvas::new(&mut ctx).with_glyphs(&mut glyphs);
            c.draw_text(PixelPoint::new(0, 0), "ab");
            assert_eq!(c.calc_text_width("ab"), 0);
        }
        assert!(glyphs.requests.is_empty());
    }

    #[test]
    fn text_is_drawn_in_text_colour() {
        let mut ctx = ctx(16, 8);
        let mut glyphs = BlockGlyphs::default();
        {
            let mut c = Canvas::new(&mut ctx).with_glyphs(&mut glyphs);
            c.select_font(font());
            c.set_text_color(Color::RED);
            assert_eq!(c.calc_text_size("ab"), PixelSize::new(4, 4));
            c.draw_text(PixelPoint::new(1, 1), "ab");
        }
        assert_eq!(ctx.backend().count_color(Color::RED), 16);
        assert_eq!(px(&ctx, 1, 1), Color::RED);
        assert_eq!(px(&ctx, 5, 1), Color::TRANSPARENT);
    }

    #[test]
    fn opaque_background_fills_box_first() {
        let mut ctx = ctx(16, 8);
        let mut glyphs = BlockGlyphs::default();
        {
            let mut c = Canvas::new(&mut ctx).with_glyphs(&mut glyphs);
            c.select_font(font());
            c.set_background_opaque();
            c.set_background_color(Color::WHITE);
            c.set_text_color(Color::TRANSPARENT);
            c.draw_text(PixelPoint::new(0, 0), "abc");
        }
        // Fully transparent glyphs blend to nothing over the box.
        assert_eq!(ctx.backend().count_color(Color::WHITE), 24);
    }

    #[test]
    fn text_is_clipped_to_visible_characters() {
        let mut ctx = ctx(16, 8);
        let mut glyphs = BlockGlyphs::default();
        {
            let mut c = Canvas::new(&mut ctx).with_glyphs(&mut glyphs);
            c.select_font(font());
            // Approximate glyph width 2 px, 4 px left: two characters fit.
            c.draw_text(PixelPoint::new(12, 0), "abcdef");
            c.draw_text(PixelPoint::new(16, 0), "never");
        }
        assert_eq!(glyphs.requests, vec!["ab".to_owned()]);
    }

    #[test]
    fn text_far_left_of_canvas_draws_nothing() {
        let mut ctx = ctx(16, 8);
        let mut glyphs = BlockGlyphs::default();
        {
            let mut c = Canvas::new(&mut ctx).with_glyphs(&mut glyphs);
            c.select_font(font());
            c.set_text_color(Color::RED);
            c.draw_text(PixelPoint::new(i32::MIN, 0), "abc");
        }
        assert_eq!(glyphs.requests, vec!["abc".to_owned()]);
        assert_eq!(ctx.backend().count_color(Color::RED), 0);
    }

    #[test]
    fn clipped_text_stays_in_box() {
        let mut ctx = ctx(16, 8);
        let mut glyphs = BlockGlyphs::default();
        {
            let mut c = Canvas::new(&mut ctx).with_glyphs(&mut glyphs);
            c.select_font(font());
            c.set_text_color(Color::BLUE);
            c.draw_clipped_text(PixelPoint::new(0, 0), PixelRect::new(0, 0, 3, 8), "abcd");
        }
        assert_eq!(ctx.backend().count_color(Color::BLUE), 12);
    }
}
