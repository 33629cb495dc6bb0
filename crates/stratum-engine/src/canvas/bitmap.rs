use crate::coords::{PixelPoint, PixelRect, PixelSize};
use crate::gpu::scope::{ScopeBlend, ScopeColorMask, ScopeTextureConstantAlpha};
use crate::gpu::{Backend, BlendFactor, ColorMask, ProgramKind};
use crate::image::Bitmap;
use crate::paint::Color;

use super::Canvas;

impl<B: Backend> Canvas<'_, B> {
    // ── blits ────────────────────────────────────────────────────────────

    /// Copies `size` pixels of `bitmap` at `src` to `dest`, unscaled.
    pub fn copy(&mut self, dest: PixelPoint, size: PixelSize, bitmap: &Bitmap, src: PixelPoint) {
        self.stretch(
            PixelRect::from_origin_size(dest, size),
            bitmap,
            PixelRect::from_origin_size(src, size),
        );
    }

    /// Draws the whole bitmap at its natural size.
    pub fn copy_bitmap(&mut self, dest: PixelPoint, bitmap: &Bitmap) {
        let size = bitmap.size();
        self.copy(dest, size, bitmap, PixelPoint::default());
    }

    /// Scales the `src` texels of `bitmap` into `dest`.
    pub fn stretch(&mut self, dest: PixelRect, bitmap: &Bitmap, src: PixelRect) {
        self.blit(ProgramKind::Texture, dest, bitmap, src);
    }

    /// Like [`stretch`](Self::stretch) with inverted colours.
    pub fn stretch_not(&mut self, dest: PixelRect, bitmap: &Bitmap, src: PixelRect) {
        self.blit(ProgramKind::Invert, dest, bitmap, src);
    }

    /// Paints `color` through the bitmap's alpha (an alpha mask or an
    /// RGBA image).
    pub fn stretch_mono(&mut self, dest: PixelRect, bitmap: &Bitmap, src: PixelRect, color: Color) {
        let Some(texture) = bitmap.texture() else {
            return;
        };
        if dest.is_empty() || src.is_empty() {
            return;
        }
        let mut blend = ScopeBlend::alpha(&mut *self.ctx);
        blend.set_color(ProgramKind::Alpha, color);
        blend.use_program(ProgramKind::Alpha);
        texture.draw(&mut *blend, dest, src);
    }

    /// Draws the bitmap honouring its own alpha, scaled by `alpha`.
    pub fn stretch_alpha(&mut self, dest: PixelRect, bitmap: &Bitmap, src: PixelRect, alpha: f32) {
        let Some(texture) = bitmap.texture() else {
            return;
        };
        if dest.is_empty() || src.is_empty() {
            return;
        }
        let mut scope = ScopeTextureConstantAlpha::new(&mut *self.ctx, true, alpha);
        texture.draw(&mut *scope, dest, src);
    }

    fn blit(&mut self, program: ProgramKind, dest: PixelRect, bitmap: &Bitmap, src: PixelRect) {
        let Some(texture) = bitmap.texture() else {
            return;
        };
        if dest.is_empty() || src.is_empty() {
            return;
        }
        self.ctx.use_program(program);
        texture.draw(&mut *self.ctx, dest, src);
    }

    // ── effects ──────────────────────────────────────────────────────────

    /// Inverts the colour channels inside `rect`, keeping alpha.
    pub fn invert_rectangle(&mut self, rect: PixelRect) {
        let mut blend = ScopeBlend::new(self, BlendFactor::OneMinusDstColor, BlendFactor::Zero);
        let mut mask = ScopeColorMask::new(&mut *blend, ColorMask::RGB);
        mask.draw_filled_rectangle(rect, Color::WHITE);
    }

    /// Blends white over `rect` with the given opacity.
    pub fn fade_to_white(&mut self, rect: PixelRect, alpha: u8) {
        let mut blend = ScopeBlend::alpha(self);
        blend.draw_filled_rectangle(rect, Color::WHITE.with_alpha(alpha));
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::gpu::Capability;
    use crate::image::{ImageFormat, UncompressedImage};

    fn rgb_2x2() -> UncompressedImage {
        #[rustfmt::skip]
        let pixels = vec![
            255, 0, 0,    0, 255, 0,
            0, 0, 255,    255, 255, 255,
        ];
        UncompressedImage::new(ImageFormat::Rgb, PixelSize::new(2, 2), 6, pixels)
    }

    // ── blits ────────────────────────────────────────────────────────────

    #[test]
    fn stretch_scales_nearest() {
        let mut ctx = ctx(4, 4);
        let mut bmp = Bitmap::new();
        assert!(bmp.load(&mut ctx, &rgb_2x2(), false));
        Canvas::new(&mut ctx).stretch(PixelRect::new(0, 0, 4, 4), &bmp, PixelRect::new(0, 0, 2, 2));

        assert_eq!(px(&ctx, 0, 0), Color::RED);
        assert_eq!(px(&ctx, 3, 0), Color::GREEN);
        assert_eq!(px(&ctx, 1, 3), Color::BLUE);
        assert_eq!(px(&ctx, 2, 2), Color::WHITE);
    }

    #[test]
    fn copy_takes_sub_rectangle() {
        let mut ctx = ctx(4, 4);
        let mut bmp = Bitmap::new();
        bmp.load(&mut ctx, &rgb_2x2(), false);
        Canvas::new(&mut ctx).copy(PixelPoint::new(3, 3), PixelSize::new(1, 1), &bmp, PixelPoint::new(1, 0));
        assert_eq!(px(&ctx, 3, 3), Color::GREEN);
        assert_eq!(ctx.backend().count_color(Color::GREEN), 1);
    }

    #[test]
    fn undefined_bitmap_is_skipped() {
        let mut ctx = ctx(4, 4);
        let before = ctx.backend().draw_call_count();
        Canvas::new(&mut ctx).copy_bitmap(PixelPoint::default(), &Bitmap::new());
        assert_eq!(ctx.backend().draw_call_count(), before);
    }

    #[test]
    fn stretch_not_inverts() {
        let mut ctx = ctx(2, 2);
        let mut bmp = Bitmap::new();
        let black = UncompressedImage::new(ImageFormat::Gray, PixelSize::new(1, 1), 1, vec![0]);
        bmp.load(&mut ctx, &black, false);
        Canvas::new(&mut ctx).stretch_not(PixelRect::new(0, 0, 2, 2), &bmp, PixelRect::new(0, 0, 1, 1));
        assert_eq!(ctx.backend().count_color(Color::WHITE), 4);
    }

    #[test]
    fn mono_paints_through_mask() {
        let mut ctx = ctx(2, 2);
        let mut bmp = Bitmap::new();
        let mask = UncompressedImage::new(ImageFormat::Gray, PixelSize::new(2, 2), 2, vec![255, 0, 0, 255]);
        assert!(bmp.load(&mut ctx, &mask, true));
        Canvas::new(&mut ctx).stretch_mono(
            PixelRect::new(0, 0, 2, 2),
            &bmp,
            PixelRect::new(0, 0, 2, 2),
            Color::BLUE,
        );
        assert_eq!(px(&ctx, 0, 0), Color::BLUE);
        assert_eq!(px(&ctx, 1, 1), Color::BLUE);
        assert_eq!(px(&ctx, 1, 0), Color::TRANSPARENT);
        assert!(!ctx.is_enabled(Capability::Blend));
    }

    // ── effects ──────────────────────────────────────────────────────────

    #[test]
    fn invert_keeps_alpha() {
        let mut ctx = ctx(4, 4);
        {
            let mut c = Canvas::new(&mut ctx);
            c.draw_filled_rectangle(PixelRect::new(0, 0, 4, 4), Color::new(255, 0, 64, 128));
            c.invert_rectangle(PixelRect::new(0, 0, 2, 4));
        }
        assert_eq!(px(&ctx, 0, 0), Color::new(0, 255, 191, 128));
        assert_eq!(px(&ctx, 3, 0), Color::new(255, 0, 64, 128));
        assert!(!ctx.is_enabled(Capability::Blend));
        assert_eq!(ctx.backend().state().color_mask, ColorMask::ALL);
    }

    #[test]
    fn fade_blends_towards_white() {
        let mut ctx = ctx(2, 2);
        {
            let mut c = Canvas::new(&mut ctx);
            c.clear(Color::BLACK);
            c.fade_to_white(c.rect(), 128);
        }
        let p = px(&ctx, 0, 0);
        assert_eq!((p.r, p.g, p.b), (128, 128, 128));
    }
}
