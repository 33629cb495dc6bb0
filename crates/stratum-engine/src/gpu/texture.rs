use crate::coords::{PixelPoint, PixelRect, PixelSize, Vec2};
use crate::image::{ImageFormat, UncompressedImage};

use super::release::{Release, ReleaseQueue};
use super::{Backend, GpuContext, PixelFormat, Primitive, RawId, VertexSource};

/// Owned 2D texture.
///
/// `size` is what the caller asked for; `allocated` may be larger when the
/// backend needs power-of-two dimensions. Texture coordinates are always
/// computed against the allocated size.
#[derive(Debug)]
pub struct GpuTexture {
    id: RawId,
    format: PixelFormat,
    size: PixelSize,
    allocated: PixelSize,
    flipped: bool,
    releases: ReleaseQueue,
}

impl GpuTexture {
    /// Allocates a texture and uploads `data` (tightly packed rows, top row
    /// first) when given.
    ///
    /// Returns `None` for empty or oversized requests and when the backend
    /// reports an error during allocation.
    pub fn new<B: Backend>(
        ctx: &mut GpuContext<B>,
        format: PixelFormat,
        size: PixelSize,
        data: Option<&[u8]>,
    ) -> Option<Self> {
        if size.is_empty() {
            return None;
        }

        let caps = ctx.caps();
        let allocated = if caps.npot_textures { size } else { size.next_power_of_two() };
        if allocated.width > caps.max_texture_size || allocated.height > caps.max_texture_size {
            log::warn!(
                "texture {}x{} exceeds backend limit {}",
                allocated.width,
                allocated.height,
                caps.max_texture_size
            );
            return None;
        }

        let id = ctx.call("create_texture", |b| b.create_texture())?;
        let texture = Self {
            id,
            format,
            size,
            allocated,
            flipped: false,
            releases: ctx.releases().clone(),
        };

        let errors_before = ctx.error_count();
        texture.bind(ctx);
        if allocated == size {
            ctx.call("tex_image", |b| b.tex_image(format, size, data));
        } else {
            ctx.call("tex_image", |b| b.tex_image(format, allocated, None));
            if let Some(data) = data {
                ctx.call("tex_sub_image", |b| {
                    b.tex_sub_image(format, PixelPoint::default(), size, data)
                });
            }
        }

        if ctx.error_count() > errors_before {
            log::warn!("texture {}x{} allocation failed", size.width, size.height);
            return None;
        }
        Some(texture)
    }

    /// Marks the texture as stored bottom row first; draws swap V.
    #[inline]
    pub fn with_flipped(mut self, flipped: bool) -> Self {
        self.flipped = flipped;
        self
    }

    #[inline]
    pub fn id(&self) -> RawId {
        self.id
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn size(&self) -> PixelSize {
        self.size
    }

    #[inline]
    pub fn allocated_size(&self) -> PixelSize {
        self.allocated
    }

    #[inline]
    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    #[inline]
    pub fn bind<B: Backend>(&self, ctx: &mut GpuContext<B>) {
        debug_assert!(self.releases.is_shared_with(ctx.releases()));
        let id = self.id;
        ctx.call("bind_texture", |b| b.bind_texture(Some(id)));
    }

    /// Reallocates for `size`, discarding the contents. No-op if the size
    /// is unchanged.
    pub fn resize_discard<B: Backend>(&mut self, ctx: &mut GpuContext<B>, size: PixelSize) {
        if size == self.size || size.is_empty() {
            return;
        }
        let allocated = if ctx.caps().npot_textures { size } else { size.next_power_of_two() };
        self.bind(ctx);
        let format = self.format;
        ctx.call("tex_image", |b| b.tex_image(format, allocated, None));
        self.size = size;
        self.allocated = allocated;
    }

    /// Replaces a sub-rectangle of the texture.
    pub fn update<B: Backend>(&self, ctx: &mut GpuContext<B>, origin: PixelPoint, size: PixelSize, data: &[u8]) {
        self.bind(ctx);
        let format = self.format;
        ctx.call("tex_sub_image", |b| b.tex_sub_image(format, origin, size, data));
    }

    /// Texture coordinates of `src` (texels) against the allocated size.
    pub fn texcoords(&self, src: PixelRect) -> [Vec2; 4] {
        let w = self.allocated.width as f32;
        let h = self.allocated.height as f32;
        let u0 = src.left as f32 / w;
        let u1 = src.right as f32 / w;
        let (mut v0, mut v1) = (src.top as f32 / h, src.bottom as f32 / h);
        if self.flipped {
            std::mem::swap(&mut v0, &mut v1);
        }
        [Vec2::new(u0, v0), Vec2::new(u1, v0), Vec2::new(u0, v1), Vec2::new(u1, v1)]
    }

    /// Draws `src` (texels) into `dest` (canvas pixels) with the current
    /// program.
    pub fn draw<B: Backend>(&self, ctx: &mut GpuContext<B>, dest: PixelRect, src: PixelRect) {
        let positions = [
            dest.top_left().to_vec2(),
            dest.top_right().to_vec2(),
            dest.bottom_left().to_vec2(),
            dest.bottom_right().to_vec2(),
        ];
        let texcoords = self.texcoords(src);
        self.bind(ctx);
        ctx.draw_arrays(Primitive::TriangleStrip, VertexSource::textured(&positions, &texcoords), 0, 4);
    }

    /// Draws the whole texture at its natural size.
    #[inline]
    pub fn draw_at<B: Backend>(&self, ctx: &mut GpuContext<B>, dest: PixelPoint) {
        self.draw(ctx, PixelRect::from_origin_size(dest, self.size), PixelRect::from_size(self.size));
    }
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        self.releases.push(Release::Texture(self.id));
    }
}

/// Uploads a decoded image as a color texture. `None` for invalid images.
pub fn import_texture<B: Backend>(ctx: &mut GpuContext<B>, image: &UncompressedImage) -> Option<GpuTexture> {
    let format = match image.format() {
        ImageFormat::Invalid => return None,
        ImageFormat::Gray => PixelFormat::Gray,
        ImageFormat::Rgb => PixelFormat::Rgb,
        ImageFormat::Rgba => PixelFormat::Rgba,
    };
    let data = image.packed_rows();
    GpuTexture::new(ctx, format, image.size(), Some(&data)).map(|t| t.with_flipped(image.is_flipped()))
}

/// Uploads a grayscale image as an alpha-only texture. `None` for any
/// other format.
pub fn import_alpha_texture<B: Backend>(ctx: &mut GpuContext<B>, image: &UncompressedImage) -> Option<GpuTexture> {
    if image.format() != ImageFormat::Gray {
        return None;
    }
    let data = image.packed_rows();
    GpuTexture::new(ctx, PixelFormat::Alpha, image.size(), Some(&data)).map(|t| t.with_flipped(image.is_flipped()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::software::SoftwareBackend;
    use crate::gpu::{BackendCaps, GpuError};

    fn ctx(npot: bool) -> GpuContext<SoftwareBackend> {
        let caps = BackendCaps { npot_textures: npot, max_texture_size: 256, ..BackendCaps::default() };
        GpuContext::new(SoftwareBackend::with_caps(PixelSize::new(8, 8), caps), PixelSize::new(8, 8)).unwrap()
    }

    // ── allocation ───────────────────────────────────────────────────────

    #[test]
    fn npot_backend_allocates_exact_size() {
        let mut ctx = ctx(true);
        let t = GpuTexture::new(&mut ctx, PixelFormat::Rgba, PixelSize::new(100, 30), None).unwrap();
        assert_eq!(t.allocated_size(), PixelSize::new(100, 30));
    }

    #[test]
    fn pot_backend_rounds_up() {
        let mut ctx = ctx(false);
        let t = GpuTexture::new(&mut ctx, PixelFormat::Rgba, PixelSize::new(100, 30), None).unwrap();
        assert_eq!(t.size(), PixelSize::new(100, 30));
        assert_eq!(t.allocated_size(), PixelSize::new(128, 32));
    }

    #[test]
    fn oversized_and_empty_requests_fail() {
        let mut ctx = ctx(true);
        assert!(GpuTexture::new(&mut ctx, PixelFormat::Gray, PixelSize::new(512, 1), None).is_none());
        assert!(GpuTexture::new(&mut ctx, PixelFormat::Gray, PixelSize::new(0, 1), None).is_none());
        assert_eq!(ctx.backend().live_textures(), 0);
    }

    #[test]
    fn backend_oom_yields_none_and_releases_name() {
        let mut ctx = ctx(true);
        ctx.backend_mut().fail_next_texture_allocation();
        assert!(GpuTexture::new(&mut ctx, PixelFormat::Rgb, PixelSize::new(4, 4), None).is_none());
        assert!(matches!(ctx.last_error(), Some(GpuError::OutOfMemory(_))));

        ctx.collect();
        assert_eq!(ctx.backend().live_textures(), 0);
    }

    // ── texcoords ────────────────────────────────────────────────────────

    #[test]
    fn texcoords_use_allocated_size() {
        let mut ctx = ctx(false);
        let t = GpuTexture::new(&mut ctx, PixelFormat::Rgba, PixelSize::new(3, 3), None).unwrap();
        let tc = t.texcoords(PixelRect::new(0, 0, 3, 3));
        assert_eq!(tc[0], Vec2::new(0.0, 0.0));
        assert_eq!(tc[3], Vec2::new(0.75, 0.75));
    }

    #[test]
    fn flipped_texture_swaps_v() {
        let mut ctx = ctx(true);
        let t = GpuTexture::new(&mut ctx, PixelFormat::Rgba, PixelSize::new(4, 4), None)
            .unwrap()
            .with_flipped(true);
        let tc = t.texcoords(PixelRect::new(0, 0, 4, 4));
        assert_eq!(tc[0], Vec2::new(0.0, 1.0));
        assert_eq!(tc[2], Vec2::new(0.0, 0.0));
    }

    // ── import ───────────────────────────────────────────────────────────

    #[test]
    fn import_invalid_image_is_none() {
        let mut ctx = ctx(true);
        assert!(import_texture(&mut ctx, &UncompressedImage::invalid()).is_none());
    }

    #[test]
    fn alpha_import_requires_gray() {
        let mut ctx = ctx(true);
        let rgb = UncompressedImage::new(ImageFormat::Rgb, PixelSize::new(2, 1), 6, vec![0; 6]);
        assert!(import_alpha_texture(&mut ctx, &rgb).is_none());

        let gray = UncompressedImage::new(ImageFormat::Gray, PixelSize::new(2, 1), 2, vec![0, 255]);
        let t = import_alpha_texture(&mut ctx, &gray).unwrap();
        assert_eq!(t.format(), PixelFormat::Alpha);
    }

    #[test]
    fn import_repacks_padded_rows() {
        let mut ctx = ctx(true);
        // 2x2 RGB with a 2-byte row pad.
        let pixels = vec![
            1, 2, 3, 4, 5, 6, 0, 0, //
            7, 8, 9, 10, 11, 12, 0, 0,
        ];
        let image = UncompressedImage::new(ImageFormat::Rgb, PixelSize::new(2, 2), 8, pixels);
        let t = import_texture(&mut ctx, &image).unwrap();
        let texels = ctx.backend().texture_contents(t.id()).unwrap();
        assert_eq!(texels, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }
}
