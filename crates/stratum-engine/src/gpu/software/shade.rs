//! Fragment programs and per-fragment operations.

use crate::coords::{PixelSize, Vec2};
use crate::gpu::{BlendFactor, PixelFormat, ProgramKind, RasterState, UniformBlock};

/// Texture storage: native texel layout, rows tightly packed.
#[derive(Debug, Clone, Default)]
pub(super) struct SoftTexture {
    pub format: Option<PixelFormat>,
    pub size: PixelSize,
    pub data: Vec<u8>,
}

impl SoftTexture {
    /// Nearest-neighbour sample with clamp-to-edge.
    pub fn sample(&self, uv: Vec2) -> [f32; 4] {
        let Some(format) = self.format else {
            return [0.0, 0.0, 0.0, 1.0];
        };
        if self.size.is_empty() {
            return [0.0, 0.0, 0.0, 1.0];
        }

        let w = self.size.width as i32;
        let h = self.size.height as i32;
        let x = ((uv.x * w as f32).floor() as i32).clamp(0, w - 1) as usize;
        let y = ((uv.y * h as f32).floor() as i32).clamp(0, h - 1) as usize;

        let bpp = format.bytes_per_pixel();
        let i = (y * self.size.width as usize + x) * bpp;
        let t = |k: usize| self.data.get(i + k).copied().unwrap_or(0) as f32 / 255.0;

        match format {
            PixelFormat::Gray => [t(0), t(0), t(0), 1.0],
            PixelFormat::Rgb => [t(0), t(1), t(2), 1.0],
            PixelFormat::Rgba => [t(0), t(1), t(2), t(3)],
            PixelFormat::Alpha => [0.0, 0.0, 0.0, t(0)],
        }
    }
}

/// Runs `kind` for the fragment at pixel centre `p`. `None` discards.
pub(super) fn shade(
    kind: ProgramKind,
    u: &UniformBlock,
    p: Vec2,
    uv: Vec2,
    texture: Option<&SoftTexture>,
    viewport: PixelSize,
) -> Option<[f32; 4]> {
    let texel = || texture.map(|t| t.sample(uv)).unwrap_or([0.0, 0.0, 0.0, 1.0]);

    match kind {
        ProgramKind::Solid => Some(u.color),
        ProgramKind::Texture => Some(texel()),
        ProgramKind::Alpha => {
            let t = texel();
            Some([u.color[0], u.color[1], u.color[2], u.color[3] * t[3]])
        }
        ProgramKind::CombineTexture => {
            let t = texel();
            Some([t[0] * u.color[0], t[1] * u.color[1], t[2] * u.color[2], t[3] * u.color[3]])
        }
        ProgramKind::Invert => {
            let t = texel();
            Some([1.0 - t[0], 1.0 - t[1], 1.0 - t[2], t[3]])
        }
        ProgramKind::Dashed => {
            let w = viewport.width.max(1) as f32;
            let h = viewport.height.max(1) as f32;
            let ndc = Vec2::new(p.x / w * 2.0 - 1.0, 1.0 - p.y / h * 2.0);
            let d = ndc - Vec2::new(u.dash_start[0], u.dash_start[1]);
            let distance = Vec2::new(d.x * w * 0.5, d.y * h * 0.5).length();
            if distance.rem_euclid(u.dash_period) > u.dash_period * u.dash_ratio {
                None
            } else {
                Some(u.color)
            }
        }
        ProgramKind::FilledCircle => {
            let d2 = circle_distance2(u, p);
            if d2 > u.radius2 * u.radius2 {
                None
            } else if d2 >= u.radius1 * u.radius1 {
                Some(u.color2)
            } else {
                Some(u.color1)
            }
        }
        ProgramKind::CircleOutline => {
            let d2 = circle_distance2(u, p);
            if d2 < u.radius1 * u.radius1 || d2 > u.radius2 * u.radius2 {
                None
            } else {
                Some(u.color)
            }
        }
    }
}

/// Squared distance from the circle centre, measured in untranslated
/// canvas space like the vertex positions.
#[inline]
fn circle_distance2(u: &UniformBlock, p: Vec2) -> f32 {
    let local = Vec2::new(p.x - u.translate[0], p.y - u.translate[1]);
    let d = local - Vec2::new(u.circle_center[0], u.circle_center[1]);
    d.dot(d)
}

#[inline]
fn factor(f: BlendFactor, src: [f32; 4], dst: [f32; 4], constant: [f32; 4], channel: usize) -> f32 {
    match f {
        BlendFactor::Zero => 0.0,
        BlendFactor::One => 1.0,
        BlendFactor::SrcAlpha => src[3],
        BlendFactor::OneMinusSrcAlpha => 1.0 - src[3],
        BlendFactor::DstColor => dst[channel],
        BlendFactor::OneMinusDstColor => 1.0 - dst[channel],
        BlendFactor::ConstantAlpha => constant[3],
        BlendFactor::OneMinusConstantAlpha => 1.0 - constant[3],
    }
}

#[inline]
pub(crate) fn to_unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Blending and color mask, producing the new framebuffer value.
pub(super) fn write_color(state: &RasterState, src: [f32; 4], dst: [u8; 4]) -> [u8; 4] {
    let d = dst.map(|c| c as f32 / 255.0);
    let blend = state.is_enabled(crate::gpu::Capability::Blend);
    let mask = state.color_mask.as_array();

    let mut out = dst;
    for ch in 0..4 {
        if !mask[ch] {
            continue;
        }
        let v = if blend {
            src[ch] * factor(state.blend_src, src, d, state.blend_color, ch)
                + d[ch] * factor(state.blend_dst, src, d, state.blend_color, ch)
        } else {
            src[ch]
        };
        out[ch] = to_unorm8(v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{Capability, ColorMask};

    fn centre(x: f32, y: f32) -> Vec2 {
        Vec2::new(x + 0.5, y + 0.5)
    }

    #[test]
    fn filled_circle_uses_pen_color_at_rim() {
        let mut u = UniformBlock::default();
        u.circle_center = [10.0, 10.0];
        u.radius1 = 4.0;
        u.radius2 = 6.0;
        u.color1 = [1.0, 0.0, 0.0, 1.0];
        u.color2 = [0.0, 0.0, 1.0, 1.0];
        let vp = PixelSize::new(32, 32);

        assert_eq!(shade(ProgramKind::FilledCircle, &u, centre(10.0, 10.0), Vec2::zero(), None, vp), Some(u.color1));
        assert_eq!(shade(ProgramKind::FilledCircle, &u, centre(15.0, 10.0), Vec2::zero(), None, vp), Some(u.color2));
        assert_eq!(shade(ProgramKind::FilledCircle, &u, centre(17.0, 10.0), Vec2::zero(), None, vp), None);
    }

    #[test]
    fn circle_outline_discards_inside() {
        let mut u = UniformBlock::default();
        u.circle_center = [10.0, 10.0];
        u.radius1 = 4.0;
        u.radius2 = 6.0;
        let vp = PixelSize::new(32, 32);
        assert_eq!(shade(ProgramKind::CircleOutline, &u, centre(10.0, 10.0), Vec2::zero(), None, vp), None);
        assert!(shade(ProgramKind::CircleOutline, &u, centre(14.0, 10.0), Vec2::zero(), None, vp).is_some());
    }

    #[test]
    fn dashed_gaps_follow_period() {
        let vp = PixelSize::new(64, 64);
        let mut u = UniformBlock::default();
        u.dash_period = 32.0;
        u.dash_ratio = 0.6;
        // Start at the centre of pixel (0, 0); 10 px along is "on", 25 px is "off".
        u.dash_start = [-1.0 + 0.5 / 32.0, 1.0 - 0.5 / 32.0];
        assert!(shade(ProgramKind::Dashed, &u, centre(10.0, 0.0), Vec2::zero(), None, vp).is_some());
        assert!(shade(ProgramKind::Dashed, &u, centre(25.0, 0.0), Vec2::zero(), None, vp).is_none());
        assert!(shade(ProgramKind::Dashed, &u, centre(34.0, 0.0), Vec2::zero(), None, vp).is_some());
    }

    #[test]
    fn alpha_texture_sample() {
        let t = SoftTexture { format: Some(PixelFormat::Alpha), size: PixelSize::new(2, 1), data: vec![0, 255] };
        assert_eq!(t.sample(Vec2::new(0.75, 0.5)), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(t.sample(Vec2::new(0.25, 0.5))[3], 0.0);
    }

    #[test]
    fn over_blend_and_mask() {
        let mut state = RasterState::default();
        state.enabled[Capability::Blend.index()] = true;
        state.blend_src = BlendFactor::SrcAlpha;
        state.blend_dst = BlendFactor::OneMinusSrcAlpha;

        let out = write_color(&state, [1.0, 0.0, 0.0, 0.5], [0, 0, 255, 255]);
        assert_eq!(out, [128, 0, 128, 191]);

        state.color_mask = ColorMask::NONE;
        assert_eq!(write_color(&state, [1.0, 0.0, 0.0, 0.5], [0, 0, 255, 255]), [0, 0, 255, 255]);
    }

    #[test]
    fn invert_blend_flips_rgb() {
        let mut state = RasterState::default();
        state.enabled[Capability::Blend.index()] = true;
        state.blend_src = BlendFactor::OneMinusDstColor;
        state.blend_dst = BlendFactor::Zero;
        state.color_mask = ColorMask::RGB;
        let out = write_color(&state, [1.0; 4], [255, 0, 64, 255]);
        assert_eq!(out, [0, 255, 191, 255]);
    }
}
