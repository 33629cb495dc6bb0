//! Backend seam.
//!
//! A [`Backend`] is a thin, GL-flavoured command interface: resource names,
//! binding points and a small pipeline state vector. Canvas code never talks
//! to a backend directly; it goes through [`super::GpuContext`], which checks
//! for errors after every call.

use std::num::NonZeroU32;

use crate::coords::{PixelPoint, PixelRect, PixelSize, Vec2};

use super::GpuError;

/// Backend resource name. Zero is never a valid name.
pub type RawId = NonZeroU32;

/// What a backend can do natively.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BackendCaps {
    /// Buffers can be mapped into host memory for writing.
    pub map_buffer: bool,
    /// Textures may have non-power-of-two dimensions.
    pub npot_textures: bool,
    pub max_texture_size: u32,
}

impl Default for BackendCaps {
    fn default() -> Self {
        Self { map_buffer: true, npot_textures: true, max_texture_size: 8192 }
    }
}

// ── pipeline state enums ─────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    Blend,
    StencilTest,
    ScissorTest,
}

impl Capability {
    pub const ALL: [Capability; 3] =
        [Capability::Blend, Capability::StencilTest, Capability::ScissorTest];

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
    OneMinusDstColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StencilFunc {
    Never,
    Always,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl StencilFunc {
    /// GL semantics: `(reference & mask) FUNC (stored & mask)`.
    #[inline]
    pub fn passes(self, reference: u8, stored: u8, mask: u8) -> bool {
        let r = reference & mask;
        let s = stored & mask;
        match self {
            StencilFunc::Never => false,
            StencilFunc::Always => true,
            StencilFunc::Equal => r == s,
            StencilFunc::NotEqual => r != s,
            StencilFunc::Less => r < s,
            StencilFunc::LessEqual => r <= s,
            StencilFunc::Greater => r > s,
            StencilFunc::GreaterEqual => r >= s,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    Invert,
    Increment,
    Decrement,
}

impl StencilOp {
    /// New stencil value before the write mask is applied.
    #[inline]
    pub fn apply(self, stored: u8, reference: u8) -> u8 {
        match self {
            StencilOp::Keep => stored,
            StencilOp::Zero => 0,
            StencilOp::Replace => reference,
            StencilOp::Invert => !stored,
            StencilOp::Increment => stored.saturating_add(1),
            StencilOp::Decrement => stored.saturating_sub(1),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ColorMask {
    pub r: bool,
    pub g: bool,
    pub b: bool,
    pub a: bool,
}

impl ColorMask {
    pub const ALL: ColorMask = ColorMask { r: true, g: true, b: true, a: true };
    pub const NONE: ColorMask = ColorMask { r: false, g: false, b: false, a: false };
    pub const RGB: ColorMask = ColorMask { r: true, g: true, b: true, a: false };

    #[inline]
    pub const fn as_array(self) -> [bool; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Primitive {
    Triangles,
    TriangleStrip,
    TriangleFan,
    Lines,
    LineStrip,
    LineLoop,
}

impl Primitive {
    #[inline]
    pub const fn is_line(self) -> bool {
        matches!(self, Primitive::Lines | Primitive::LineStrip | Primitive::LineLoop)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

impl BufferTarget {
    #[inline]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

/// Texel layouts accepted by `tex_image`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit luminance, sampled as opaque gray.
    Gray,
    Rgb,
    Rgba,
    /// 8-bit coverage, sampled as alpha only.
    Alpha,
}

impl PixelFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray | PixelFormat::Alpha => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

// ── programs and uniforms ────────────────────────────────────────────────

/// The fixed set of fragment programs the canvas uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Flat `color` uniform.
    Solid,
    /// Texel as-is.
    Texture,
    /// `color.rgb` with `color.a * texel.a`; used for glyph coverage.
    Alpha,
    /// `texel * color`.
    CombineTexture,
    /// `1 - texel.rgb`.
    Invert,
    /// Solid color with fragments discarded outside the dash pattern.
    Dashed,
    /// Disc: `color1` inside `radius1`, `color2` up to `radius2`.
    FilledCircle,
    /// Ring between `radius1` and `radius2` in `color`.
    CircleOutline,
}

impl ProgramKind {
    pub const ALL: [ProgramKind; 8] = [
        ProgramKind::Solid,
        ProgramKind::Texture,
        ProgramKind::Alpha,
        ProgramKind::CombineTexture,
        ProgramKind::Invert,
        ProgramKind::Dashed,
        ProgramKind::FilledCircle,
        ProgramKind::CircleOutline,
    ];

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            ProgramKind::Solid => "solid",
            ProgramKind::Texture => "texture",
            ProgramKind::Alpha => "alpha",
            ProgramKind::CombineTexture => "combine_texture",
            ProgramKind::Invert => "invert",
            ProgramKind::Dashed => "dashed",
            ProgramKind::FilledCircle => "filled_circle",
            ProgramKind::CircleOutline => "circle_outline",
        }
    }

    #[inline]
    pub const fn samples_texture(self) -> bool {
        matches!(
            self,
            ProgramKind::Texture | ProgramKind::Alpha | ProgramKind::CombineTexture | ProgramKind::Invert
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Uniform {
    /// Pixel offset added after the modelview transform.
    Translate,
    Modelview,
    Color,
    DashPeriod,
    DashRatio,
    /// Dash origin in NDC.
    DashStart,
    CircleCenter,
    CircleRadius1,
    CircleRadius2,
    CircleColor1,
    CircleColor2,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
}

/// Per-program uniform storage shared by the backends.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct UniformBlock {
    pub translate: [f32; 2],
    pub modelview: glam::Mat4,
    pub color: [f32; 4],
    pub dash_period: f32,
    pub dash_ratio: f32,
    pub dash_start: [f32; 2],
    pub circle_center: [f32; 2],
    pub radius1: f32,
    pub radius2: f32,
    pub color1: [f32; 4],
    pub color2: [f32; 4],
}

impl Default for UniformBlock {
    fn default() -> Self {
        Self {
            translate: [0.0; 2],
            modelview: glam::Mat4::IDENTITY,
            color: [1.0; 4],
            dash_period: 1.0,
            dash_ratio: 1.0,
            dash_start: [0.0; 2],
            circle_center: [0.0; 2],
            radius1: 0.0,
            radius2: 0.0,
            color1: [1.0; 4],
            color2: [1.0; 4],
        }
    }
}

impl UniformBlock {
    /// Stores `value`, rejecting a value of the wrong shape.
    pub fn set(&mut self, uniform: Uniform, value: UniformValue) -> Result<(), GpuError> {
        use UniformValue::*;
        match (uniform, value) {
            (Uniform::Translate, Vec2(v)) => self.translate = v,
            (Uniform::Modelview, Mat4(m)) => self.modelview = glam::Mat4::from_cols_array(&m),
            (Uniform::Color, Vec4(c)) => self.color = c,
            (Uniform::DashPeriod, Float(f)) => self.dash_period = f,
            (Uniform::DashRatio, Float(f)) => self.dash_ratio = f,
            (Uniform::DashStart, Vec2(v)) => self.dash_start = v,
            (Uniform::CircleCenter, Vec2(v)) => self.circle_center = v,
            (Uniform::CircleRadius1, Float(f)) => self.radius1 = f,
            (Uniform::CircleRadius2, Float(f)) => self.radius2 = f,
            (Uniform::CircleColor1, Vec4(c)) => self.color1 = c,
            (Uniform::CircleColor2, Vec4(c)) => self.color2 = c,
            _ => return Err(GpuError::InvalidOperation("uniform type mismatch")),
        }
        Ok(())
    }

    /// Vertex transform: modelview, then translate.
    #[inline]
    pub fn transform(&self, p: Vec2) -> Vec2 {
        let v = self.modelview.transform_point3(glam::Vec3::new(p.x, p.y, 0.0));
        Vec2::new(v.x + self.translate[0], v.y + self.translate[1])
    }
}

// ── state vector ─────────────────────────────────────────────────────────

/// The fixed-function state every draw call snapshots.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RasterState {
    pub enabled: [bool; 3],
    pub blend_src: BlendFactor,
    pub blend_dst: BlendFactor,
    pub blend_color: [f32; 4],
    pub color_mask: ColorMask,
    pub stencil_func: StencilFunc,
    pub stencil_ref: u8,
    pub stencil_value_mask: u8,
    pub stencil_fail: StencilOp,
    pub stencil_zfail: StencilOp,
    pub stencil_pass: StencilOp,
    pub stencil_write_mask: u8,
    pub scissor: PixelRect,
    pub line_width: f32,
    pub viewport: PixelSize,
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            enabled: [false; 3],
            blend_src: BlendFactor::One,
            blend_dst: BlendFactor::Zero,
            blend_color: [0.0; 4],
            color_mask: ColorMask::ALL,
            stencil_func: StencilFunc::Always,
            stencil_ref: 0,
            stencil_value_mask: 0xff,
            stencil_fail: StencilOp::Keep,
            stencil_zfail: StencilOp::Keep,
            stencil_pass: StencilOp::Keep,
            stencil_write_mask: 0xff,
            scissor: PixelRect::default(),
            line_width: 1.0,
            viewport: PixelSize::default(),
        }
    }
}

impl RasterState {
    #[inline]
    pub fn is_enabled(&self, cap: Capability) -> bool {
        self.enabled[cap.index()]
    }
}

/// Where a draw call takes its vertex positions from.
#[derive(Debug, Copy, Clone)]
pub enum VertexSource<'a> {
    /// Host-side arrays.
    Client { positions: &'a [Vec2], texcoords: Option<&'a [Vec2]> },
    /// Tightly packed `f32` pairs in the bound array buffer.
    Bound,
}

impl<'a> VertexSource<'a> {
    #[inline]
    pub fn positions(positions: &'a [Vec2]) -> Self {
        VertexSource::Client { positions, texcoords: None }
    }

    #[inline]
    pub fn textured(positions: &'a [Vec2], texcoords: &'a [Vec2]) -> Self {
        VertexSource::Client { positions, texcoords: Some(texcoords) }
    }
}

/// GL-style command interface implemented by the software rasterizer and
/// the wgpu recorder.
///
/// Calls never fail directly; failures are queued and surfaced through
/// [`Backend::take_error`].
pub trait Backend {
    fn caps(&self) -> BackendCaps;

    /// Pops the oldest pending error.
    fn take_error(&mut self) -> Option<GpuError>;

    // buffers
    fn create_buffer(&mut self) -> Option<RawId>;
    fn delete_buffer(&mut self, id: RawId);
    fn bind_buffer(&mut self, target: BufferTarget, id: Option<RawId>);
    /// Replaces the storage of the buffer bound to `target`.
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]);
    /// Maps the bound buffer with fresh storage of `size` bytes.
    fn map_buffer(&mut self, target: BufferTarget, size: usize) -> bool;
    fn mapped_bytes(&mut self, target: BufferTarget) -> Option<&mut [u8]>;
    fn unmap_buffer(&mut self, target: BufferTarget);

    // textures
    fn create_texture(&mut self) -> Option<RawId>;
    fn delete_texture(&mut self, id: RawId);
    fn bind_texture(&mut self, id: Option<RawId>);
    /// (Re)allocates the bound texture. `data`, when present, must cover `size`.
    fn tex_image(&mut self, format: PixelFormat, size: PixelSize, data: Option<&[u8]>);
    fn tex_sub_image(&mut self, format: PixelFormat, origin: PixelPoint, size: PixelSize, data: &[u8]);

    // programs
    fn create_program(&mut self, kind: ProgramKind) -> Result<RawId, GpuError>;
    fn delete_program(&mut self, id: RawId);
    fn use_program(&mut self, id: Option<RawId>);
    fn uniform(&mut self, program: RawId, uniform: Uniform, value: UniformValue);

    // fixed-function state
    fn set_capability(&mut self, cap: Capability, enabled: bool);
    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor);
    fn blend_color(&mut self, color: [f32; 4]);
    fn color_mask(&mut self, mask: ColorMask);
    fn stencil_func(&mut self, func: StencilFunc, reference: u8, mask: u8);
    fn stencil_op(&mut self, fail: StencilOp, zfail: StencilOp, pass: StencilOp);
    fn stencil_mask(&mut self, mask: u8);
    fn scissor(&mut self, rect: PixelRect);
    fn line_width(&mut self, width: f32);
    fn viewport(&mut self, size: PixelSize);

    /// Clears color and/or stencil, honouring the color mask, stencil write
    /// mask and scissor like a GL clear.
    fn clear(&mut self, color: Option<[f32; 4]>, stencil: Option<u8>);

    fn draw_arrays(&mut self, primitive: Primitive, source: VertexSource<'_>, first: usize, count: usize);
    /// Indexed draw; indices come from host memory.
    fn draw_elements(&mut self, primitive: Primitive, source: VertexSource<'_>, indices: &[u16]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stencil_equal_respects_mask() {
        // EQUAL 1 with mask 3 needs bit 0 set and bit 1 clear.
        assert!(StencilFunc::Equal.passes(1, 0b01, 3));
        assert!(!StencilFunc::Equal.passes(1, 0b11, 3));
        // EQUAL 0 with mask 2 only looks at bit 1.
        assert!(StencilFunc::Equal.passes(0, 0b01, 2));
        assert!(!StencilFunc::Equal.passes(0, 0b10, 2));
    }

    #[test]
    fn stencil_ops() {
        assert_eq!(StencilOp::Replace.apply(0, 3), 3);
        assert_eq!(StencilOp::Zero.apply(7, 3), 0);
        assert_eq!(StencilOp::Keep.apply(7, 3), 7);
        assert_eq!(StencilOp::Increment.apply(255, 0), 255);
    }

    #[test]
    fn uniform_type_mismatch_is_rejected() {
        let mut block = UniformBlock::default();
        assert!(block.set(Uniform::Color, UniformValue::Float(1.0)).is_err());
        assert!(block.set(Uniform::Color, UniformValue::Vec4([0.5; 4])).is_ok());
        assert_eq!(block.color, [0.5; 4]);
    }

    #[test]
    fn transform_applies_modelview_then_translate() {
        let mut block = UniformBlock::default();
        block.translate = [10.0, 20.0];
        block.modelview = glam::Mat4::from_scale(glam::Vec3::new(2.0, 2.0, 1.0));
        assert_eq!(block.transform(Vec2::new(1.0, 1.0)), Vec2::new(12.0, 22.0));
    }
}
