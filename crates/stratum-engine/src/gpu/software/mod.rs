//! CPU reference backend.
//!
//! Rasterizes into an RGBA8 color buffer and an 8-bit stencil buffer with
//! GL fragment semantics: shading (and discard) first, then the stencil
//! test and its operations, then blending under the color mask. Used for
//! headless rendering and as the ground truth in tests.

mod raster;
mod shade;

use std::collections::{HashMap, VecDeque};

use crate::coords::{PixelPoint, PixelRect, PixelSize, Vec2};
use crate::paint::Color;

use super::{
    Backend, BackendCaps, BlendFactor, BufferTarget, Capability, ColorMask, GpuError, PixelFormat,
    Primitive, ProgramKind, RasterState, RawId, StencilFunc, StencilOp, Uniform, UniformBlock,
    UniformValue, VertexSource,
};
use raster::{Bounds, RasterVertex};
use shade::SoftTexture;

pub(crate) use shade::to_unorm8;

#[derive(Debug, Default)]
struct SoftBuffer {
    data: Vec<u8>,
    mapped: bool,
}

#[derive(Debug)]
struct SoftProgram {
    kind: ProgramKind,
    uniforms: UniformBlock,
}

/// Live/created counters per resource class.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ResourceStats {
    pub buffers_created: u64,
    pub buffers_deleted: u64,
    pub textures_created: u64,
    pub textures_deleted: u64,
    pub programs_created: u64,
    pub programs_deleted: u64,
}

/// Software rasterizer implementing [`Backend`].
pub struct SoftwareBackend {
    caps: BackendCaps,
    size: PixelSize,
    color: Vec<[u8; 4]>,
    stencil: Vec<u8>,

    next_id: u32,
    buffers: HashMap<RawId, SoftBuffer>,
    textures: HashMap<RawId, SoftTexture>,
    programs: HashMap<RawId, SoftProgram>,

    bound_buffers: [Option<RawId>; 2],
    bound_texture: Option<RawId>,
    current_program: Option<RawId>,
    state: RasterState,

    errors: VecDeque<GpuError>,
    stats: ResourceStats,
    draw_calls: u64,
    last_primitive: Option<Primitive>,
    fail_texture_allocation: bool,
    fail_link: Option<ProgramKind>,
}

impl SoftwareBackend {
    pub fn new(size: PixelSize) -> Self {
        Self::with_caps(size, BackendCaps::default())
    }

    pub fn with_caps(size: PixelSize, caps: BackendCaps) -> Self {
        let mut state = RasterState::default();
        state.viewport = size;
        state.scissor = PixelRect::from_size(size);
        Self {
            caps,
            size,
            color: vec![[0; 4]; size.area()],
            stencil: vec![0; size.area()],
            next_id: 0,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            programs: HashMap::new(),
            bound_buffers: [None; 2],
            bound_texture: None,
            current_program: None,
            state,
            errors: VecDeque::new(),
            stats: ResourceStats::default(),
            draw_calls: 0,
            last_primitive: None,
            fail_texture_allocation: false,
            fail_link: None,
        }
    }

    /// Reallocates the framebuffer; contents are cleared.
    pub fn resize(&mut self, size: PixelSize) {
        self.size = size;
        self.color = vec![[0; 4]; size.area()];
        self.stencil = vec![0; size.area()];
    }

    // ── inspection ───────────────────────────────────────────────────────

    #[inline]
    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// Color at `(x, y)`; transparent black outside the framebuffer.
    pub fn pixel(&self, x: i32, y: i32) -> Color {
        self.index(x, y).map(|i| Color::from_array(self.color[i])).unwrap_or_default()
    }

    pub fn stencil_at(&self, x: i32, y: i32) -> u8 {
        self.index(x, y).map(|i| self.stencil[i]).unwrap_or(0)
    }

    #[inline]
    pub fn pixels(&self) -> &[[u8; 4]] {
        &self.color
    }

    #[inline]
    pub fn stencil_buffer(&self) -> &[u8] {
        &self.stencil
    }

    /// Number of pixels equal to `color`.
    pub fn count_color(&self, color: Color) -> usize {
        let c = color.to_array();
        self.color.iter().filter(|&&p| p == c).count()
    }

    #[inline]
    pub fn state(&self) -> &RasterState {
        &self.state
    }

    pub fn uniforms(&self, program: RawId) -> Option<&UniformBlock> {
        self.programs.get(&program).map(|p| &p.uniforms)
    }

    pub fn buffer_contents(&self, id: RawId) -> Option<&[u8]> {
        self.buffers.get(&id).map(|b| b.data.as_slice())
    }

    pub fn texture_contents(&self, id: RawId) -> Option<&[u8]> {
        self.textures.get(&id).map(|t| t.data.as_slice())
    }

    #[inline]
    pub fn bound_buffer(&self, target: BufferTarget) -> Option<RawId> {
        self.bound_buffers[target.index()]
    }

    #[inline]
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    #[inline]
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    #[inline]
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    #[inline]
    pub fn stats(&self) -> ResourceStats {
        self.stats
    }

    #[inline]
    pub fn draw_call_count(&self) -> u64 {
        self.draw_calls
    }

    /// Primitive of the most recent accepted draw.
    pub fn last_primitive(&self) -> Option<Primitive> {
        self.last_primitive
    }

    // ── fault injection ──────────────────────────────────────────────────

    /// Queues `err` as if the last call had raised it.
    pub fn inject_error(&mut self, err: GpuError) {
        self.errors.push_back(err);
    }

    /// The next `tex_image` reports out-of-memory instead of allocating.
    pub fn fail_next_texture_allocation(&mut self) {
        self.fail_texture_allocation = true;
    }

    /// Linking `kind` fails until cleared.
    pub fn fail_program_link(&mut self, kind: Option<ProgramKind>) {
        self.fail_link = kind;
    }

    // ── internals ────────────────────────────────────────────────────────

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let in_range = x >= 0 && y >= 0 && (x as u32) < self.size.width && (y as u32) < self.size.height;
        in_range.then(|| y as usize * self.size.width as usize + x as usize)
    }

    #[inline]
    fn error(&mut self, err: GpuError) {
        self.errors.push_back(err);
    }

    fn alloc_id(&mut self) -> Option<RawId> {
        self.next_id = self.next_id.checked_add(1)?;
        RawId::new(self.next_id)
    }

    fn bound_buffer_mut(&mut self, target: BufferTarget) -> Option<&mut SoftBuffer> {
        let id = self.bound_buffers[target.index()]?;
        self.buffers.get_mut(&id)
    }

    /// Pixels writable by the next draw or clear.
    fn bounds(&self) -> Bounds {
        let vp = self.state.viewport;
        let mut b = Bounds {
            x0: 0,
            y0: 0,
            x1: vp.width.min(self.size.width) as i32,
            y1: vp.height.min(self.size.height) as i32,
        };
        if self.state.is_enabled(Capability::ScissorTest) {
            let s = self.state.scissor;
            b.x0 = b.x0.max(s.left);
            b.y0 = b.y0.max(s.top);
            b.x1 = b.x1.min(s.right);
            b.y1 = b.y1.min(s.bottom);
        }
        b
    }

    fn vertex_positions<'a>(&mut self, source: &VertexSource<'a>) -> Option<(Vec<Vec2>, Option<Vec<Vec2>>)> {
        match *source {
            VertexSource::Client { positions, texcoords } => {
                Some((positions.to_vec(), texcoords.map(|t| t.to_vec())))
            }
            VertexSource::Bound => {
                let Some(buffer) = self.bound_buffer_mut(BufferTarget::Array) else {
                    self.error(GpuError::InvalidOperation("no array buffer bound"));
                    return None;
                };
                if buffer.mapped {
                    self.error(GpuError::InvalidOperation("array buffer is mapped"));
                    return None;
                }
                let positions = buffer
                    .data
                    .chunks_exact(8)
                    .map(|c| bytemuck::pod_read_unaligned::<Vec2>(c))
                    .collect();
                Some((positions, None))
            }
        }
    }

    fn draw(&mut self, primitive: Primitive, source: VertexSource<'_>, order: Vec<usize>) {
        let Some(program) = self.current_program.and_then(|id| self.programs.get(&id)) else {
            self.error(GpuError::InvalidOperation("draw without a program"));
            return;
        };
        let kind = program.kind;
        let uniforms = program.uniforms;

        let texture = if kind.samples_texture() {
            match self.bound_texture.and_then(|id| self.textures.get(&id)) {
                Some(t) => Some(t.clone()),
                None => {
                    self.error(GpuError::InvalidOperation("textured draw without a texture"));
                    return;
                }
            }
        } else {
            None
        };

        let Some((positions, texcoords)) = self.vertex_positions(&source) else {
            return;
        };
        if order.iter().any(|&i| i >= positions.len()) {
            self.error(GpuError::InvalidValue("vertex index out of range"));
            return;
        }

        let vertices: Vec<RasterVertex> = order
            .iter()
            .map(|&i| RasterVertex {
                pos: uniforms.transform(positions[i]),
                uv: texcoords.as_ref().and_then(|t| t.get(i).copied()).unwrap_or_default(),
            })
            .collect();

        let bounds = self.bounds();
        self.draw_calls += 1;
        self.last_primitive = Some(primitive);
        if bounds.is_empty() {
            return;
        }

        let mut fragments = Vec::new();
        let mut push = |x: i32, y: i32, uv: Vec2| fragments.push((x, y, uv));
        let v = &vertices;
        match primitive {
            Primitive::Triangles => {
                for t in v.chunks_exact(3) {
                    raster::triangle(t[0], t[1], t[2], bounds, &mut push);
                }
            }
            Primitive::TriangleStrip => {
                for i in 0..v.len().saturating_sub(2) {
                    let (a, b) = if i % 2 == 0 { (v[i], v[i + 1]) } else { (v[i + 1], v[i]) };
                    raster::triangle(a, b, v[i + 2], bounds, &mut push);
                }
            }
            Primitive::TriangleFan => {
                for i in 1..v.len().saturating_sub(1) {
                    raster::triangle(v[0], v[i], v[i + 1], bounds, &mut push);
                }
            }
            Primitive::Lines => {
                for l in v.chunks_exact(2) {
                    raster::line(l[0], l[1], bounds, &mut push);
                }
            }
            Primitive::LineStrip | Primitive::LineLoop => {
                for l in v.windows(2) {
                    raster::line(l[0], l[1], bounds, &mut push);
                }
                if primitive == Primitive::LineLoop && v.len() > 2 {
                    raster::line(v[v.len() - 1], v[0], bounds, &mut push);
                }
            }
        }

        let viewport = self.state.viewport;
        for (x, y, uv) in fragments {
            let centre = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let Some(src) = shade::shade(kind, &uniforms, centre, uv, texture.as_ref(), viewport) else {
                continue;
            };
            let Some(i) = self.index(x, y) else {
                continue;
            };
            if !self.stencil_test(i) {
                continue;
            }
            self.color[i] = shade::write_color(&self.state, src, self.color[i]);
        }
    }

    /// Runs the stencil test for pixel `i`, applying the stencil op.
    fn stencil_test(&mut self, i: usize) -> bool {
        let s = &self.state;
        if !s.is_enabled(Capability::StencilTest) {
            return true;
        }
        let stored = self.stencil[i];
        let pass = s.stencil_func.passes(s.stencil_ref, stored, s.stencil_value_mask);
        let op = if pass { s.stencil_pass } else { s.stencil_fail };
        let value = op.apply(stored, s.stencil_ref);
        self.stencil[i] = (stored & !s.stencil_write_mask) | (value & s.stencil_write_mask);
        pass
    }
}

impl Backend for SoftwareBackend {
    #[inline]
    fn caps(&self) -> BackendCaps {
        self.caps
    }

    #[inline]
    fn take_error(&mut self) -> Option<GpuError> {
        self.errors.pop_front()
    }

    // ── buffers ──────────────────────────────────────────────────────────

    fn create_buffer(&mut self) -> Option<RawId> {
        let id = self.alloc_id()?;
        self.buffers.insert(id, SoftBuffer::default());
        self.stats.buffers_created += 1;
        Some(id)
    }

    fn delete_buffer(&mut self, id: RawId) {
        if self.buffers.remove(&id).is_none() {
            self.error(GpuError::InvalidValue("unknown buffer"));
            return;
        }
        self.stats.buffers_deleted += 1;
        for bound in &mut self.bound_buffers {
            if *bound == Some(id) {
                *bound = None;
            }
        }
    }

    fn bind_buffer(&mut self, target: BufferTarget, id: Option<RawId>) {
        if let Some(id) = id
            && !self.buffers.contains_key(&id)
        {
            self.error(GpuError::InvalidOperation("bind of unknown buffer"));
            return;
        }
        self.bound_buffers[target.index()] = id;
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]) {
        let err = match self.bound_buffer_mut(target) {
            None => Some(GpuError::InvalidOperation("no buffer bound")),
            Some(b) if b.mapped => Some(GpuError::InvalidOperation("buffer is mapped")),
            Some(b) => {
                b.data.clear();
                b.data.extend_from_slice(data);
                None
            }
        };
        if let Some(err) = err {
            self.error(err);
        }
    }

    fn map_buffer(&mut self, target: BufferTarget, size: usize) -> bool {
        if !self.caps.map_buffer {
            self.error(GpuError::InvalidOperation("buffer mapping unsupported"));
            return false;
        }
        let err = match self.bound_buffer_mut(target) {
            None => GpuError::InvalidOperation("no buffer bound"),
            Some(b) if b.mapped => GpuError::InvalidOperation("buffer already mapped"),
            Some(b) => {
                b.data = vec![0; size];
                b.mapped = true;
                return true;
            }
        };
        self.error(err);
        false
    }

    fn mapped_bytes(&mut self, target: BufferTarget) -> Option<&mut [u8]> {
        let b = self.bound_buffer_mut(target)?;
        b.mapped.then(|| b.data.as_mut_slice())
    }

    fn unmap_buffer(&mut self, target: BufferTarget) {
        let ok = match self.bound_buffer_mut(target) {
            Some(b) if b.mapped => {
                b.mapped = false;
                true
            }
            _ => false,
        };
        if !ok {
            self.error(GpuError::InvalidOperation("unmap of unmapped buffer"));
        }
    }

    // ── textures ─────────────────────────────────────────────────────────

    fn create_texture(&mut self) -> Option<RawId> {
        let id = self.alloc_id()?;
        self.textures.insert(id, SoftTexture::default());
        self.stats.textures_created += 1;
        Some(id)
    }

    fn delete_texture(&mut self, id: RawId) {
        if self.textures.remove(&id).is_none() {
            self.error(GpuError::InvalidValue("unknown texture"));
            return;
        }
        self.stats.textures_deleted += 1;
        if self.bound_texture == Some(id) {
            self.bound_texture = None;
        }
    }

    fn bind_texture(&mut self, id: Option<RawId>) {
        if let Some(id) = id
            && !self.textures.contains_key(&id)
        {
            self.error(GpuError::InvalidOperation("bind of unknown texture"));
            return;
        }
        self.bound_texture = id;
    }

    fn tex_image(&mut self, format: PixelFormat, size: PixelSize, data: Option<&[u8]>) {
        if std::mem::take(&mut self.fail_texture_allocation) {
            self.error(GpuError::OutOfMemory("texture"));
            return;
        }
        if size.width > self.caps.max_texture_size || size.height > self.caps.max_texture_size {
            self.error(GpuError::InvalidValue("texture too large"));
            return;
        }
        let len = size.area() * format.bytes_per_pixel();
        if data.is_some_and(|d| d.len() != len) {
            self.error(GpuError::InvalidValue("texture data size mismatch"));
            return;
        }
        let Some(t) = self.bound_texture.and_then(|id| self.textures.get_mut(&id)) else {
            self.error(GpuError::InvalidOperation("no texture bound"));
            return;
        };
        t.format = Some(format);
        t.size = size;
        t.data = data.map(<[u8]>::to_vec).unwrap_or_else(|| vec![0; len]);
    }

    fn tex_sub_image(&mut self, format: PixelFormat, origin: PixelPoint, size: PixelSize, data: &[u8]) {
        let Some(t) = self.bound_texture.and_then(|id| self.textures.get_mut(&id)) else {
            self.error(GpuError::InvalidOperation("no texture bound"));
            return;
        };
        let err = if t.format != Some(format) {
            Some(GpuError::InvalidOperation("texture format mismatch"))
        } else if origin.x < 0
            || origin.y < 0
            || origin.x as u32 + size.width > t.size.width
            || origin.y as u32 + size.height > t.size.height
        {
            Some(GpuError::InvalidValue("sub-image out of bounds"))
        } else if data.len() != size.area() * format.bytes_per_pixel() {
            Some(GpuError::InvalidValue("texture data size mismatch"))
        } else {
            let bpp = format.bytes_per_pixel();
            let row = size.width as usize * bpp;
            let pitch = t.size.width as usize * bpp;
            for (y, src) in data.chunks_exact(row.max(1)).enumerate() {
                let start = (origin.y as usize + y) * pitch + origin.x as usize * bpp;
                t.data[start..start + row].copy_from_slice(src);
            }
            None
        };
        if let Some(err) = err {
            self.error(err);
        }
    }

    // ── programs ─────────────────────────────────────────────────────────

    fn create_program(&mut self, kind: ProgramKind) -> Result<RawId, GpuError> {
        if self.fail_link == Some(kind) {
            return Err(GpuError::Link { program: kind.name(), log: "link failure requested".into() });
        }
        let id = self.alloc_id().ok_or(GpuError::OutOfMemory("program name"))?;
        self.programs.insert(id, SoftProgram { kind, uniforms: UniformBlock::default() });
        self.stats.programs_created += 1;
        Ok(id)
    }

    fn delete_program(&mut self, id: RawId) {
        if self.programs.remove(&id).is_none() {
            self.error(GpuError::InvalidValue("unknown program"));
            return;
        }
        self.stats.programs_deleted += 1;
        if self.current_program == Some(id) {
            self.current_program = None;
        }
    }

    fn use_program(&mut self, id: Option<RawId>) {
        if let Some(id) = id
            && !self.programs.contains_key(&id)
        {
            self.error(GpuError::InvalidOperation("use of unknown program"));
            return;
        }
        self.current_program = id;
    }

    fn uniform(&mut self, program: RawId, uniform: Uniform, value: UniformValue) {
        let result = match self.programs.get_mut(&program) {
            Some(p) => p.uniforms.set(uniform, value),
            None => Err(GpuError::InvalidOperation("uniform on unknown program")),
        };
        if let Err(err) = result {
            self.error(err);
        }
    }

    // ── state ────────────────────────────────────────────────────────────

    fn set_capability(&mut self, cap: Capability, enabled: bool) {
        self.state.enabled[cap.index()] = enabled;
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.state.blend_src = src;
        self.state.blend_dst = dst;
    }

    fn blend_color(&mut self, color: [f32; 4]) {
        self.state.blend_color = color;
    }

    fn color_mask(&mut self, mask: ColorMask) {
        self.state.color_mask = mask;
    }

    fn stencil_func(&mut self, func: StencilFunc, reference: u8, mask: u8) {
        self.state.stencil_func = func;
        self.state.stencil_ref = reference;
        self.state.stencil_value_mask = mask;
    }

    fn stencil_op(&mut self, fail: StencilOp, zfail: StencilOp, pass: StencilOp) {
        self.state.stencil_fail = fail;
        self.state.stencil_zfail = zfail;
        self.state.stencil_pass = pass;
    }

    fn stencil_mask(&mut self, mask: u8) {
        self.state.stencil_write_mask = mask;
    }

    fn scissor(&mut self, rect: PixelRect) {
        if rect.width() < 0 || rect.height() < 0 {
            self.error(GpuError::InvalidValue("negative scissor size"));
            return;
        }
        self.state.scissor = rect;
    }

    fn line_width(&mut self, width: f32) {
        if !(width > 0.0) {
            self.error(GpuError::InvalidValue("line width must be positive"));
            return;
        }
        self.state.line_width = width;
    }

    fn viewport(&mut self, size: PixelSize) {
        self.state.viewport = size;
    }

    fn clear(&mut self, color: Option<[f32; 4]>, stencil: Option<u8>) {
        let b = self.bounds();
        let mask = self.state.color_mask.as_array();
        let write_mask = self.state.stencil_write_mask;
        let value = color.map(|c| c.map(to_unorm8));

        for y in b.y0..b.y1 {
            for x in b.x0..b.x1 {
                let Some(i) = self.index(x, y) else { continue };
                if let Some(v) = value {
                    for ch in 0..4 {
                        if mask[ch] {
                            self.color[i][ch] = v[ch];
                        }
                    }
                }
                if let Some(s) = stencil {
                    self.stencil[i] = (self.stencil[i] & !write_mask) | (s & write_mask);
                }
            }
        }
    }

    fn draw_arrays(&mut self, primitive: Primitive, source: VertexSource<'_>, first: usize, count: usize) {
        self.draw(primitive, source, (first..first + count).collect());
    }

    fn draw_elements(&mut self, primitive: Primitive, source: VertexSource<'_>, indices: &[u16]) {
        self.draw(primitive, source, indices.iter().map(|&i| i as usize).collect());
    }
}
