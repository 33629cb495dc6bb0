//! wgpu backend.
//!
//! GL-style calls are validated and recorded on the host: every draw keeps
//! a snapshot of the program uniforms and the raster state, with vertices
//! transformed to framebuffer pixels and fans, strips and loops expanded
//! to lists. [`WgpuBackend::render`] uploads pending textures and replays
//! the recording in one render pass against a `Stencil8` attachment.

mod pipeline;
mod replay;

use std::collections::{HashMap, VecDeque};

use crate::coords::{PixelPoint, PixelRect, PixelSize, Vec2};

use super::{
    Backend, BackendCaps, BlendFactor, BufferTarget, Capability, ColorMask, GpuError, PixelFormat,
    Primitive, ProgramKind, RasterState, RawId, StencilFunc, StencilOp, Uniform, UniformBlock,
    UniformValue, VertexSource,
};
use pipeline::{GpuVertex, Topology};
use replay::Replay;

#[derive(Debug, Default)]
struct HostBuffer {
    data: Vec<u8>,
    mapped: bool,
}

/// Texture contents kept on the host until the next [`WgpuBackend::render`].
#[derive(Debug, Default)]
struct HostTexture {
    format: Option<PixelFormat>,
    size: PixelSize,
    data: Vec<u8>,
    dirty: bool,
}

#[derive(Debug)]
struct RecordedProgram {
    kind: ProgramKind,
    uniforms: UniformBlock,
}

/// One recorded command with everything the replay needs.
#[derive(Debug, Clone)]
enum Command {
    Draw {
        program: ProgramKind,
        uniforms: UniformBlock,
        texture: Option<RawId>,
        topology: Topology,
        first: u32,
        count: u32,
        state: RasterState,
    },
    Clear {
        color: Option<[f32; 4]>,
        stencil: Option<u8>,
        first: u32,
        state: RasterState,
    },
}

/// Records canvas commands for replay through wgpu.
pub struct WgpuBackend {
    caps: BackendCaps,
    format: wgpu::TextureFormat,

    next_id: u32,
    buffers: HashMap<RawId, HostBuffer>,
    textures: HashMap<RawId, HostTexture>,
    programs: HashMap<RawId, RecordedProgram>,

    bound_buffers: [Option<RawId>; 2],
    bound_texture: Option<RawId>,
    current_program: Option<RawId>,
    state: RasterState,

    vertices: Vec<GpuVertex>,
    commands: Vec<Command>,
    deleted_textures: Vec<RawId>,
    errors: VecDeque<GpuError>,
    warned_wide_lines: bool,

    replay: Option<Replay>,
}

impl WgpuBackend {
    /// Creates a recorder targeting colour attachments of `format`.
    pub fn new(format: wgpu::TextureFormat, limits: &wgpu::Limits) -> Self {
        let caps = BackendCaps {
            map_buffer: true,
            npot_textures: true,
            max_texture_size: limits.max_texture_dimension_2d,
        };
        Self {
            caps,
            format,
            next_id: 0,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            programs: HashMap::new(),
            bound_buffers: [None; 2],
            bound_texture: None,
            current_program: None,
            state: RasterState::default(),
            vertices: Vec::new(),
            commands: Vec::new(),
            deleted_textures: Vec::new(),
            errors: VecDeque::new(),
            warned_wide_lines: false,
            replay: None,
        }
    }

    #[inline]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Number of commands waiting for [`Self::render`].
    #[inline]
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn state(&self) -> &RasterState {
        &self.state
    }

    /// Uploads pending textures and replays the recorded commands into
    /// `view`, then starts a new recording.
    ///
    /// The colour target starts transparent and the stencil buffer zero,
    /// as a freshly created software framebuffer does.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size: PixelSize,
    ) {
        if self.replay.as_ref().is_none_or(|r| r.format() != self.format) {
            self.replay = Some(Replay::new(device, self.format));
        }
        let Some(replay) = self.replay.as_mut() else { return };

        for (&id, texture) in self.textures.iter_mut() {
            if std::mem::take(&mut texture.dirty) {
                replay.upload_texture(device, queue, id, texture.format, texture.size, &texture.data);
            }
        }

        replay.run(device, queue, encoder, view, size, &self.vertices, &self.commands);

        // Textures deleted during the frame stay alive for the draws that
        // were recorded before the delete.
        for &id in &self.deleted_textures {
            replay.forget_texture(id);
        }

        log::trace!(
            "wgpu replay: {} commands, {} vertices",
            self.commands.len(),
            self.vertices.len()
        );
        self.commands.clear();
        self.vertices.clear();
        self.deleted_textures.clear();
    }

    // ── internals ────────────────────────────────────────────────────────

    #[inline]
    fn error(&mut self, err: GpuError) {
        self.errors.push_back(err);
    }

    fn alloc_id(&mut self) -> Option<RawId> {
        self.next_id = self.next_id.checked_add(1)?;
        RawId::new(self.next_id)
    }

    fn bound_buffer_mut(&mut self, target: BufferTarget) -> Option<&mut HostBuffer> {
        let id = self.bound_buffers[target.index()]?;
        self.buffers.get_mut(&id)
    }

    fn bound_texture_mut(&mut self) -> Option<&mut HostTexture> {
        self.bound_texture.and_then(|id| self.textures.get_mut(&id))
    }

    fn vertex_data(&mut self, source: &VertexSource<'_>) -> Option<(Vec<Vec2>, Option<Vec<Vec2>>)> {
        match *source {
            VertexSource::Client { positions, texcoords } => {
                Some((positions.to_vec(), texcoords.map(<[Vec2]>::to_vec)))
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
                    .map(bytemuck::pod_read_unaligned::<Vec2>)
                    .collect();
                Some((positions, None))
            }
        }
    }

    fn record_draw(&mut self, primitive: Primitive, source: VertexSource<'_>, order: Vec<usize>) {
        let Some(program) = self.current_program.and_then(|id| self.programs.get(&id)) else {
            self.error(GpuError::InvalidOperation("draw without a program"));
            return;
        };
        let kind = program.kind;
        let uniforms = program.uniforms;

        let texture = if kind.samples_texture() {
            match self.bound_texture.filter(|id| self.textures.contains_key(id)) {
                Some(id) => Some(id),
                None => {
                    self.error(GpuError::InvalidOperation("textured draw without a texture"));
                    return;
                }
            }
        } else {
            None
        };

        let Some((positions, texcoords)) = self.vertex_data(&source) else {
            return;
        };
        if order.iter().any(|&i| i >= positions.len()) {
            self.error(GpuError::InvalidValue("vertex index out of range"));
            return;
        }

        if primitive.is_line() && self.state.line_width > 1.0 && !self.warned_wide_lines {
            log::debug!("wgpu draws lines one pixel wide; requested {}", self.state.line_width);
            self.warned_wide_lines = true;
        }

        let transformed: Vec<GpuVertex> = order
            .iter()
            .map(|&i| {
                let p = uniforms.transform(positions[i]);
                let uv = texcoords.as_ref().and_then(|t| t.get(i).copied()).unwrap_or_default();
                GpuVertex { pos: [p.x, p.y], uv: [uv.x, uv.y] }
            })
            .collect();

        let (topology, expanded) = expand(primitive, &transformed);
        if expanded.is_empty() {
            return;
        }

        let first = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&expanded);
        self.commands.push(Command::Draw {
            program: kind,
            uniforms,
            texture,
            topology,
            first,
            count: expanded.len() as u32,
            state: self.state,
        });
    }
}

/// Lowers every primitive to a triangle or line list, keeping GL's
/// vertex order for strips.
fn expand(primitive: Primitive, v: &[GpuVertex]) -> (Topology, Vec<GpuVertex>) {
    let mut out = Vec::new();
    let topology = match primitive {
        Primitive::Triangles => {
            for t in v.chunks_exact(3) {
                out.extend_from_slice(t);
            }
            Topology::Triangles
        }
        Primitive::TriangleStrip => {
            for i in 0..v.len().saturating_sub(2) {
                let (a, b) = if i % 2 == 0 { (v[i], v[i + 1]) } else { (v[i + 1], v[i]) };
                out.extend_from_slice(&[a, b, v[i + 2]]);
            }
            Topology::Triangles
        }
        Primitive::TriangleFan => {
            for i in 1..v.len().saturating_sub(1) {
                out.extend_from_slice(&[v[0], v[i], v[i + 1]]);
            }
            Topology::Triangles
        }
        Primitive::Lines => {
            for l in v.chunks_exact(2) {
                out.extend_from_slice(l);
            }
            Topology::Lines
        }
        Primitive::LineStrip | Primitive::LineLoop => {
            for l in v.windows(2) {
                out.extend_from_slice(l);
            }
            if primitive == Primitive::LineLoop && v.len() > 2 {
                out.extend_from_slice(&[v[v.len() - 1], v[0]]);
            }
            Topology::Lines
        }
    };
    (topology, out)
}

impl Backend for WgpuBackend {
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
        self.buffers.insert(id, HostBuffer::default());
        Some(id)
    }

    fn delete_buffer(&mut self, id: RawId) {
        if self.buffers.remove(&id).is_none() {
            self.error(GpuError::InvalidValue("unknown buffer"));
            return;
        }
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
        match self.bound_buffer_mut(target) {
            Some(b) if b.mapped => b.mapped = false,
            _ => self.error(GpuError::InvalidOperation("unmap of unmapped buffer")),
        }
    }

    // ── textures ─────────────────────────────────────────────────────────

    fn create_texture(&mut self) -> Option<RawId> {
        let id = self.alloc_id()?;
        self.textures.insert(id, HostTexture::default());
        Some(id)
    }

    fn delete_texture(&mut self, id: RawId) {
        if self.textures.remove(&id).is_none() {
            self.error(GpuError::InvalidValue("unknown texture"));
            return;
        }
        self.deleted_textures.push(id);
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
        let max = self.caps.max_texture_size;
        if size.width > max || size.height > max {
            self.error(GpuError::InvalidValue("texture too large"));
            return;
        }
        let len = size.area() * format.bytes_per_pixel();
        if data.is_some_and(|d| d.len() != len) {
            self.error(GpuError::InvalidValue("texture data size mismatch"));
            return;
        }
        let Some(t) = self.bound_texture_mut() else {
            self.error(GpuError::InvalidOperation("no texture bound"));
            return;
        };
        t.format = Some(format);
        t.size = size;
        t.data = data.map(<[u8]>::to_vec).unwrap_or_else(|| vec![0; len]);
        t.dirty = true;
    }

    fn tex_sub_image(&mut self, format: PixelFormat, origin: PixelPoint, size: PixelSize, data: &[u8]) {
        let Some(t) = self.bound_texture_mut() else {
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
            t.dirty = true;
            None
        };
        if let Some(err) = err {
            self.error(err);
        }
    }

    // ── programs ─────────────────────────────────────────────────────────

    fn create_program(&mut self, kind: ProgramKind) -> Result<RawId, GpuError> {
        let id = self.alloc_id().ok_or(GpuError::OutOfMemory("program name"))?;
        self.programs.insert(id, RecordedProgram { kind, uniforms: UniformBlock::default() });
        Ok(id)
    }

    fn delete_program(&mut self, id: RawId) {
        if self.programs.remove(&id).is_none() {
            self.error(GpuError::InvalidValue("unknown program"));
            return;
        }
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
        if color.is_none() && stencil.is_none() {
            return;
        }
        let vp = self.state.viewport;
        let (w, h) = (vp.width as f32, vp.height as f32);
        let first = self.vertices.len() as u32;
        let corner = |x: f32, y: f32| GpuVertex { pos: [x, y], uv: [0.0, 0.0] };
        self.vertices.extend_from_slice(&[
            corner(0.0, 0.0),
            corner(w, 0.0),
            corner(0.0, h),
            corner(w, 0.0),
            corner(w, h),
            corner(0.0, h),
        ]);
        self.commands.push(Command::Clear { color, stencil, first, state: self.state });
    }

    fn draw_arrays(&mut self, primitive: Primitive, source: VertexSource<'_>, first: usize, count: usize) {
        self.record_draw(primitive, source, (first..first + count).collect());
    }

    fn draw_elements(&mut self, primitive: Primitive, source: VertexSource<'_>, indices: &[u16]) {
        self.record_draw(primitive, source, indices.iter().map(|&i| i as usize).collect());
    }
}
