//! GPU side of the wgpu backend: uploads, buffers and the replay pass.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use crate::coords::PixelSize;
use crate::gpu::{Capability, PixelFormat, RasterState, RawId, UniformBlock};

use super::Command;
use super::pipeline::{GpuVertex, PipelineCache, PipelineKey, STENCIL_FORMAT};

/// Dynamic uniform offsets must be multiples of this on every adapter.
const UNIFORM_STRIDE: usize = 256;

// ── GPU types ────────────────────────────────────────────────────────────

/// Uniform block layout (112 bytes), mirrored by `Uniforms` in canvas.wgsl:
///
///  offset  0  viewport       [f32; 2]
///  offset  8  translate      [f32; 2]
///  offset 16  dash_start     [f32; 2]
///  offset 24  circle_center  [f32; 2]
///  offset 32  color          [f32; 4]
///  offset 48  color1         [f32; 4]
///  offset 64  color2         [f32; 4]
///  offset 80  dash_period, dash_ratio, radius1, radius2
///  offset 96  texel_mode     u32
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Pod, Zeroable)]
struct GpuUniforms {
    viewport: [f32; 2],
    translate: [f32; 2],
    dash_start: [f32; 2],
    circle_center: [f32; 2],
    color: [f32; 4],
    color1: [f32; 4],
    color2: [f32; 4],
    dash_period: f32,
    dash_ratio: f32,
    radius1: f32,
    radius2: f32,
    texel_mode: u32,
    _pad: [u32; 3], // 16-byte struct alignment
}

impl GpuUniforms {
    fn from_block(u: &UniformBlock, state: &RasterState, texel_mode: u32) -> Self {
        Self {
            viewport: [state.viewport.width as f32, state.viewport.height as f32],
            translate: u.translate,
            dash_start: u.dash_start,
            circle_center: u.circle_center,
            color: u.color,
            color1: u.color1,
            color2: u.color2,
            dash_period: u.dash_period,
            dash_ratio: u.dash_ratio,
            radius1: u.radius1,
            radius2: u.radius2,
            texel_mode,
            _pad: [0; 3],
        }
    }

    fn for_clear(color: Option<[f32; 4]>, state: &RasterState) -> Self {
        Self {
            viewport: [state.viewport.width as f32, state.viewport.height as f32],
            color: color.unwrap_or_default(),
            ..Self::default()
        }
    }
}

const UNIFORM_SIZE: u64 = std::mem::size_of::<GpuUniforms>() as u64;

/// Texel interpretation selected in the shader.
fn texel_mode(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Rgb | PixelFormat::Rgba => 0,
        PixelFormat::Gray => 1,
        PixelFormat::Alpha => 2,
    }
}

/// Single-channel formats stay single-channel; RGB is widened to RGBA.
fn upload_layout(format: PixelFormat, data: &[u8]) -> (wgpu::TextureFormat, u32, std::borrow::Cow<'_, [u8]>) {
    match format {
        PixelFormat::Gray | PixelFormat::Alpha => (wgpu::TextureFormat::R8Unorm, 1, data.into()),
        PixelFormat::Rgba => (wgpu::TextureFormat::Rgba8Unorm, 4, data.into()),
        PixelFormat::Rgb => {
            let rgba: Vec<u8> = data.chunks_exact(3).flat_map(|p| [p[0], p[1], p[2], 255]).collect();
            (wgpu::TextureFormat::Rgba8Unorm, 4, rgba.into())
        }
    }
}

struct TextureBinding {
    texture: wgpu::Texture,
    size: PixelSize,
    format: wgpu::TextureFormat,
    texel_mode: u32,
    bind_group: wgpu::BindGroup,
}

struct StencilTarget {
    size: PixelSize,
    view: wgpu::TextureView,
}

/// Effective scissor for `state` in target pixels; `None` when empty.
fn scissor_rect(state: &RasterState, target: PixelSize) -> Option<(u32, u32, u32, u32)> {
    let w = state.viewport.width.min(target.width) as i32;
    let h = state.viewport.height.min(target.height) as i32;
    let (mut x0, mut y0, mut x1, mut y1) = (0, 0, w, h);
    if state.is_enabled(Capability::ScissorTest) {
        let s = state.scissor;
        x0 = x0.max(s.left);
        y0 = y0.max(s.top);
        x1 = x1.min(s.right);
        y1 = y1.min(s.bottom);
    }
    if x1 <= x0 || y1 <= y0 {
        None
    } else {
        Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}

// ── replay ───────────────────────────────────────────────────────────────

pub(super) struct Replay {
    pipelines: PipelineCache,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    blank: TextureBinding,
    textures: HashMap<RawId, TextureBinding>,
    stencil: Option<StencilTarget>,

    vertex_buffer: Option<wgpu::Buffer>,
    vertex_capacity: usize,
    uniform_buffer: Option<wgpu::Buffer>,
    uniform_bind_group: Option<wgpu::BindGroup>,
    uniform_capacity: usize,
}

impl Replay {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("stratum uniforms bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("stratum texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("stratum nearest sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let pipelines = PipelineCache::new(device, format, &[&uniform_layout, &texture_layout]);
        let blank = Self::create_binding(
            device,
            &texture_layout,
            &sampler,
            PixelSize::new(1, 1),
            wgpu::TextureFormat::Rgba8Unorm,
            0,
        );

        Self {
            pipelines,
            uniform_layout,
            texture_layout,
            sampler,
            blank,
            textures: HashMap::new(),
            stencil: None,
            vertex_buffer: None,
            vertex_capacity: 0,
            uniform_buffer: None,
            uniform_bind_group: None,
            uniform_capacity: 0,
        }
    }

    #[inline]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.pipelines.format()
    }

    // ── textures ─────────────────────────────────────────────────────────

    fn create_binding(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        size: PixelSize,
        format: wgpu::TextureFormat,
        texel_mode: u32,
    ) -> TextureBinding {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("stratum canvas texture"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("stratum texture bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(sampler) },
            ],
        });
        TextureBinding { texture, size, format, texel_mode, bind_group }
    }

    /// Creates or refreshes the GPU copy of texture `id`.
    pub fn upload_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        id: RawId,
        format: Option<PixelFormat>,
        size: PixelSize,
        data: &[u8],
    ) {
        let Some(format) = format.filter(|_| !size.is_empty()) else {
            self.textures.remove(&id);
            return;
        };
        let (gpu_format, bpp, bytes) = upload_layout(format, data);
        let mode = texel_mode(format);

        let reusable = self
            .textures
            .get(&id)
            .is_some_and(|b| b.size == size && b.format == gpu_format);
        if !reusable {
            let binding =
                Self::create_binding(device, &self.texture_layout, &self.sampler, size, gpu_format, mode);
            self.textures.insert(id, binding);
        }
        let Some(binding) = self.textures.get_mut(&id) else { return };
        binding.texel_mode = mode;

        log::trace!("texture {id} upload: {}x{} {format:?}", size.width, size.height);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &binding.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width * bpp),
                rows_per_image: Some(size.height),
            },
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );
    }

    pub fn forget_texture(&mut self, id: RawId) {
        self.textures.remove(&id);
    }

    // ── buffers ──────────────────────────────────────────────────────────

    fn ensure_stencil(&mut self, device: &wgpu::Device, size: PixelSize) {
        if self.stencil.as_ref().is_some_and(|s| s.size == size) {
            return;
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("stratum stencil"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: STENCIL_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.stencil = Some(StencilTarget { size, view });
    }

    fn ensure_vertex_capacity(&mut self, device: &wgpu::Device, required: usize) {
        if required <= self.vertex_capacity && self.vertex_buffer.is_some() {
            return;
        }
        let new_cap = required.next_power_of_two().max(1024);
        self.vertex_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stratum vertex buffer"),
            size: (new_cap * std::mem::size_of::<GpuVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.vertex_capacity = new_cap;
    }

    fn ensure_uniform_capacity(&mut self, device: &wgpu::Device, required: usize) {
        if required <= self.uniform_capacity && self.uniform_bind_group.is_some() {
            return;
        }
        let new_cap = required.next_power_of_two().max(64);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stratum uniform buffer"),
            size: (new_cap * UNIFORM_STRIDE) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("stratum uniform bind group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(UNIFORM_SIZE),
                }),
            }],
        });
        self.uniform_buffer = Some(buffer);
        self.uniform_bind_group = Some(bind_group);
        self.uniform_capacity = new_cap;
    }

    // ── pass ─────────────────────────────────────────────────────────────

    fn binding(&self, texture: Option<RawId>) -> &TextureBinding {
        texture.and_then(|id| self.textures.get(&id)).unwrap_or(&self.blank)
    }

    fn key_of(command: &Command) -> PipelineKey {
        match command {
            Command::Draw { program, topology, state, .. } => PipelineKey::for_draw(*program, *topology, state),
            Command::Clear { color, stencil, state, .. } => {
                PipelineKey::for_clear(color.is_some(), *stencil, state)
            }
        }
    }

    /// Replays `commands` into `view` in a single render pass.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size: PixelSize,
        vertices: &[GpuVertex],
        commands: &[Command],
    ) {
        if size.is_empty() {
            return;
        }
        self.ensure_stencil(device, size);

        let mut uniforms = vec![0u8; commands.len().max(1) * UNIFORM_STRIDE];
        for (i, command) in commands.iter().enumerate() {
            let block = match command {
                Command::Draw { uniforms, texture, state, .. } => {
                    GpuUniforms::from_block(uniforms, state, self.binding(*texture).texel_mode)
                }
                Command::Clear { color, state, .. } => GpuUniforms::for_clear(*color, state),
            };
            let at = i * UNIFORM_STRIDE;
            uniforms[at..at + UNIFORM_SIZE as usize].copy_from_slice(bytemuck::bytes_of(&block));
        }

        self.ensure_vertex_capacity(device, vertices.len().max(1));
        self.ensure_uniform_capacity(device, commands.len().max(1));
        for command in commands {
            self.pipelines.prepare(device, Self::key_of(command));
        }

        let Some(vertex_buffer) = self.vertex_buffer.as_ref() else { return };
        let Some(uniform_buffer) = self.uniform_buffer.as_ref() else { return };
        let Some(uniform_bind_group) = self.uniform_bind_group.as_ref() else { return };
        let Some(stencil) = self.stencil.as_ref() else { return };

        queue.write_buffer(vertex_buffer, 0, bytemuck::cast_slice(vertices));
        queue.write_buffer(uniform_buffer, 0, &uniforms);

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("stratum canvas pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &stencil.view,
                depth_ops: None,
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        rpass.set_vertex_buffer(0, vertex_buffer.slice(..));

        for (i, command) in commands.iter().enumerate() {
            let (state, texture, range, reference) = match command {
                Command::Draw { texture, first, count, state, .. } => {
                    (state, *texture, *first..*first + *count, state.stencil_ref)
                }
                Command::Clear { stencil, first, state, .. } => {
                    (state, None, *first..*first + 6, stencil.unwrap_or(0))
                }
            };
            let Some((sx, sy, sw, sh)) = scissor_rect(state, size) else { continue };
            let Some(pipeline) = self.pipelines.get(&Self::key_of(command)) else { continue };

            let vw = state.viewport.width.min(size.width) as f32;
            let vh = state.viewport.height.min(size.height) as f32;
            let alpha = state.blend_color[3] as f64;

            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, uniform_bind_group, &[(i * UNIFORM_STRIDE) as u32]);
            rpass.set_bind_group(1, &self.binding(texture).bind_group, &[]);
            rpass.set_viewport(0.0, 0.0, vw, vh, 0.0, 1.0);
            rpass.set_scissor_rect(sx, sy, sw, sh);
            rpass.set_stencil_reference(reference as u32);
            rpass.set_blend_constant(wgpu::Color { r: alpha, g: alpha, b: alpha, a: alpha });
            rpass.draw(range, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::PixelRect;

    #[test]
    fn uniform_block_fits_its_stride() {
        assert_eq!(UNIFORM_SIZE, 112);
        assert!(UNIFORM_SIZE as usize <= UNIFORM_STRIDE);
    }

    #[test]
    fn rgb_is_widened() {
        let (format, bpp, bytes) = upload_layout(PixelFormat::Rgb, &[1, 2, 3, 4, 5, 6]);
        assert_eq!(format, wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(bpp, 4);
        assert_eq!(&*bytes, &[1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn scissor_clamps_to_target_and_viewport() {
        let mut state = RasterState::default();
        state.viewport = PixelSize::new(100, 50);
        assert_eq!(scissor_rect(&state, PixelSize::new(80, 80)), Some((0, 0, 80, 50)));

        state.enabled[Capability::ScissorTest.index()] = true;
        state.scissor = PixelRect::new(10, 10, 30, 20);
        assert_eq!(scissor_rect(&state, PixelSize::new(80, 80)), Some((10, 10, 20, 10)));

        state.scissor = PixelRect::new(90, 0, 120, 10);
        assert_eq!(scissor_rect(&state, PixelSize::new(80, 80)), None);
    }
}
