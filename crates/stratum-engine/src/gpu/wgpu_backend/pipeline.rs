//! Render pipeline cache.
//!
//! wgpu bakes blending, the colour mask and the stencil test into the
//! pipeline, so every distinct combination the canvas uses gets its own
//! pipeline, built on first use.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use crate::gpu::{BlendFactor, Capability, ColorMask, ProgramKind, RasterState, StencilFunc, StencilOp};

pub(super) const STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Stencil8;

// ── vertex ───────────────────────────────────────────────────────────────

/// Vertex in framebuffer pixels plus texture coordinates.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub(super) struct GpuVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

impl GpuVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x2  // uv
    ];

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

// ── keys ─────────────────────────────────────────────────────────────────

/// The two topologies left after host-side expansion.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(super) enum Topology {
    Triangles,
    Lines,
}

impl Topology {
    fn to_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
            Topology::Lines => wgpu::PrimitiveTopology::LineList,
        }
    }
}

/// Stencil configuration baked into a pipeline. The reference value is
/// dynamic and set per draw.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(super) struct StencilKey {
    pub func: StencilFunc,
    pub fail: StencilOp,
    pub pass: StencilOp,
    pub read_mask: u8,
    pub write_mask: u8,
}

impl StencilKey {
    /// Test off: everything passes and nothing is written.
    pub const DISABLED: StencilKey = StencilKey {
        func: StencilFunc::Always,
        fail: StencilOp::Keep,
        pass: StencilOp::Keep,
        read_mask: 0,
        write_mask: 0,
    };

    pub fn from_state(state: &RasterState) -> Self {
        if !state.is_enabled(Capability::StencilTest) {
            return Self::DISABLED;
        }
        Self {
            func: state.stencil_func,
            fail: state.stencil_fail,
            pass: state.stencil_pass,
            read_mask: state.stencil_value_mask,
            write_mask: state.stencil_write_mask,
        }
    }

    /// Unconditional replace through `write_mask`; used for stencil clears.
    pub fn replace(write_mask: u8) -> Self {
        Self {
            func: StencilFunc::Always,
            fail: StencilOp::Keep,
            pass: StencilOp::Replace,
            read_mask: 0xff,
            write_mask,
        }
    }

    fn to_wgpu(self) -> wgpu::StencilState {
        let face = wgpu::StencilFaceState {
            compare: compare_function(self.func),
            fail_op: stencil_operation(self.fail),
            depth_fail_op: stencil_operation(self.pass),
            pass_op: stencil_operation(self.pass),
        };
        wgpu::StencilState {
            front: face,
            back: face,
            read_mask: self.read_mask as u32,
            write_mask: self.write_mask as u32,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(super) struct PipelineKey {
    pub program: ProgramKind,
    pub topology: Topology,
    pub blend: Option<(BlendFactor, BlendFactor)>,
    pub color_mask: ColorMask,
    pub stencil: StencilKey,
}

impl PipelineKey {
    pub fn for_draw(program: ProgramKind, topology: Topology, state: &RasterState) -> Self {
        let blend = state
            .is_enabled(Capability::Blend)
            .then_some((state.blend_src, state.blend_dst));
        Self {
            program,
            topology,
            blend,
            color_mask: state.color_mask,
            stencil: StencilKey::from_state(state),
        }
    }

    /// A clear is a full-viewport solid quad with blending off.
    pub fn for_clear(color: bool, stencil: Option<u8>, state: &RasterState) -> Self {
        Self {
            program: ProgramKind::Solid,
            topology: Topology::Triangles,
            blend: None,
            color_mask: if color { state.color_mask } else { ColorMask::NONE },
            stencil: match stencil {
                Some(_) => StencilKey::replace(state.stencil_write_mask),
                None => StencilKey::DISABLED,
            },
        }
    }
}

// ── conversions ──────────────────────────────────────────────────────────

fn compare_function(func: StencilFunc) -> wgpu::CompareFunction {
    // wgpu compares the reference against the stored value, as GL does.
    match func {
        StencilFunc::Never => wgpu::CompareFunction::Never,
        StencilFunc::Always => wgpu::CompareFunction::Always,
        StencilFunc::Equal => wgpu::CompareFunction::Equal,
        StencilFunc::NotEqual => wgpu::CompareFunction::NotEqual,
        StencilFunc::Less => wgpu::CompareFunction::Less,
        StencilFunc::LessEqual => wgpu::CompareFunction::LessEqual,
        StencilFunc::Greater => wgpu::CompareFunction::Greater,
        StencilFunc::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
    }
}

fn stencil_operation(op: StencilOp) -> wgpu::StencilOperation {
    match op {
        StencilOp::Keep => wgpu::StencilOperation::Keep,
        StencilOp::Zero => wgpu::StencilOperation::Zero,
        StencilOp::Replace => wgpu::StencilOperation::Replace,
        StencilOp::Invert => wgpu::StencilOperation::Invert,
        StencilOp::Increment => wgpu::StencilOperation::IncrementClamp,
        StencilOp::Decrement => wgpu::StencilOperation::DecrementClamp,
    }
}

/// Constant-alpha factors read the blend constant, which the replay sets
/// to the splatted constant alpha.
fn blend_factor(f: BlendFactor) -> wgpu::BlendFactor {
    match f {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::DstColor => wgpu::BlendFactor::Dst,
        BlendFactor::OneMinusDstColor => wgpu::BlendFactor::OneMinusDst,
        BlendFactor::ConstantAlpha => wgpu::BlendFactor::Constant,
        BlendFactor::OneMinusConstantAlpha => wgpu::BlendFactor::OneMinusConstant,
    }
}

fn blend_state(src: BlendFactor, dst: BlendFactor) -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: blend_factor(src),
        dst_factor: blend_factor(dst),
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState { color: component, alpha: component }
}

fn color_writes(mask: ColorMask) -> wgpu::ColorWrites {
    let mut writes = wgpu::ColorWrites::empty();
    if mask.r {
        writes |= wgpu::ColorWrites::RED;
    }
    if mask.g {
        writes |= wgpu::ColorWrites::GREEN;
    }
    if mask.b {
        writes |= wgpu::ColorWrites::BLUE;
    }
    if mask.a {
        writes |= wgpu::ColorWrites::ALPHA;
    }
    writes
}

fn fragment_entry(kind: ProgramKind) -> &'static str {
    match kind {
        ProgramKind::Solid => "fs_solid",
        ProgramKind::Texture => "fs_texture",
        ProgramKind::Alpha => "fs_alpha",
        ProgramKind::CombineTexture => "fs_combine_texture",
        ProgramKind::Invert => "fs_invert",
        ProgramKind::Dashed => "fs_dashed",
        ProgramKind::FilledCircle => "fs_filled_circle",
        ProgramKind::CircleOutline => "fs_circle_outline",
    }
}

// ── cache ────────────────────────────────────────────────────────────────

/// Pipelines for one colour target format.
pub(super) struct PipelineCache {
    format: wgpu::TextureFormat,
    shader: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl PipelineCache {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        bind_group_layouts: &[&wgpu::BindGroupLayout],
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("stratum canvas shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/canvas.wgsl").into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("stratum canvas pipeline layout"),
            bind_group_layouts,
            immediate_size: 0,
        });

        Self { format, shader, layout, pipelines: HashMap::new() }
    }

    #[inline]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Builds the pipeline for `key` unless it already exists.
    pub fn prepare(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        log::trace!("pipeline cache miss: {key:?}");
        let pipeline = self.build(device, key);
        self.pipelines.insert(key, pipeline);
    }

    #[inline]
    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }

    fn build(&self, device: &wgpu::Device, key: PipelineKey) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("stratum canvas pipeline"),
            layout: Some(&self.layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[GpuVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some(fragment_entry(key.program)),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: key.blend.map(|(src, dst)| blend_state(src, dst)),
                    write_mask: color_writes(key.color_mask),
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: key.topology.to_wgpu(),
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: STENCIL_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: key.stencil.to_wgpu(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }
}
