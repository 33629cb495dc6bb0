//! GPU abstraction.
//!
//! - [`Backend`]: GL-flavoured command seam (software rasterizer, wgpu recorder)
//! - [`GpuContext`]: checked calls, viewport/translation, deferred releases
//! - owned resources: [`GpuBuffer`], [`GpuTexture`], [`ShaderProgram`]
//! - [`scope`]: guards that restore state on every exit path

mod backend;
mod buffer;
mod context;
mod error;
mod program;
mod release;
mod texture;

pub mod scope;
pub mod software;
pub mod wgpu_backend;

pub use backend::{
    Backend, BackendCaps, BlendFactor, BufferTarget, Capability, ColorMask, PixelFormat, Primitive,
    ProgramKind, RasterState, RawId, StencilFunc, StencilOp, Uniform, UniformBlock, UniformValue,
    VertexSource,
};
pub use buffer::{BufferWrite, GpuBuffer};
pub use context::{ErrorObserver, GpuContext};
pub use error::GpuError;
pub use program::{Programs, ShaderProgram};
pub use texture::{import_alpha_texture, import_texture, GpuTexture};
