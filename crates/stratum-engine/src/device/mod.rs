//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - presenting canvas frames into the window through [`WindowSurface`]

mod gpu;
mod window_surface;

pub use gpu::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
pub use window_surface::WindowSurface;
