//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and the window, and wires them to a
//! [`crate::device::WindowSurface`].

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
