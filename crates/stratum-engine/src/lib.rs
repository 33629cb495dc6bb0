//! Stratum engine crate.
//!
//! An immediate-mode 2D canvas over a small GL-style GPU seam, plus the
//! stencil compositor that keeps overlapping airspace regions readable.
//!
//! - [`gpu`]: backend seam, checked context, scoped state guards
//! - [`canvas`]: pens, brushes, shapes, text and bitmaps on top of [`gpu`]
//! - [`region`]: overlap-safe region fills and outlines
//! - [`surface`], [`device`], [`window`], [`core`]: frames on screen or offscreen

pub mod device;
pub mod window;
pub mod core;
pub mod surface;

pub mod logging;
pub mod coords;
pub mod paint;
pub mod geometry;
pub mod gpu;
pub mod canvas;
pub mod region;
pub mod text;
pub mod image;
