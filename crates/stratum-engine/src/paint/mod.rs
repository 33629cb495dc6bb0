//! Paint model for canvas drawing.
//!
//! Scope:
//! - color representation (straight-alpha RGBA8)
//! - pens (stroke width, color, dash style)
//! - brushes (fill color or hollow)

pub mod brush;
pub mod color;
pub mod pen;

pub use brush::Brush;
pub use color::Color;
pub use pen::{Pen, PenStyle};
