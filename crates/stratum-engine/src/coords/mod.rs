//! Coordinate and geometry types shared by the canvas and the region renderer.
//!
//! Canonical canvas space:
//! - Physical pixels
//! - Origin top-left
//! - +X right, +Y down
//!
//! Bearings are measured clockwise from north (screen up). Backends convert
//! pixel positions to NDC using the current viewport.

mod angle;
mod point;
mod rect;
mod vec2;

pub use angle::Angle;
pub use point::{PixelPoint, PixelSize};
pub use rect::PixelRect;
pub use vec2::Vec2;
