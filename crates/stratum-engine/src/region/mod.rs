//! Overlap-safe compositing of translucent regions.
//!
//! Regions (circles and polygons) are filled with a translucent colour and
//! outlined. Two stencil bits keep overlapping regions honest:
//!
//! - bit 0, the fill mask, marks the band along a polygon's border that its
//!   own fill is confined to; it is set and cleared again per shape.
//! - bit 1, the outline mask, marks every pixel an outline has been drawn
//!   to; later fills skip those pixels, so outlines stay on top.
//!
//! [`RegionPass`] owns the bookkeeping: both bits are zero when a pass
//! begins and again after it finishes.

mod pass;
mod settings;
mod shape;

pub use pass::{draw_regions, RegionPass};
pub use settings::{FillMode, RegionLook, RegionSettings};
pub use shape::{FillPolicy, Outline, RegionShape, ShapeGeometry};

/// Stencil bit confining a fill to the border band.
pub const FILL_MASK_BIT: u8 = 1;

/// Stencil bit reserving pixels drawn by outlines.
pub const OUTLINE_MASK_BIT: u8 = 2;
