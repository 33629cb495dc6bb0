use crate::coords::{PixelPoint, PixelRect};
use crate::paint::Color;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeGeometry {
    Circle { center: PixelPoint, radius: u32 },
    Polygon(Vec<PixelPoint>),
}

/// When a region's interior gets filled in the precise renderer.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum FillPolicy {
    /// Never filled.
    None,
    /// Whole interior when selected, otherwise a band along the border.
    #[default]
    IfSelected,
    /// Whole interior.
    Always,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Outline {
    pub width: u32,
    pub color: Color,
}

impl Outline {
    pub const NONE: Outline = Outline { width: 0, color: Color::TRANSPARENT };

    #[inline]
    pub const fn new(width: u32, color: Color) -> Self {
        Self { width, color }
    }
}

impl Default for Outline {
    fn default() -> Self {
        Self::NONE
    }
}

/// One region to composite, in canvas coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionShape {
    pub geometry: ShapeGeometry,
    pub fill: FillPolicy,
    pub selected: bool,
    pub outline: Outline,
    /// Fill colour; its alpha is replaced by the renderer's fill opacity.
    pub fill_color: Color,
}

impl RegionShape {
    pub fn new(geometry: ShapeGeometry) -> Self {
        Self {
            geometry,
            fill: FillPolicy::default(),
            selected: false,
            outline: Outline::NONE,
            fill_color: Color::GRAY,
        }
    }

    #[inline]
    pub fn circle(center: PixelPoint, radius: u32) -> Self {
        Self::new(ShapeGeometry::Circle { center, radius })
    }

    #[inline]
    pub fn polygon(points: Vec<PixelPoint>) -> Self {
        Self::new(ShapeGeometry::Polygon(points))
    }

    pub fn with_fill(mut self, fill: FillPolicy, color: Color) -> Self {
        self.fill = fill;
        self.fill_color = color;
        self
    }

    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn with_outline(mut self, width: u32, color: Color) -> Self {
        self.outline = Outline::new(width, color);
        self
    }

    /// Whether there is anything to draw at all.
    pub fn is_drawable(&self) -> bool {
        match &self.geometry {
            ShapeGeometry::Circle { radius, .. } => *radius > 0,
            ShapeGeometry::Polygon(points) => points.len() >= 3,
        }
    }

    /// Bounding box of the geometry, outline excluded. `None` for an empty
    /// polygon.
    pub fn bounds(&self) -> Option<PixelRect> {
        match &self.geometry {
            ShapeGeometry::Circle { center, radius } => {
                let r = *radius as i32;
                Some(PixelRect::new(center.x - r, center.y - r, center.x + r + 1, center.y + r + 1))
            }
            ShapeGeometry::Polygon(points) => {
                let first = points.first()?;
                let init = PixelRect::new(first.x, first.y, first.x + 1, first.y + 1);
                Some(points.iter().fold(init, |r, p| {
                    PixelRect::new(r.left.min(p.x), r.top.min(p.y), r.right.max(p.x + 1), r.bottom.max(p.y + 1))
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_the_geometry() {
        let c = RegionShape::circle(PixelPoint::new(10, 10), 4);
        assert_eq!(c.bounds(), Some(PixelRect::new(6, 6, 15, 15)));

        let p = RegionShape::polygon(vec![
            PixelPoint::new(2, 8),
            PixelPoint::new(-3, 1),
            PixelPoint::new(5, 4),
        ]);
        assert_eq!(p.bounds(), Some(PixelRect::new(-3, 1, 6, 9)));
        assert_eq!(RegionShape::polygon(Vec::new()).bounds(), None);
    }
}
