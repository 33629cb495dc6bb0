use super::{PixelPoint, PixelSize};

/// Axis-aligned integer rectangle in canvas pixels (top-left origin).
///
/// `right` and `bottom` are exclusive.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PixelRect {
    #[inline]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    #[inline]
    pub const fn from_origin_size(origin: PixelPoint, size: PixelSize) -> Self {
        Self {
            left: origin.x,
            top: origin.y,
            right: origin.x + size.width as i32,
            bottom: origin.y + size.height as i32,
        }
    }

    #[inline]
    pub const fn from_size(size: PixelSize) -> Self {
        Self::from_origin_size(PixelPoint::new(0, 0), size)
    }

    #[inline]
    pub const fn width(self) -> i32 {
        self.right - self.left
    }

    #[inline]
    pub const fn height(self) -> i32 {
        self.bottom - self.top
    }

    /// Size with negative extents clamped to zero.
    #[inline]
    pub fn size(self) -> PixelSize {
        PixelSize::new(self.width().max(0) as u32, self.height().max(0) as u32)
    }

    #[inline]
    pub const fn top_left(self) -> PixelPoint {
        PixelPoint::new(self.left, self.top)
    }

    #[inline]
    pub const fn top_right(self) -> PixelPoint {
        PixelPoint::new(self.right, self.top)
    }

    #[inline]
    pub const fn bottom_left(self) -> PixelPoint {
        PixelPoint::new(self.left, self.bottom)
    }

    #[inline]
    pub const fn bottom_right(self) -> PixelPoint {
        PixelPoint::new(self.right, self.bottom)
    }

    #[inline]
    pub const fn center(self) -> PixelPoint {
        PixelPoint::new((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Normalizes the rectangle so width/height are non-negative.
    #[inline]
    pub fn normalized(self) -> Self {
        Self::new(
            self.left.min(self.right),
            self.top.min(self.bottom),
            self.left.max(self.right),
            self.top.max(self.bottom),
        )
    }

    #[inline]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }

    /// Grows (positive) or shrinks (negative) every edge by `margin`.
    #[inline]
    pub const fn with_margin(self, margin: i32) -> Self {
        Self::new(
            self.left - margin,
            self.top - margin,
            self.right + margin,
            self.bottom + margin,
        )
    }

    /// Half-open containment: [min, max).
    #[inline]
    pub fn contains(self, p: PixelPoint) -> bool {
        let r = self.normalized();
        p.x >= r.left && p.y >= r.top && p.x < r.right && p.y < r.bottom
    }

    #[inline]
    pub fn intersect(self, other: PixelRect) -> Option<PixelRect> {
        let a = self.normalized();
        let b = other.normalized();

        let r = PixelRect::new(
            a.left.max(b.left),
            a.top.max(b.top),
            a.right.min(b.right),
            a.bottom.min(b.bottom),
        );

        if r.is_empty() { None } else { Some(r) }
    }
}
