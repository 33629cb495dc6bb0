use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use super::Vec2;

/// Integer canvas position in pixels (top-left origin).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    /// Pixel centre, for primitives that must hit exactly the addressed pixel.
    #[inline]
    pub fn to_exact_vec2(self) -> Vec2 {
        Vec2::new(self.x as f32 + 0.5, self.y as f32 + 0.5)
    }

    #[inline]
    pub fn distance_squared(self, other: PixelPoint) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }
}

impl Add for PixelPoint {
    type Output = PixelPoint;
    #[inline]
    fn add(self, rhs: PixelPoint) -> PixelPoint {
        PixelPoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for PixelPoint {
    type Output = PixelPoint;
    #[inline]
    fn sub(self, rhs: PixelPoint) -> PixelPoint {
        PixelPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for PixelPoint {
    type Output = PixelPoint;
    #[inline]
    fn neg(self) -> PixelPoint {
        PixelPoint::new(-self.x, -self.y)
    }
}

impl AddAssign for PixelPoint {
    #[inline]
    fn add_assign(&mut self, rhs: PixelPoint) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl SubAssign for PixelPoint {
    #[inline]
    fn sub_assign(&mut self, rhs: PixelPoint) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

/// Non-negative pixel dimensions.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub const fn area(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Rounds both dimensions up to the next power of two.
    #[inline]
    pub fn next_power_of_two(self) -> Self {
        Self::new(
            self.width.max(1).next_power_of_two(),
            self.height.max(1).next_power_of_two(),
        )
    }

    #[inline]
    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_point_is_pixel_centre() {
        assert_eq!(PixelPoint::new(3, 4).to_exact_vec2(), Vec2::new(3.5, 4.5));
    }

    #[test]
    fn size_power_of_two() {
        assert_eq!(PixelSize::new(100, 64).next_power_of_two(), PixelSize::new(128, 64));
        assert_eq!(PixelSize::new(0, 3).next_power_of_two(), PixelSize::new(1, 4));
    }

    #[test]
    fn empty_size() {
        assert!(PixelSize::new(0, 10).is_empty());
        assert!(!PixelSize::new(1, 1).is_empty());
    }
}
