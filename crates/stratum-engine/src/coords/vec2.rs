use std::ops::{Add, Div, Mul, Neg, Sub};

/// 2D vector in floating-point pixels.
///
/// Used for vertex positions after integer canvas coordinates have been
/// converted, and for geometry that needs sub-pixel precision (stroke
/// expansion, donut tables).
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline]
    pub fn dot(self, rhs: Vec2) -> f32 {
        self.x * rhs.x + self.y * rhs.y
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Rotates by 90 degrees (clockwise on a y-down screen).
    #[inline]
    pub fn perp(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    /// Unit vector in the same direction, or `None` for a zero-length vector.
    #[inline]
    pub fn normalized(self) -> Option<Vec2> {
        let len = self.length();
        if len > f32::EPSILON && len.is_finite() {
            Some(self / len)
        } else {
            None
        }
    }
}

macro_rules! componentwise {
    ($trait:ident, $method:ident, $op:tt, Vec2) => {
        impl $trait for Vec2 {
            type Output = Vec2;
            #[inline]
            fn $method(self, rhs: Vec2) -> Vec2 {
                Vec2::new(self.x $op rhs.x, self.y $op rhs.y)
            }
        }
    };
    ($trait:ident, $method:ident, $op:tt, f32) => {
        impl $trait<f32> for Vec2 {
            type Output = Vec2;
            #[inline]
            fn $method(self, rhs: f32) -> Vec2 {
                Vec2::new(self.x $op rhs, self.y $op rhs)
            }
        }
    };
}

componentwise!(Add, add, +, Vec2);
componentwise!(Sub, sub, -, Vec2);
componentwise!(Mul, mul, *, f32);
componentwise!(Div, div, /, f32);

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline]
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}
