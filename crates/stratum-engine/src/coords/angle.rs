use std::f64::consts::{PI, TAU};
use std::ops::{Add, Neg, Sub};

/// Bearing in radians, measured clockwise from north (screen up).
///
/// Values are not normalized on construction; use [`Angle::as_bearing`] or
/// [`Angle::as_delta`] where a canonical range matters.
#[derive(Debug, Copy, Clone, Default, PartialEq, PartialOrd)]
pub struct Angle(f64);

impl Angle {
    pub const ZERO: Angle = Angle(0.0);
    pub const HALF_CIRCLE: Angle = Angle(PI);
    pub const FULL_CIRCLE: Angle = Angle(TAU);

    #[inline]
    pub const fn radians(r: f64) -> Self {
        Self(r)
    }

    #[inline]
    pub fn degrees(d: f64) -> Self {
        Self(d.to_radians())
    }

    #[inline]
    pub const fn as_radians(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn as_degrees(self) -> f64 {
        self.0.to_degrees()
    }

    /// Normalized to `[0, 2π)`.
    #[inline]
    pub fn as_bearing(self) -> Angle {
        let r = self.0.rem_euclid(TAU);
        // rem_euclid can round up to TAU for tiny negative inputs.
        Angle(if r >= TAU { 0.0 } else { r })
    }

    /// Normalized to `(-π, π]`.
    #[inline]
    pub fn as_delta(self) -> Angle {
        let b = self.as_bearing().0;
        Angle(if b > PI { b - TAU } else { b })
    }

    #[inline]
    pub fn abs(self) -> Angle {
        Angle(self.0.abs())
    }

    #[inline]
    pub fn sin(self) -> f64 {
        self.0.sin()
    }

    #[inline]
    pub fn cos(self) -> f64 {
        self.0.cos()
    }
}

impl Add for Angle {
    type Output = Angle;
    #[inline]
    fn add(self, rhs: Angle) -> Angle {
        Angle(self.0 + rhs.0)
    }
}

impl Sub for Angle {
    type Output = Angle;
    #[inline]
    fn sub(self, rhs: Angle) -> Angle {
        Angle(self.0 - rhs.0)
    }
}

impl Neg for Angle {
    type Output = Angle;
    #[inline]
    fn neg(self) -> Angle {
        Angle(-self.0)
    }
}
