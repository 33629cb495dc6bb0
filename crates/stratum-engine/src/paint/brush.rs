use super::Color;

/// Fill description for closed shapes.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Brush {
    /// No fill; closed shapes draw their outline only.
    #[default]
    Hollow,
    Solid(Color),
}

impl Brush {
    #[inline]
    pub const fn solid(color: Color) -> Self {
        Brush::Solid(color)
    }

    #[inline]
    pub const fn is_hollow(&self) -> bool {
        matches!(self, Brush::Hollow)
    }

    /// Fill color, or `None` for a hollow brush.
    #[inline]
    pub const fn color(&self) -> Option<Color> {
        match self {
            Brush::Hollow => None,
            Brush::Solid(c) => Some(*c),
        }
    }
}
