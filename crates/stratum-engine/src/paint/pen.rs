use super::Color;

/// Stroke pattern for [`Pen`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum PenStyle {
    #[default]
    Solid,
    Dash1,
    Dash2,
    Dash3,
}

/// Stroke description: width, color and dash style.
///
/// A pen with width 0 is *undefined*; operations that stroke skip the
/// outline entirely when the pen is undefined.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Pen {
    width: u32,
    color: Color,
    style: PenStyle,
}

impl Pen {
    /// Dash period in pixels for every dashed style.
    pub const DASH_PERIOD: f32 = 32.0;

    /// The undefined pen.
    pub const NULL: Pen = Pen { width: 0, color: Color::TRANSPARENT, style: PenStyle::Solid };

    #[inline]
    pub const fn new(width: u32, color: Color) -> Self {
        Self { width, color, style: PenStyle::Solid }
    }

    #[inline]
    pub const fn with_style(mut self, style: PenStyle) -> Self {
        self.style = style;
        self
    }

    #[inline]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub const fn color(&self) -> Color {
        self.color
    }

    #[inline]
    pub const fn style(&self) -> PenStyle {
        self.style
    }

    #[inline]
    pub const fn is_defined(&self) -> bool {
        self.width > 0
    }

    /// Thin pens are drawn with GPU line primitives; thicker ones are
    /// expanded into triangles.
    #[inline]
    pub const fn is_thin(&self) -> bool {
        self.width <= 2
    }

    /// `(period, on_ratio)` for dashed styles, `None` for solid pens.
    #[inline]
    pub fn dash_pattern(&self) -> Option<(f32, f32)> {
        match self.style {
            PenStyle::Solid => None,
            PenStyle::Dash1 | PenStyle::Dash2 | PenStyle::Dash3 => Some((Self::DASH_PERIOD, 0.6)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_pen_is_undefined() {
        assert!(!Pen::NULL.is_defined());
        assert!(Pen::new(1, Color::BLACK).is_defined());
    }

    #[test]
    fn thin_threshold_is_two_pixels() {
        assert!(Pen::new(2, Color::BLACK).is_thin());
        assert!(!Pen::new(3, Color::BLACK).is_thin());
    }

    #[test]
    fn dash_pattern_only_for_dashed_styles() {
        let pen = Pen::new(1, Color::BLACK);
        assert_eq!(pen.dash_pattern(), None);
        assert_eq!(pen.with_style(PenStyle::Dash2).dash_pattern(), Some((32.0, 0.6)));
    }
}
