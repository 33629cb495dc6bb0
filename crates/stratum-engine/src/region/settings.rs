/// Global fill behaviour for every region of a pass.
///
/// `None` and `All` are served by the cheap renderer, which needs no
/// stencil work. `Padding` selects the precise renderer, which honours
/// each shape's [`FillPolicy`](super::FillPolicy).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum FillMode {
    None,
    All,
    #[default]
    Padding,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RegionSettings {
    pub fill_mode: FillMode,
    /// Draw every outline as a one-pixel black line, even for shapes with
    /// no outline of their own.
    pub black_outline: bool,
}

impl RegionSettings {
    #[inline]
    pub fn is_precise(&self) -> bool {
        self.fill_mode == FillMode::Padding
    }
}

/// Pen widths and opacities shared by all regions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RegionLook {
    /// Width `t` of the pen that defines the padding band. Polygon bands
    /// reach `t / 2` into the shape; circle bands cover radii
    /// `r - 3t/4 ..= r - t/4`.
    pub thick_pen_width: u32,
    /// Fill opacity in the precise renderer.
    pub fill_alpha: u8,
    /// Fill opacity in the cheap renderer.
    pub cheap_fill_alpha: u8,
}

impl Default for RegionLook {
    fn default() -> Self {
        Self { thick_pen_width: 10, fill_alpha: 90, cheap_fill_alpha: 48 }
    }
}
