use super::FontId;

/// A font at a pixel height; what the canvas selects before drawing text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Font {
    pub id: FontId,
    pub height: u32,
}

impl Font {
    #[inline]
    pub const fn new(id: FontId, height: u32) -> Self {
        Self { id, height }
    }

    /// Rough average glyph width, used to clip strings before layout.
    #[inline]
    pub const fn approximate_char_width(&self) -> u32 {
        let w = self.height / 4;
        if w == 0 { 1 } else { w }
    }
}
