use thiserror::Error;

use crate::coords::PixelSize;

/// Error returned by [`FontSystem::load_font`].
#[derive(Debug, Clone, Error)]
#[error("font load error: {0}")]
pub struct FontLoadError(pub String);

/// Opaque handle to a font loaded into a [`FontSystem`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FontId(pub(crate) usize);

/// Owns a collection of loaded fonts.
///
/// Fonts are immutable after loading. The system is owned by the text
/// cache, which rasterizes runs on demand.
pub struct FontSystem {
    fonts: Vec<fontdue::Font>,
}

/// A rasterized text run: 8-bit coverage, rows tightly packed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterizedRun {
    pub size: PixelSize,
    pub coverage: Vec<u8>,
}

impl FontSystem {
    pub fn new() -> Self {
        Self { fonts: Vec::new() }
    }

    /// Parses and stores a TrueType or OpenType font from raw bytes.
    pub fn load_font(&mut self, bytes: &[u8]) -> Result<FontId, FontLoadError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontLoadError(e.to_string()))?;
        let id = FontId(self.fonts.len());
        self.fonts.push(font);
        log::debug!("loaded font {:?} as {id:?}", font_name(&self.fonts[id.0]));
        Ok(id)
    }

    pub(crate) fn get(&self, id: FontId) -> Option<&fontdue::Font> {
        self.fonts.get(id.0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    fn layout(font: &fontdue::Font, text: &str, size: f32) -> fontdue::layout::Layout<()> {
        use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};

        let mut layout: Layout<()> = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings::default());
        layout.append(&[font], &TextStyle::new(text, size, 0));
        layout
    }

    /// Bounding size of a single-line run at `height` pixels.
    ///
    /// Unknown fonts and empty text measure as zero width with the nominal
    /// line height.
    #[must_use]
    pub fn measure_text(&self, text: &str, id: FontId, height: u32) -> PixelSize {
        let size = height as f32;
        let line = (size * 1.2).ceil() as u32;

        let Some(font) = self.get(id) else {
            return PixelSize::new(0, line);
        };
        if text.is_empty() {
            return PixelSize::new(0, line);
        }

        let layout = Self::layout(font, text, size);
        let glyphs = layout.glyphs();

        // Advance extent, not bitmap extent, so adjacent runs line up.
        let w = glyphs
            .iter()
            .map(|g| {
                let m = font.metrics_indexed(g.key.glyph_index, size);
                (g.x - m.xmin as f32 + m.advance_width).max(0.0)
            })
            .fold(0.0f32, f32::max);
        let h = glyphs.iter().map(|g| g.y + g.height as f32).fold(size, f32::max);
        PixelSize::new(w.ceil() as u32, (h.ceil() as u32).max(line))
    }

    /// Rasterizes `text` into a coverage bitmap of [`measure_text`] size.
    ///
    /// `None` for unknown fonts and runs with no visible extent.
    ///
    /// [`measure_text`]: FontSystem::measure_text
    pub fn rasterize(&self, text: &str, id: FontId, height: u32) -> Option<RasterizedRun> {
        let font = self.get(id)?;
        let size = self.measure_text(text, id, height);
        if size.is_empty() {
            return None;
        }

        let layout = Self::layout(font, text, height as f32);
        let (w, h) = (size.width as i32, size.height as i32);
        let mut coverage = vec![0u8; size.area()];

        for g in layout.glyphs() {
            if g.width == 0 || g.height == 0 {
                continue;
            }
            let (_, bitmap) = font.rasterize_config(g.key);
            let ox = g.x.round() as i32;
            let oy = g.y.round() as i32;
            for gy in 0..g.height as i32 {
                let y = oy + gy;
                if y < 0 || y >= h {
                    continue;
                }
                for gx in 0..g.width as i32 {
                    let x = ox + gx;
                    if x < 0 || x >= w {
                        continue;
                    }
                    let src = bitmap[(gy * g.width as i32 + gx) as usize];
                    let dst = &mut coverage[(y * w + x) as usize];
                    *dst = (*dst).max(src);
                }
            }
        }

        Some(RasterizedRun { size, coverage })
    }
}

fn font_name(font: &fontdue::Font) -> Option<&str> {
    font.name()
}

impl Default for FontSystem {
    fn default() -> Self {
        Self::new()
    }
}
