//! Text: font loading, measuring and the rendered-run cache.

mod cache;
mod font;
mod font_system;

pub use cache::{GlyphCache, TextCache};
pub use font::Font;
pub use font_system::{FontId, FontLoadError, FontSystem, RasterizedRun};
