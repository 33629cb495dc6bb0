use std::num::NonZeroUsize;

use lru::LruCache;

use crate::coords::PixelSize;
use crate::gpu::{Backend, GpuContext, GpuTexture, PixelFormat};

use super::{Font, FontSystem};

/// Rendered-text lookup used by the canvas.
///
/// Sizes may be answered without rendering; [`GlyphCache::get`] renders on
/// a miss and returns an alpha texture holding the whole run.
pub trait GlyphCache<B: Backend> {
    /// Size of a run that is already cached, without touching fonts.
    fn lookup_size(&self, font: Font, text: &str) -> Option<PixelSize>;

    /// Size of a run, measuring it on a miss.
    fn get_size(&mut self, font: Font, text: &str) -> PixelSize;

    /// Texture for a run, rendering and uploading it on a miss. `None` for
    /// runs with nothing visible or when the upload fails.
    fn get(&mut self, ctx: &mut GpuContext<B>, font: Font, text: &str) -> Option<&GpuTexture>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    font: Font,
    text: String,
}

struct Entry {
    size: PixelSize,
    texture: Option<GpuTexture>,
}

/// Bounded text cache: whole runs rasterized with `fontdue` into alpha
/// textures. The least recently used run is evicted first, so labels drawn
/// every frame stay resident.
pub struct TextCache {
    fonts: FontSystem,
    entries: LruCache<Key, Entry>,
}

impl TextCache {
    pub const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(256).unwrap();

    pub fn new(fonts: FontSystem) -> Self {
        Self::with_capacity(fonts, Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(fonts: FontSystem, capacity: NonZeroUsize) -> Self {
        Self { fonts, entries: LruCache::new(capacity) }
    }

    #[inline]
    pub fn fonts(&self) -> &FontSystem {
        &self.fonts
    }

    #[inline]
    pub fn fonts_mut(&mut self) -> &mut FontSystem {
        &mut self.fonts
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every cached run. Textures are released on the next GPU call.
    pub fn flush(&mut self) {
        self.entries.clear();
    }

    /// Evicted textures are released on the next GPU call.
    fn insert(&mut self, key: Key, entry: Entry) {
        if let Some((evicted, _)) = self.entries.push(key, entry) {
            log::trace!("text cache evicted {:?}", evicted.text);
        }
    }
}

impl<B: Backend> GlyphCache<B> for TextCache {
    fn lookup_size(&self, font: Font, text: &str) -> Option<PixelSize> {
        let key = Key { font, text: text.to_owned() };
        self.entries.peek(&key).map(|e| e.size)
    }

    fn get_size(&mut self, font: Font, text: &str) -> PixelSize {
        let key = Key { font, text: text.to_owned() };
        if let Some(entry) = self.entries.get(&key) {
            return entry.size;
        }
        let size = self.fonts.measure_text(text, font.id, font.height);
        self.insert(key, Entry { size, texture: None });
        size
    }

    fn get(&mut self, ctx: &mut GpuContext<B>, font: Font, text: &str) -> Option<&GpuTexture> {
        let key = Key { font, text: text.to_owned() };

        let rendered = self.entries.get(&key).is_some_and(|e| e.texture.is_some());
        if !rendered {
            let run = self.fonts.rasterize(text, font.id, font.height)?;
            let texture = GpuTexture::new(ctx, PixelFormat::Alpha, run.size, Some(&run.coverage))?;
            match self.entries.get_mut(&key) {
                Some(entry) => {
                    entry.size = run.size;
                    entry.texture = Some(texture);
                }
                None => self.insert(key.clone(), Entry { size: run.size, texture: Some(texture) }),
            }
        }

        self.entries.peek(&key).and_then(|e| e.texture.as_ref())
    }
}
