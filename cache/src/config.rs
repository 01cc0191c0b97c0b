//! The glyph cache's configuration

use glyphcache_geometry::SizePx;

use crate::glyph::SubpixelBins;

#[derive(Debug, Clone, PartialEq)]
pub struct GlyphCacheConfig {
    /// Size of the atlas texture in physical pixels. Fixed for the lifetime of the cache.
    pub atlas_size: SizePx,
    /// Pixels around each render, so that bilinear sampling does not pick up neighbors.
    pub padding: u32,
    pub subpixel_bins: SubpixelBins,
}

impl Default for GlyphCacheConfig {
    fn default() -> Self {
        Self {
            atlas_size: SizePx::new(2048, 2048),
            padding: 1,
            subpixel_bins: SubpixelBins::default(),
        }
    }
}

impl GlyphCacheConfig {
    pub fn with_atlas_size(mut self, atlas_size: impl Into<SizePx>) -> Self {
        self.atlas_size = atlas_size.into();
        self
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_subpixel_bins(mut self, x: u8, y: u8) -> Self {
        self.subpixel_bins = SubpixelBins::new(x, y);
        self
    }
}
