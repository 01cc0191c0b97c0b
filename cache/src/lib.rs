//! A glyph cache that rasterizes glyphs at a fixed scale factor into a single atlas texture.
//!
//! [`GlyphCache::cached_glyph`] is the only lookup. On a miss, the glyph is rendered by a
//! [`GlyphRasterizer`] against a black and a white background, and both renders are packed next
//! to each other into the atlas. When the atlas is full, every glyph is evicted at once.

mod atlas;
mod config;
mod glyph;
mod rasterizer;
mod stats;

pub use atlas::{Atlas, AtlasTexture, BYTES_PER_PIXEL, CpuAtlasTexture, WgpuAtlasTexture};
pub use config::GlyphCacheConfig;
pub use glyph::*;
pub use glyphcache_geometry::{BoxPx, OffsetPx, PointPx, SizePx};
pub use rasterizer::*;
pub use stats::GlyphCacheStats;
