mod cached_glyph;
mod glyph_cache;
mod glyph_key;
mod image_padding;

pub use cached_glyph::*;
pub use glyph_cache::*;
pub use glyph_key::*;
