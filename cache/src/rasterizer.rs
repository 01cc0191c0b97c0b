//! The capability the glyph cache needs from a font backend.
use std::hash::Hash;

use glyphcache_geometry::{OffsetPx, SizePx};
pub use swash::zeno::Placement;

use crate::{atlas::BYTES_PER_PIXEL, glyph::GlyphId};

mod font_manager;
mod swash_rasterizer;

pub use font_manager::*;
pub use swash_rasterizer::*;

pub trait GlyphRasterizer {
    /// Identifies a font instance: face, size and style. Everything that changes the pixels of a
    /// glyph except the sub-pixel offset and the scale factor must be part of it.
    type Font: Clone + Eq + Hash;

    /// Renders a glyph against a black and against a white background.
    ///
    /// Must not fail. Glyphs that can't be rendered should produce an empty or placeholder
    /// image.
    fn rasterize(&mut self, request: &RasterizationRequest<'_, Self::Font>) -> RasterizedGlyph;
}

#[derive(Debug)]
pub struct RasterizationRequest<'a, F> {
    pub glyph: GlyphId,
    pub font: &'a F,
    /// Fractional offset in physical pixels, already quantized.
    pub offset: OffsetPx,
    /// Physical pixels per logical point.
    pub scale_factor: f32,
}

/// Two RGBA renders of one glyph and where to put them relative to the pen position.
#[derive(Debug, Clone)]
pub struct RasterizedGlyph {
    placement: Placement,
    on_black: Vec<u8>,
    on_white: Vec<u8>,
}

impl RasterizedGlyph {
    /// Both images are tightly packed RGBA rows of the placement's size.
    pub fn new(placement: Placement, on_black: Vec<u8>, on_white: Vec<u8>) -> Self {
        let len = placement.width as usize * placement.height as usize * BYTES_PER_PIXEL;
        assert_eq!(on_black.len(), len, "Black render does not match its placement");
        assert_eq!(on_white.len(), len, "White render does not match its placement");
        Self {
            placement,
            on_black,
            on_white,
        }
    }

    pub fn empty() -> Self {
        Self {
            placement: Placement {
                left: 0,
                top: 0,
                width: 0,
                height: 0,
            },
            on_black: Vec::new(),
            on_white: Vec::new(),
        }
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn size(&self) -> SizePx {
        SizePx::new(self.placement.width, self.placement.height)
    }

    pub fn is_empty(&self) -> bool {
        self.placement.width == 0 || self.placement.height == 0
    }

    pub fn on_black(&self) -> &[u8] {
        &self.on_black
    }

    pub fn on_white(&self) -> &[u8] {
        &self.on_white
    }
}
