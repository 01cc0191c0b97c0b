use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use glyphcache_geometry::{PointPx, SizePx, normalized_point, normalized_size};
use static_assertions::const_assert_eq;

/// Where a cached glyph lives in the atlas and how to place its quad.
///
/// Positions and sizes are in logical points, texture coordinates are normalized. The quad's
/// top-left corner is at the integral pen position plus `inset`, with y pointing down.
///
/// Both texture coordinates address a region of `tex_size`: the glyph rendered against a black
/// background and against a white background.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct CachedGlyph {
    pub inset: [f32; 2],
    pub size: [f32; 2],
    pub tex_size: [f32; 2],
    pub tex_coords_black: [f32; 2],
    pub tex_coords_white: [f32; 2],
}

const_assert_eq!(size_of::<CachedGlyph>(), 40);

impl CachedGlyph {
    /// A glyph without pixels, a space for example.
    pub const EMPTY: Self = Self {
        inset: [0.0; 2],
        size: [0.0; 2],
        tex_size: [0.0; 2],
        tex_coords_black: [0.0; 2],
        tex_coords_white: [0.0; 2],
    };

    pub(crate) fn new(
        placement: GlyphPlacementPx,
        scale_factor: f32,
        atlas_size: SizePx,
    ) -> Self {
        let GlyphPlacementPx {
            left,
            top,
            size,
            black,
            white,
        } = placement;

        Self {
            inset: [left as f32 / scale_factor, -top as f32 / scale_factor],
            size: [
                size.width as f32 / scale_factor,
                size.height as f32 / scale_factor,
            ],
            tex_size: normalized_size(size, atlas_size),
            tex_coords_black: normalized_point(black, atlas_size),
            tex_coords_white: normalized_point(white, atlas_size),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size[0] == 0.0 || self.size[1] == 0.0
    }
}

/// The physical pixel layout of one glyph in the atlas.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GlyphPlacementPx {
    /// Horizontal distance from the pen position to the bitmap's left edge.
    pub left: i32,
    /// Distance from the baseline up to the bitmap's top edge.
    pub top: i32,
    pub size: SizePx,
    pub black: PointPx,
    pub white: PointPx,
}
