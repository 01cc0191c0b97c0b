use anyhow::{Result, ensure};
use glyphcache_geometry::OffsetPx;

/// A glyph index inside a font.
pub type GlyphId = u16;

/// The number of discrete sub-pixel positions per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubpixelBins {
    pub x: u8,
    pub y: u8,
}

impl Default for SubpixelBins {
    fn default() -> Self {
        Self { x: 4, y: 4 }
    }
}

impl SubpixelBins {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.x > 0 && self.y > 0,
            "Sub-pixel bins must be at least 1 per axis, got {}x{}",
            self.x,
            self.y
        );
        Ok(())
    }

    /// Quantizes the fractional part of `offset` to a bin.
    ///
    /// The integral part is the caller's business, it belongs to the pen position. Bins are
    /// floored, so the quantized offset never exceeds the requested one.
    pub fn quantize(&self, offset: OffsetPx) -> SubpixelBin {
        SubpixelBin {
            x: quantize_axis(offset.x, self.x),
            y: quantize_axis(offset.y, self.y),
        }
    }

    /// The fractional offset in pixels a bin represents.
    pub fn offset(&self, bin: SubpixelBin) -> OffsetPx {
        OffsetPx::new(
            bin.x as f32 / self.x as f32,
            bin.y as f32 / self.y as f32,
        )
    }
}

fn quantize_axis(offset: f32, bins: u8) -> u8 {
    if !offset.is_finite() || bins <= 1 {
        return 0;
    }
    let fraction = offset.rem_euclid(1.0);
    // rem_euclid may return exactly 1.0 for tiny negative values.
    let bin = (fraction * bins as f32).floor() as u32;
    bin.min(bins as u32 - 1) as u8
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SubpixelBin {
    pub x: u8,
    pub y: u8,
}

/// Identifies one cached glyph: which glyph, in which font instance, at which sub-pixel bin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlyphKey<F> {
    pub glyph: GlyphId,
    pub font: F,
    pub bin: SubpixelBin,
}
