use derive_more::Debug;
use swash::{
    scale::{Render, ScaleContext, Source, StrikeWith, image::Content},
    zeno::{Format, Placement, Vector},
};
use tracing::instrument;

use super::{
    FontId, FontManager, FontWeight, GlyphRasterizer, RasterizationRequest, RasterizedGlyph,
};

/// A font instance as the swash rasterizer sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwashFont {
    pub id: FontId,
    // f32 is not Eq or Hash.
    size_bits: u32,
    pub weight: FontWeight,
    pub hinted: bool,
}

impl SwashFont {
    /// A font at `size` logical points, normal weight, hinted.
    pub fn new(id: FontId, size: f32) -> Self {
        Self {
            id,
            size_bits: size.to_bits(),
            weight: FontWeight::NORMAL,
            hinted: true,
        }
    }

    pub fn with_weight(mut self, weight: FontWeight) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_hinting(mut self, hinted: bool) -> Self {
        self.hinted = hinted;
        self
    }

    pub fn size(&self) -> f32 {
        f32::from_bits(self.size_bits)
    }
}

/// Rasterizes outlines, color outlines and color bitmaps with swash.
#[derive(Debug)]
pub struct SwashRasterizer {
    fonts: FontManager,
    // Font cache and scratch buffers.
    #[debug(skip)]
    context: ScaleContext,
}

impl SwashRasterizer {
    pub fn new(fonts: FontManager) -> Self {
        Self {
            fonts,
            context: ScaleContext::new(),
        }
    }

    pub fn fonts(&self) -> &FontManager {
        &self.fonts
    }
}

impl GlyphRasterizer for SwashRasterizer {
    type Font = SwashFont;

    #[instrument(skip_all)]
    fn rasterize(&mut self, request: &RasterizationRequest<'_, SwashFont>) -> RasterizedGlyph {
        let font = request.font;
        let Some(face) = self.fonts.get_font(font.id, font.weight) else {
            log::warn!("did not find font {:?}", font.id);
            return RasterizedGlyph::empty();
        };

        let mut scaler = self
            .context
            .builder(face.as_swash())
            .size(font.size() * request.scale_factor)
            .hint(font.hinted)
            .variations(&[("wght", font.weight.0 as f32)])
            .build();

        let image = Render::new(&[
            Source::ColorOutline(0),
            Source::ColorBitmap(StrikeWith::BestFit),
            Source::Outline,
        ])
        .format(Format::Alpha)
        .offset(Vector::new(request.offset.x, request.offset.y))
        .render(&mut scaler, request.glyph);

        match image {
            Some(image) => on_black_and_white(image.content, image.placement, &image.data),
            None => {
                log::debug!("glyph {} of font {:?} has no image", request.glyph, font.id);
                RasterizedGlyph::empty()
            }
        }
    }
}

/// Composes a swash image against a black and against a white background.
///
/// Masks are white ink on black and black ink on white, encoded in sRGB. Color images are
/// composited over both backgrounds.
fn on_black_and_white(content: Content, placement: Placement, data: &[u8]) -> RasterizedGlyph {
    let pixels = placement.width as usize * placement.height as usize;
    let mut on_black = Vec::with_capacity(pixels * 4);
    let mut on_white = Vec::with_capacity(pixels * 4);

    match content {
        Content::Mask => {
            for &coverage in &data[..pixels] {
                let black = encode_srgb(coverage);
                let white = encode_srgb(255 - coverage);
                on_black.extend_from_slice(&[black, black, black, 255]);
                on_white.extend_from_slice(&[white, white, white, 255]);
            }
        }
        Content::SubpixelMask => {
            for px in data.chunks_exact(4).take(pixels) {
                let [r, g, b] = [px[0], px[1], px[2]];
                on_black.extend_from_slice(&[encode_srgb(r), encode_srgb(g), encode_srgb(b), 255]);
                on_white.extend_from_slice(&[
                    encode_srgb(255 - r),
                    encode_srgb(255 - g),
                    encode_srgb(255 - b),
                    255,
                ]);
            }
        }
        Content::Color => {
            for px in data.chunks_exact(4).take(pixels) {
                let alpha = px[3] as u32;
                for &c in &px[..3] {
                    let over_black = (c as u32 * alpha + 127) / 255;
                    on_black.push(over_black as u8);
                }
                on_black.push(255);
                for &c in &px[..3] {
                    let over_black = (c as u32 * alpha + 127) / 255;
                    on_white.push((over_black + 255 - alpha) as u8);
                }
                on_white.push(255);
            }
        }
    }

    RasterizedGlyph::new(placement, on_black, on_white)
}

/// Encodes a linear intensity as sRGB.
fn encode_srgb(linear: u8) -> u8 {
    let v = linear as f32 / 255.0;
    let encoded = if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round().clamp(0.0, 255.0) as u8
}
