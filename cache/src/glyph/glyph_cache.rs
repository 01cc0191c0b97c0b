//! The keyed cache in front of rasterization and atlas allocation.
use std::{collections::HashMap, fmt};

use anyhow::{Result, anyhow, bail, ensure};
use euclid::vec2;
use glyphcache_geometry::{BoxPx, OffsetPx, SizePx, box_px};
use tracing::instrument;

use super::{
    CachedGlyph, GlyphId, GlyphKey, SubpixelBins, cached_glyph::GlyphPlacementPx,
    image_padding::pad_image_data,
};
use crate::{
    GlyphCacheConfig, GlyphCacheStats,
    atlas::{Atlas, AtlasTexture, WgpuAtlasTexture},
    rasterizer::{GlyphRasterizer, RasterizationRequest},
};

const OPAQUE_BLACK: [u8; 4] = [0, 0, 0, 255];
const OPAQUE_WHITE: [u8; 4] = [255, 255, 255, 255];

const MAX_ATLAS_DIM: u32 = u16::MAX as u32;
const MAX_PADDING: u32 = 64;

/// Rasterized glyphs at one fixed scale factor, packed into one atlas texture.
///
/// Every glyph is stored twice, rendered against black and against white, side by side in one
/// atlas slot. When the atlas runs full, all glyphs are evicted at once and the
/// [generation](Self::generation) increases. `CachedGlyph`s returned before that must not be used
/// anymore.
///
/// Lookups need `&mut self`. To share a cache between threads, put it behind a mutex.
pub struct GlyphCache<R: GlyphRasterizer, T = WgpuAtlasTexture> {
    rasterizer: R,
    atlas: Atlas<T>,
    glyphs: HashMap<GlyphKey<R::Font>, CachedGlyph>,
    scale_factor: f32,
    padding: u32,
    subpixel_bins: SubpixelBins,
    generation: u64,
    stats: GlyphCacheStats,
}

impl<R, T> fmt::Debug for GlyphCache<R, T>
where
    R: GlyphRasterizer + fmt::Debug,
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlyphCache")
            .field("rasterizer", &self.rasterizer)
            .field("atlas", &self.atlas)
            .field("glyphs", &self.glyphs.len())
            .field("scale_factor", &self.scale_factor)
            .field("generation", &self.generation)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<R: GlyphRasterizer> GlyphCache<R, WgpuAtlasTexture> {
    /// Creates a cache with the default configuration and a new atlas texture on `device`.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rasterizer: R,
        scale_factor: f32,
    ) -> Result<Self> {
        Self::with_config(
            device,
            queue,
            rasterizer,
            scale_factor,
            GlyphCacheConfig::default(),
        )
    }

    pub fn with_config(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rasterizer: R,
        scale_factor: f32,
        config: GlyphCacheConfig,
    ) -> Result<Self> {
        let texture = WgpuAtlasTexture::new(device, queue, config.atlas_size);
        Self::with_texture(texture, rasterizer, scale_factor, config)
    }
}

impl<R: GlyphRasterizer, T: AtlasTexture> GlyphCache<R, T> {
    /// Creates a cache that renders into `texture`. `config.atlas_size` is ignored, the texture's
    /// size is used.
    pub fn with_texture(
        texture: T,
        rasterizer: R,
        scale_factor: f32,
        config: GlyphCacheConfig,
    ) -> Result<Self> {
        ensure!(
            scale_factor.is_finite() && scale_factor > 0.0,
            "Scale factor must be positive, got {scale_factor}"
        );
        config.subpixel_bins.validate()?;
        let atlas_size = texture.size();
        ensure!(!atlas_size.is_empty(), "Glyph atlas texture is empty");
        // The shelf allocator works with u16 coordinates and an i32 area.
        ensure!(
            atlas_size.width <= MAX_ATLAS_DIM
                && atlas_size.height <= MAX_ATLAS_DIM
                && (atlas_size.width as u64 * atlas_size.height as u64) <= i32::MAX as u64,
            "Glyph atlas of {}x{} is too large",
            atlas_size.width,
            atlas_size.height
        );
        ensure!(
            config.padding <= MAX_PADDING,
            "Glyph padding must not exceed {MAX_PADDING} pixels, got {}",
            config.padding
        );

        log::info!(
            "Glyph cache with a {}x{} atlas at scale factor {scale_factor}",
            atlas_size.width,
            atlas_size.height
        );

        Ok(Self {
            rasterizer,
            atlas: Atlas::new(texture),
            glyphs: HashMap::default(),
            scale_factor,
            padding: config.padding,
            subpixel_bins: config.subpixel_bins,
            generation: 0,
            stats: GlyphCacheStats::default(),
        })
    }

    /// Returns the glyph, rasterizing and uploading it first if it's not cached.
    ///
    /// Only the fractional part of `subpixel_offset` is used. The returned glyph is positioned
    /// relative to the integral pen position.
    ///
    /// Fails only if the glyph can not fit into the atlas, even if the atlas is empty.
    pub fn cached_glyph(
        &mut self,
        glyph: GlyphId,
        font: &R::Font,
        subpixel_offset: OffsetPx,
    ) -> Result<CachedGlyph> {
        let key = GlyphKey {
            glyph,
            font: font.clone(),
            bin: self.subpixel_bins.quantize(subpixel_offset),
        };

        if let Some(cached) = self.glyphs.get(&key) {
            self.stats.hits += 1;
            return Ok(*cached);
        }

        self.stats.misses += 1;
        // This may evict all glyphs, so insert afterwards.
        let cached = self.rasterize_and_store(&key)?;
        self.glyphs.insert(key, cached);
        Ok(cached)
    }

    #[instrument(skip_all)]
    fn rasterize_and_store(&mut self, key: &GlyphKey<R::Font>) -> Result<CachedGlyph> {
        log::trace!("Rasterizing glyph {} at {:?}", key.glyph, key.bin);

        let image = self.rasterizer.rasterize(&RasterizationRequest {
            glyph: key.glyph,
            font: &key.font,
            offset: self.subpixel_bins.offset(key.bin),
            scale_factor: self.scale_factor,
        });

        if image.is_empty() {
            return Ok(CachedGlyph::EMPTY);
        }

        let size = image.size();
        let pad = self.padding;
        let (padded, slot) = slot_size(size, pad).ok_or_else(|| {
            anyhow!(
                "Glyph of {}x{} pixels is too large for an atlas slot",
                size.width,
                size.height
            )
        })?;
        let region = self.allocate(slot)?;

        let black = region.min;
        let white = region.min + vec2(padded.width as i32, 0);

        let (width, height, pad) = (size.width as usize, size.height as usize, pad as usize);
        let on_black = pad_image_data(image.on_black(), width, height, pad, OPAQUE_BLACK);
        let on_white = pad_image_data(image.on_white(), width, height, pad, OPAQUE_WHITE);
        self.atlas.upload(box_px(black, padded), &on_black);
        self.atlas.upload(box_px(white, padded), &on_white);

        let inner = vec2(pad as i32, pad as i32);
        let placement = image.placement();
        Ok(CachedGlyph::new(
            GlyphPlacementPx {
                left: placement.left,
                top: placement.top,
                size,
                black: black + inner,
                white: white + inner,
            },
            self.scale_factor,
            self.atlas.size(),
        ))
    }

    /// Allocates a slot, evicting everything once if the atlas is full.
    fn allocate(&mut self, slot: SizePx) -> Result<BoxPx> {
        let atlas_size = self.atlas.size();
        if !self.atlas.fits_empty(slot) {
            // Evicting would not help.
            bail!(
                "Glyph slot of {}x{} does not fit into the {}x{} atlas",
                slot.width,
                slot.height,
                atlas_size.width,
                atlas_size.height
            );
        }

        if let Some(region) = self.atlas.allocate(slot) {
            return Ok(region);
        }

        log::info!(
            "Glyph atlas full with {} glyphs, evicting all of them",
            self.glyphs.len()
        );
        self.evict_all();
        self.stats.resets += 1;

        match self.atlas.allocate(slot) {
            Some(region) => Ok(region),
            None => bail!(
                "Glyph slot of {}x{} does not fit into the empty {}x{} atlas",
                slot.width,
                slot.height,
                atlas_size.width,
                atlas_size.height
            ),
        }
    }

    /// Evicts all glyphs. Like an atlas overflow, this starts a new generation, but it is not
    /// counted in [`GlyphCacheStats::resets`].
    pub fn clear(&mut self) {
        log::debug!("Clearing glyph cache with {} glyphs", self.glyphs.len());
        self.evict_all();
    }

    fn evict_all(&mut self) {
        // Forget the keys before any region can be handed out again.
        self.glyphs.clear();
        self.atlas.reset();
        self.generation += 1;
    }

    /// The atlas texture to sample `CachedGlyph`s from.
    pub fn texture(&self) -> &T {
        self.atlas.texture()
    }

    pub fn atlas_size(&self) -> SizePx {
        self.atlas.size()
    }

    pub fn atlas_utilization(&self) -> f32 {
        self.atlas.utilization()
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    /// The number of times all glyphs were evicted.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The number of cached glyphs.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn stats(&self) -> GlyphCacheStats {
        self.stats
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }
}

/// The padded size of one render and the size of the slot holding both renders side by side.
fn slot_size(size: SizePx, pad: u32) -> Option<(SizePx, SizePx)> {
    let border = pad.checked_mul(2)?;
    let padded = SizePx::new(
        size.width.checked_add(border)?,
        size.height.checked_add(border)?,
    );
    let slot = SizePx::new(padded.width.checked_mul(2)?, padded.height);
    Some((padded, slot))
}

impl<R: GlyphRasterizer, T> Drop for GlyphCache<R, T> {
    fn drop(&mut self) {
        let stats = self.stats;
        if stats.lookups() == 0 {
            return;
        }

        log::debug!(
            "Glyph cache: {} lookups, {} misses, {} resets",
            stats.lookups(),
            stats.misses,
            stats.resets
        );
    }
}

#[cfg(test)]
mod tests {
    use glyphcache_geometry::{PointPx, SizeOfBox, pixel_point};
    use swash::zeno::Placement;

    use super::*;
    use crate::{atlas::CpuAtlasTexture, rasterizer::RasterizedGlyph};

    const SPACE: GlyphId = 1000;

    /// A font that renders every glyph as a square of `size` logical points.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct TestFont {
        size: u32,
    }

    #[derive(Debug, Default)]
    struct TestRasterizer {
        calls: usize,
        offsets: Vec<OffsetPx>,
    }

    impl TestRasterizer {
        fn shade(glyph: GlyphId) -> u8 {
            (glyph % 200) as u8 + 20
        }
    }

    impl GlyphRasterizer for TestRasterizer {
        type Font = TestFont;

        fn rasterize(&mut self, request: &RasterizationRequest<'_, TestFont>) -> RasterizedGlyph {
            self.calls += 1;
            self.offsets.push(request.offset);
            if request.glyph == SPACE {
                return RasterizedGlyph::empty();
            }

            let dim = (request.font.size as f32 * request.scale_factor).round() as u32;
            let shade = Self::shade(request.glyph);
            let pixels = (dim * dim) as usize;
            RasterizedGlyph::new(
                Placement {
                    left: 1,
                    top: dim as i32,
                    width: dim,
                    height: dim,
                },
                [shade, shade, shade, 255].repeat(pixels),
                [255 - shade, 255 - shade, 255 - shade, 255].repeat(pixels),
            )
        }
    }

    type TestCache = GlyphCache<TestRasterizer, CpuAtlasTexture>;

    fn cache(atlas: (u32, u32), padding: u32, scale_factor: f32) -> TestCache {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = GlyphCacheConfig::default()
            .with_atlas_size(atlas)
            .with_padding(padding);
        let texture = CpuAtlasTexture::new(config.atlas_size);
        GlyphCache::with_texture(texture, TestRasterizer::default(), scale_factor, config).unwrap()
    }

    const FONT: TestFont = TestFont { size: 16 };

    fn lookup(cache: &mut TestCache, glyph: GlyphId) -> CachedGlyph {
        cache
            .cached_glyph(glyph, &FONT, OffsetPx::zero())
            .unwrap()
    }

    /// The pixel boxes of the black and the white render.
    fn pixel_boxes(glyph: &CachedGlyph, atlas: SizePx) -> [BoxPx; 2] {
        let size = pixel_point(glyph.tex_size, atlas);
        let size = SizePx::new(size.x as u32, size.y as u32);
        [
            box_px(pixel_point(glyph.tex_coords_black, atlas), size),
            box_px(pixel_point(glyph.tex_coords_white, atlas), size),
        ]
    }

    #[test]
    fn repeated_lookups_are_identical_hits() {
        let mut cache = cache((256, 256), 1, 1.0);
        let first = cache
            .cached_glyph(10, &FONT, OffsetPx::new(0.3, 0.0))
            .unwrap();
        let second = cache
            .cached_glyph(10, &FONT, OffsetPx::new(0.3, 0.0))
            .unwrap();

        assert_eq!(bytemuck::bytes_of(&first), bytemuck::bytes_of(&second));
        assert_eq!(cache.rasterizer().calls, 1);
        assert_eq!(
            cache.stats(),
            GlyphCacheStats {
                hits: 1,
                misses: 1,
                resets: 0
            }
        );
    }

    #[test]
    fn subpixel_bins_discriminate_keys() {
        let mut cache = cache((256, 256), 1, 1.0);
        let left = cache
            .cached_glyph(10, &FONT, OffsetPx::new(0.0, 0.0))
            .unwrap();
        let middle = cache
            .cached_glyph(10, &FONT, OffsetPx::new(0.5, 0.0))
            .unwrap();
        // Same bin as 0.5 with the default 4 bins.
        let same = cache
            .cached_glyph(10, &FONT, OffsetPx::new(0.6, 0.1))
            .unwrap();

        assert_ne!(left.tex_coords_black, middle.tex_coords_black);
        assert_eq!(middle, same);
        assert_eq!(cache.rasterizer().calls, 2);
        // The rasterizer sees quantized offsets.
        assert_eq!(
            cache.rasterizer().offsets,
            vec![OffsetPx::new(0.0, 0.0), OffsetPx::new(0.5, 0.0)]
        );
    }

    #[test]
    fn fonts_and_glyphs_discriminate_keys() {
        let mut cache = cache((256, 256), 1, 1.0);
        let a = lookup(&mut cache, 10);
        let b = lookup(&mut cache, 11);
        let c = cache
            .cached_glyph(10, &TestFont { size: 12 }, OffsetPx::zero())
            .unwrap();

        assert_eq!(cache.len(), 3);
        assert_ne!(a.tex_coords_black, b.tex_coords_black);
        assert_ne!(a.tex_coords_black, c.tex_coords_black);
        assert_ne!(a.size, c.size);
    }

    #[test]
    fn renders_are_in_bounds_and_do_not_overlap() {
        let mut cache = cache((512, 512), 1, 1.0);
        let atlas = cache.atlas_size();
        let bounds = BoxPx::new(PointPx::zero(), PointPx::new(512, 512));

        let mut boxes = Vec::new();
        for size in 5..25 {
            for glyph in [40, 41] {
                let font = TestFont { size };
                let cached = cache
                    .cached_glyph(glyph, &font, OffsetPx::zero())
                    .unwrap();
                let [black, white] = pixel_boxes(&cached, atlas);
                assert_eq!(black.size_px(), SizePx::new(size, size));
                boxes.extend([black, white]);
            }
        }
        assert_eq!(cache.generation(), 0);

        for (i, a) in boxes.iter().enumerate() {
            assert!(bounds.contains_box(a));
            for b in &boxes[i + 1..] {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn both_renders_and_their_padding_are_uploaded() {
        let mut cache = cache((128, 128), 1, 1.0);
        let glyph = 42;
        let cached = lookup(&mut cache, glyph);
        let [black, white] = pixel_boxes(&cached, cache.atlas_size());
        let shade = TestRasterizer::shade(glyph);

        let texture = cache.texture();
        assert_eq!(texture.pixel(black.min), [shade, shade, shade, 255]);
        assert_eq!(
            texture.pixel(white.max - vec2(1, 1)),
            [255 - shade, 255 - shade, 255 - shade, 255]
        );
        // Padding around the black render is black, around the white render white.
        assert_eq!(texture.pixel(black.min - vec2(1, 0)), OPAQUE_BLACK);
        assert_eq!(texture.pixel(PointPx::new(white.max.x, white.min.y)), OPAQUE_WHITE);
    }

    #[test]
    fn metrics_are_in_logical_points() {
        let mut cache = cache((256, 256), 1, 2.0);
        let cached = lookup(&mut cache, 10);
        // 32 physical pixels at scale factor 2.
        assert_eq!(cached.size, [16.0, 16.0]);
        assert_eq!(cached.inset, [0.5, -16.0]);
    }

    #[test]
    fn scale_factor_scales_pixel_dimensions() {
        let mut low = cache((256, 256), 1, 1.0);
        let mut high = cache((256, 256), 1, 2.0);
        let atlas = SizePx::new(256, 256);

        let low_glyph = lookup(&mut low, 10);
        let high_glyph = lookup(&mut high, 10);

        let [low_box, _] = pixel_boxes(&low_glyph, atlas);
        let [high_box, _] = pixel_boxes(&high_glyph, atlas);
        assert_eq!(low_box.size_px() * 2, high_box.size_px());
        assert_eq!(low_glyph.size, high_glyph.size);
    }

    #[test]
    fn empty_glyphs_take_no_atlas_space() {
        let mut cache = cache((64, 64), 1, 1.0);
        assert_eq!(lookup(&mut cache, SPACE), CachedGlyph::EMPTY);
        assert_eq!(lookup(&mut cache, SPACE), CachedGlyph::EMPTY);
        assert_eq!(cache.rasterizer().calls, 1);
        assert_eq!(cache.atlas_utilization(), 0.0);
    }

    #[test]
    fn sixty_fifth_glyph_evicts_everything_once() {
        // 16x16 renders without padding take 32x16 slots, 64 of them fit.
        let mut cache = cache((256, 128), 0, 1.0);
        for glyph in 1..=64 {
            lookup(&mut cache, glyph);
        }
        assert_eq!(cache.generation(), 0);
        assert_eq!(cache.len(), 64);

        lookup(&mut cache, 65);
        assert_eq!(cache.generation(), 1);
        assert_eq!(cache.stats().resets, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.rasterizer().calls, 65);

        // Evicted.
        lookup(&mut cache, 1);
        assert_eq!(cache.rasterizer().calls, 66);
        // Most recent.
        lookup(&mut cache, 65);
        assert_eq!(cache.rasterizer().calls, 66);
        assert_eq!(cache.generation(), 1);
    }

    #[test]
    fn every_key_is_gone_after_a_reset() {
        let mut cache = cache((256, 128), 0, 1.0);
        for glyph in 1..=65 {
            lookup(&mut cache, glyph);
        }
        assert_eq!(cache.generation(), 1);

        let calls = cache.rasterizer().calls;
        for glyph in 2..=64 {
            lookup(&mut cache, glyph);
        }
        assert_eq!(cache.rasterizer().calls, calls + 63);
        assert_eq!(cache.generation(), 1);
    }

    #[test]
    fn oversized_glyph_fails_without_evicting() {
        let mut cache = cache((64, 64), 1, 1.0);
        lookup(&mut cache, 10);

        let huge = TestFont { size: 40 };
        assert!(cache.cached_glyph(10, &huge, OffsetPx::zero()).is_err());
        assert_eq!(cache.generation(), 0);

        lookup(&mut cache, 10);
        assert_eq!(cache.rasterizer().calls, 2);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn clear_starts_a_new_generation() {
        let mut cache = cache((64, 64), 1, 1.0);
        lookup(&mut cache, 10);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.generation(), 1);
        // Only overflows count as resets.
        assert_eq!(cache.stats().resets, 0);
        assert_eq!(cache.atlas_utilization(), 0.0);

        lookup(&mut cache, 10);
        assert_eq!(cache.rasterizer().calls, 2);
    }

    #[test]
    fn invalid_construction_is_rejected() {
        let texture = || CpuAtlasTexture::new(SizePx::new(64, 64));
        let config = GlyphCacheConfig::default();

        for scale_factor in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let cache = GlyphCache::with_texture(
                texture(),
                TestRasterizer::default(),
                scale_factor,
                config.clone(),
            );
            assert!(cache.is_err());
        }

        let cache = GlyphCache::with_texture(
            texture(),
            TestRasterizer::default(),
            1.0,
            config.clone().with_subpixel_bins(0, 4),
        );
        assert!(cache.is_err());

        let cache = GlyphCache::with_texture(
            CpuAtlasTexture::new(SizePx::new(0, 64)),
            TestRasterizer::default(),
            1.0,
            config.clone(),
        );
        assert!(cache.is_err());

        let cache = GlyphCache::with_texture(
            texture(),
            TestRasterizer::default(),
            1.0,
            config.with_padding(u32::MAX),
        );
        assert!(cache.is_err());
    }

    /// Reports a fixed size without allocating the pixels.
    #[derive(Debug)]
    struct HugeTexture;

    impl AtlasTexture for HugeTexture {
        fn size(&self) -> SizePx {
            SizePx::new(70_000, 16)
        }

        fn write(&mut self, _region: BoxPx, _rgba: &[u8]) {}
    }

    #[test]
    fn atlas_beyond_the_allocator_range_is_rejected() {
        let cache = GlyphCache::with_texture(
            HugeTexture,
            TestRasterizer::default(),
            1.0,
            GlyphCacheConfig::default(),
        );
        assert!(cache.is_err());
    }

    #[test]
    fn slot_size_overflow_is_detected() {
        assert_eq!(
            slot_size(SizePx::new(16, 8), 1),
            Some((SizePx::new(18, 10), SizePx::new(36, 10)))
        );
        assert_eq!(slot_size(SizePx::new(u32::MAX - 1, 8), 1), None);
        assert_eq!(slot_size(SizePx::new(u32::MAX / 2, 8), 1), None);
    }
}
