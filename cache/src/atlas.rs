//! A fixed size texture atlas that hands out rectangular regions on shelves.
//!
//! Eviction is all or nothing: [`Atlas::reset`] reclaims every region at once and keeps the
//! texture.
use std::fmt;

use etagere::AtlasAllocator;
use euclid::size2;
use glyphcache_geometry::{BoxPx, CastSigned, SizeOfBox, SizePx};
use tracing::instrument;

mod texture;
mod wgpu_texture;

pub use texture::*;
pub use wgpu_texture::*;

pub struct Atlas<T> {
    texture: T,
    allocator: AtlasAllocator,
    /// Sum of the areas of all live regions.
    allocated_area: u64,
    regions: usize,
}

impl<T: fmt::Debug> fmt::Debug for Atlas<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atlas")
            .field("texture", &self.texture)
            .field("allocated_area", &self.allocated_area)
            .field("regions", &self.regions)
            .finish()
    }
}

impl<T: AtlasTexture> Atlas<T> {
    pub fn new(texture: T) -> Self {
        let size = texture.size();
        let allocator = AtlasAllocator::new(size2(size.width as i32, size.height as i32));
        Self {
            texture,
            allocator,
            allocated_area: 0,
            regions: 0,
        }
    }

    pub fn size(&self) -> SizePx {
        self.texture.size()
    }

    pub fn texture(&self) -> &T {
        &self.texture
    }

    /// Returns `true` if a region of `size` would fit into this atlas if it were empty.
    pub fn fits_empty(&self, size: SizePx) -> bool {
        let atlas = self.size();
        size.width <= atlas.width && size.height <= atlas.height
    }

    /// Allocates a region of exactly `size` that does not overlap any other live region.
    ///
    /// Returns `None` if the atlas is full. Empty sizes are never allocated.
    pub fn allocate(&mut self, size: SizePx) -> Option<BoxPx> {
        if size.is_empty() || !self.fits_empty(size) {
            return None;
        }

        let allocation = self
            .allocator
            .allocate(size2(size.width as i32, size.height as i32))?;

        // The allocator may hand out more than requested, the remainder stays unused until the
        // next reset.
        let min = allocation.rectangle.min.cast_unit();
        let region = BoxPx::new(min, min + size.cast_signed());
        debug_assert!(allocation.rectangle.width() >= size.width as i32);
        debug_assert!(allocation.rectangle.height() >= size.height as i32);

        self.allocated_area += size.area() as u64;
        self.regions += 1;
        Some(region)
    }

    /// Writes RGBA pixels into a region previously returned by [`Self::allocate`].
    #[instrument(skip_all)]
    pub fn upload(&mut self, region: BoxPx, rgba: &[u8]) {
        let size = region.size_px();
        assert_eq!(
            rgba.len(),
            size.area() as usize * BYTES_PER_PIXEL,
            "Pixel data does not match the region's size"
        );
        self.texture.write(region, rgba);
    }

    /// Reclaims all regions. The texture is kept and its contents become garbage.
    pub fn reset(&mut self) {
        self.allocator.clear();
        self.allocated_area = 0;
        self.regions = 0;
    }

    pub fn allocated_area(&self) -> u64 {
        self.allocated_area
    }

    /// The number of live regions.
    pub fn regions(&self) -> usize {
        self.regions
    }

    /// Fraction of the atlas covered by live regions.
    pub fn utilization(&self) -> f32 {
        let area = self.size().area();
        if area == 0 {
            return 0.0;
        }
        self.allocated_area as f32 / area as f32
    }
}
