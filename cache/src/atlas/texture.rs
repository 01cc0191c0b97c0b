use glyphcache_geometry::{BoxPx, PointPx, SizeOfBox, SizePx};

/// Atlas textures store RGBA with 8 bits per channel.
pub const BYTES_PER_PIXEL: usize = 4;

/// The texture an [`Atlas`](super::Atlas) writes glyph images into.
pub trait AtlasTexture {
    fn size(&self) -> SizePx;

    /// Writes tightly packed RGBA rows into `region`. `rgba` is exactly as large as the region.
    fn write(&mut self, region: BoxPx, rgba: &[u8]);
}

/// An atlas texture in main memory.
///
/// Used for headless rendering and to inspect what an atlas contains.
#[derive(Debug, Clone)]
pub struct CpuAtlasTexture {
    size: SizePx,
    pixels: Vec<u8>,
}

impl CpuAtlasTexture {
    pub fn new(size: SizePx) -> Self {
        Self {
            size,
            pixels: vec![0; size.area() as usize * BYTES_PER_PIXEL],
        }
    }

    /// All pixels, row by row.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, pos: PointPx) -> [u8; 4] {
        let i = self.offset_of(pos);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    fn offset_of(&self, pos: PointPx) -> usize {
        debug_assert!(pos.x >= 0 && pos.y >= 0);
        (pos.y as usize * self.size.width as usize + pos.x as usize) * BYTES_PER_PIXEL
    }
}

impl AtlasTexture for CpuAtlasTexture {
    fn size(&self) -> SizePx {
        self.size
    }

    fn write(&mut self, region: BoxPx, rgba: &[u8]) {
        let row_len = region.size_px().width as usize * BYTES_PER_PIXEL;
        if row_len == 0 {
            return;
        }
        for (row, src) in rgba.chunks_exact(row_len).enumerate() {
            let dst = self.offset_of(PointPx::new(region.min.x, region.min.y + row as i32));
            self.pixels[dst..dst + row_len].copy_from_slice(src);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_rows_at_the_region_stride() {
        let mut texture = CpuAtlasTexture::new(SizePx::new(4, 4));
        let region = BoxPx::new(PointPx::new(1, 2), PointPx::new(3, 4));
        let data: Vec<u8> = (0..16).collect();
        texture.write(region, &data);

        assert_eq!(texture.pixel(PointPx::new(1, 2)), [0, 1, 2, 3]);
        assert_eq!(texture.pixel(PointPx::new(2, 2)), [4, 5, 6, 7]);
        assert_eq!(texture.pixel(PointPx::new(1, 3)), [8, 9, 10, 11]);
        assert_eq!(texture.pixel(PointPx::new(2, 3)), [12, 13, 14, 15]);
        assert_eq!(texture.pixel(PointPx::new(0, 2)), [0, 0, 0, 0]);
        assert_eq!(texture.pixel(PointPx::new(3, 3)), [0, 0, 0, 0]);
    }
}
