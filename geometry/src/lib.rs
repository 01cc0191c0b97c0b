//! Pixel space geometry of the glyph atlas.

mod texture_coords;

pub use texture_coords::*;

pub struct PixelUnit;
pub type SizePx = euclid::Size2D<u32, PixelUnit>;
pub type VectorPx = euclid::Vector2D<i32, PixelUnit>;
// Box2D::contains needs a Point and not a vector.
pub type PointPx = euclid::Point2D<i32, PixelUnit>;
pub type BoxPx = euclid::Box2D<i32, PixelUnit>;

/// A fractional offset in physical pixels.
pub type OffsetPx = euclid::Vector2D<f32, PixelUnit>;

pub trait CastSigned {
    type SignedType;

    fn cast_signed(&self) -> Self::SignedType;
}

impl<U> CastSigned for euclid::Size2D<u32, U> {
    type SignedType = euclid::Vector2D<i32, U>;

    fn cast_signed(&self) -> Self::SignedType {
        self.cast().to_vector()
    }
}

pub trait SizeOfBox {
    /// The unsigned size of a box. Boxes with negative extents are empty.
    fn size_px(&self) -> SizePx;
}

impl SizeOfBox for BoxPx {
    fn size_px(&self) -> SizePx {
        let size = self.size();
        SizePx::new(size.width.max(0) as u32, size.height.max(0) as u32)
    }
}

/// Creates a box from an origin and a size.
pub fn box_px(origin: PointPx, size: SizePx) -> BoxPx {
    BoxPx::new(origin, origin + size.cast_signed())
}
