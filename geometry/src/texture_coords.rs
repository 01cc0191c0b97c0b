use crate::{PointPx, SizePx};

/// Converts a pixel position inside a texture of `texture_size` to normalized texture
/// coordinates.
pub fn normalized_point(point: PointPx, texture_size: SizePx) -> [f32; 2] {
    [
        point.x as f32 / texture_size.width as f32,
        point.y as f32 / texture_size.height as f32,
    ]
}

/// Converts a size in pixels to a size in normalized texture coordinates.
pub fn normalized_size(size: SizePx, texture_size: SizePx) -> [f32; 2] {
    [
        size.width as f32 / texture_size.width as f32,
        size.height as f32 / texture_size.height as f32,
    ]
}

/// The pixel position a normalized texture coordinate refers to, rounded to the nearest pixel.
pub fn pixel_point(coords: [f32; 2], texture_size: SizePx) -> PointPx {
    PointPx::new(
        (coords[0] * texture_size.width as f32).round() as i32,
        (coords[1] * texture_size.height as f32).round() as i32,
    )
}
