use crate::atlas::BYTES_PER_PIXEL;

/// Surrounds an RGBA image with `pad` pixels of `fill` on each side.
pub fn pad_image_data(
    image: &[u8],
    width: usize,
    height: usize,
    pad: usize,
    fill: [u8; 4],
) -> Vec<u8> {
    debug_assert_eq!(image.len(), width * height * BYTES_PER_PIXEL);
    let padded_width = width + 2 * pad;
    let padded_height = height + 2 * pad;

    let mut padded_image = fill.repeat(padded_width * padded_height);
    if width == 0 {
        return padded_image;
    }

    let row_offset = padded_width * BYTES_PER_PIXEL;
    let row_len = width * BYTES_PER_PIXEL;
    for (line, src) in image.chunks_exact(row_len).enumerate() {
        let dest_offset = (line + pad) * row_offset + pad * BYTES_PER_PIXEL;
        padded_image[dest_offset..dest_offset + row_len].copy_from_slice(src);
    }
    padded_image
}
