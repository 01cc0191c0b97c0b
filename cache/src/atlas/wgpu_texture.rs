use glyphcache_geometry::{BoxPx, SizeOfBox, SizePx};
use wgpu::{
    Device, Extent3d, Origin3d, Queue, TexelCopyBufferLayout, TexelCopyTextureInfo, Texture,
    TextureAspect, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor,
};

use super::{AtlasTexture, BYTES_PER_PIXEL};

/// A glyph atlas texture on the GPU.
#[derive(Debug)]
pub struct WgpuAtlasTexture {
    queue: Queue,
    view: TextureView,
}

impl WgpuAtlasTexture {
    pub const FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

    /// Creates the texture. The size is clamped to the device's maximum 2D texture dimension.
    pub fn new(device: &Device, queue: &Queue, size: SizePx) -> Self {
        let max_dim = device.limits().max_texture_dimension_2d;
        let (width, height) = (size.width.min(max_dim), size.height.min(max_dim));
        if (width, height) != (size.width, size.height) {
            log::warn!(
                "Glyph atlas of {}x{} exceeds the device limit, using {width}x{height}",
                size.width,
                size.height
            );
        }

        let texture = device.create_texture(&TextureDescriptor {
            label: Some("Glyph Atlas"),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: Self::FORMAT,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = texture.create_view(&TextureViewDescriptor::default());

        Self {
            queue: queue.clone(),
            view,
        }
    }

    pub fn texture(&self) -> &Texture {
        self.view.texture()
    }

    pub fn view(&self) -> &TextureView {
        &self.view
    }
}

impl AtlasTexture for WgpuAtlasTexture {
    fn size(&self) -> SizePx {
        let texture = self.texture();
        SizePx::new(texture.width(), texture.height())
    }

    fn write(&mut self, region: BoxPx, rgba: &[u8]) {
        let size = region.size_px();
        if size.is_empty() {
            return;
        }

        self.queue.write_texture(
            TexelCopyTextureInfo {
                texture: self.view.texture(),
                mip_level: 0,
                origin: Origin3d {
                    x: region.min.x as u32,
                    y: region.min.y as u32,
                    z: 0,
                },
                aspect: TextureAspect::All,
            },
            rgba,
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width * BYTES_PER_PIXEL as u32),
                rows_per_image: None,
            },
            Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );
    }
}
