//! Textures shared between scene graphs, the alpha tester and the GPU backend.
//!
//! A [`Texture`] keeps its decoded RGBA image on the CPU. The GPU copy is
//! created lazily by the renderer and cached there by [`TextureId`], so the same
//! `Arc<Texture>` can be placed in any number of scene graphs.
//!
//! Some textures are *protected*: their pixels can be uploaded and drawn but
//! not read back. The alpha tester treats those as fully opaque.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::{ImageBuffer, Rgba, RgbaImage};

use crate::render::GpuContext;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a texture, stable for its lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Error raised when a texture's pixels are not readable from the CPU.
#[derive(Debug, thiserror::Error)]
pub enum PixelAccessError {
    #[error("pixels of texture '{0}' are not readable")]
    Protected(String),
}

/// A decoded RGBA texture.
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    label: String,
    image: Arc<RgbaImage>,
    readable: bool,
    /// Whether row 0 of the image is the top of the texture (UV v = 1).
    pub flip_y: bool,
}

impl Texture {
    pub fn from_image(label: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            id: TextureId::next(),
            label: label.into(),
            image: Arc::new(image),
            readable: true,
            flip_y: true,
        }
    }

    /// Image-space v (0 at row 0) for a quad v that runs bottom to top.
    ///
    /// Hit testing and the sprite shader both follow this mapping.
    pub fn image_v(&self, v: f32) -> f32 {
        if self.flip_y { 1.0 - v } else { v }
    }

    /// Create a texture from raw RGBA bytes. Returns `None` if `data` does not
    /// hold exactly `width * height * 4` bytes.
    pub fn from_rgba(label: impl Into<String>, width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let image = ImageBuffer::from_raw(width, height, data)?;
        Some(Self::from_image(label, image))
    }

    /// Load a texture from an image file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, image::ImageError> {
        let path = path.as_ref();
        let image = image::open(path)?.to_rgba8();
        Ok(Self::from_image(path.display().to_string(), image))
    }

    /// Load a texture from embedded bytes.
    pub fn from_bytes(bytes: &[u8], label: &str) -> Result<Self, image::ImageError> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        Ok(Self::from_image(label, image))
    }

    /// Magenta/black checkerboard shown in place of textures that failed to load.
    pub fn placeholder() -> Self {
        const SIZE: u32 = 16;
        let image = ImageBuffer::from_fn(SIZE, SIZE, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgba([255, 0, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        Self::from_image("placeholder", image)
    }

    /// Solid single-color texture.
    pub fn solid(label: impl Into<String>, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::from_image(label, ImageBuffer::from_pixel(width, height, Rgba(rgba)))
    }

    /// Mark the texture's pixels as unreadable for CPU-side queries.
    pub fn protected(mut self) -> Self {
        self.readable = false;
        self
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// CPU pixel data, unless the texture is protected.
    pub fn read_pixels(&self) -> Result<Arc<RgbaImage>, PixelAccessError> {
        if self.readable {
            Ok(Arc::clone(&self.image))
        } else {
            Err(PixelAccessError::Protected(self.label.clone()))
        }
    }

    /// Pixel data for GPU upload. Protected textures can still be drawn.
    pub(crate) fn upload_data(&self) -> &RgbaImage {
        &self.image
    }
}

/// A texture resident on the GPU.
#[derive(Debug)]
pub struct GpuTexture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
}

impl GpuTexture {
    /// Upload a texture's pixels.
    pub fn upload(gpu: &GpuContext, texture: &Texture) -> Self {
        let image = texture.upload_data();
        Self::from_rgba(gpu, image.as_raw(), image.width(), image.height(), texture.label())
    }

    /// Create a texture from raw RGBA data.
    pub fn from_rgba(gpu: &GpuContext, data: &[u8], width: u32, height: u32, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }
}
