//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU texture resources
//! along with their view and sampler. Scene textures are sRGB colour maps;
//! radiance cascades are stored as unfilterable `Rgba32Float` textures.

/// Texel formats the engine uploads.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TexelFormat {
    /// 8-bit sRGB colour, used for scene surface textures.
    Rgba8Srgb,
    /// 32-bit float RGBA, used for cascade irradiance + visibility.
    Rgba32Float,
}

impl TexelFormat {
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            TexelFormat::Rgba8Srgb => 4,
            TexelFormat::Rgba32Float => 16,
        }
    }

    pub fn wgpu_format(self) -> wgpu::TextureFormat {
        match self {
            TexelFormat::Rgba8Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            TexelFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
        }
    }
}

/// A GPU texture with its view and sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub format: TexelFormat,
}

impl Texture {
    /// Create an empty 2D texture that can be sampled and filled by a copy.
    ///
    /// Colour maps get a repeating linear sampler; float textures can't be
    /// filtered without extra device features, so they get a nearest one.
    pub fn create_sampled(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        format: TexelFormat,
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: format.wgpu_format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = match format {
            TexelFormat::Rgba8Srgb => create_default_sampler(device),
            TexelFormat::Rgba32Float => create_nearest_sampler(device),
        };
        Self {
            texture,
            view,
            sampler,
            format,
        }
    }
}

/// Repeating linear sampler for surface textures. Uploads carry a single
/// mip level, so no mipmap filter is set.
pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("surface sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

pub fn create_nearest_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("cascade sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}
