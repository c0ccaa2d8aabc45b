//! GPU hand-off.
//!
//! The engine never talks to wgpu directly; it goes through [`GpuBackend`],
//! which creates and releases the resources it owns. [`WgpuBackend`] is the
//! real implementation: every upload is staged in a `COPY_SRC` buffer, copied
//! into its destination by a command encoder and submitted on the queue.

use std::iter;

use futures::executor::block_on;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::texture::{TexelFormat, Texture},
    error::{SceneError, SceneResult},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
}

impl BufferKind {
    fn usage(self) -> wgpu::BufferUsages {
        match self {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        }
    }
}

/// Tightly packed 2D texel data to upload.
#[derive(Copy, Clone, Debug)]
pub struct TextureUpload<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub format: TexelFormat,
    pub data: &'a [u8],
}

impl TextureUpload<'_> {
    pub fn row_bytes(&self) -> u64 {
        u64::from(self.width) * u64::from(self.format.bytes_per_texel())
    }

    /// Checks that `data` matches the declared extent.
    pub fn validate(&self) -> SceneResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SceneError::Resource(format!(
                "texture '{}' has zero size {}x{}",
                self.label, self.width, self.height
            )));
        }
        let expected = self.row_bytes() * u64::from(self.height);
        if self.data.len() as u64 != expected {
            return Err(SceneError::Resource(format!(
                "texture '{}' is {}x{} but carries {} bytes instead of {expected}",
                self.label,
                self.width,
                self.height,
                self.data.len()
            )));
        }
        Ok(())
    }
}

/// Creates and releases GPU resources on behalf of the engine.
///
/// Uploads either succeed completely or return an error without leaving a
/// resource behind. Released handles must not be used again.
pub trait GpuBackend {
    type Buffer;
    type Texture;

    fn upload_buffer(&mut self, label: &str, kind: BufferKind, contents: &[u8]) -> SceneResult<Self::Buffer>;
    fn upload_texture(&mut self, upload: &TextureUpload<'_>) -> SceneResult<Self::Texture>;
    fn release_buffer(&mut self, buffer: Self::Buffer);
    fn release_texture(&mut self, texture: Self::Texture);
}

pub struct WgpuBackend {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    /// Runs `create` inside out-of-memory and validation error scopes.
    ///
    /// wgpu reports allocation and validation failures through the device
    /// rather than the call that caused them. A captured error destroys
    /// whatever `create` returned and becomes a [`SceneError::Resource`].
    fn capture<T>(
        &self,
        label: &str,
        create: impl FnOnce(&wgpu::Device, &wgpu::Queue) -> T,
        destroy: impl FnOnce(T),
    ) -> SceneResult<T> {
        let out_of_memory = self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let validation = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let resource = create(&self.device, &self.queue);
        // scopes pop innermost first
        let validation_error = block_on(validation.pop());
        let out_of_memory_error = block_on(out_of_memory.pop());

        match out_of_memory_error.or(validation_error) {
            None => Ok(resource),
            Some(error) => {
                destroy(resource);
                log::warn!("GPU rejected '{label}': {error}");
                Err(SceneError::Resource(format!("gpu rejected '{label}': {error}")))
            }
        }
    }
}

impl GpuBackend for WgpuBackend {
    type Buffer = wgpu::Buffer;
    type Texture = Texture;

    fn upload_buffer(&mut self, label: &str, kind: BufferKind, contents: &[u8]) -> SceneResult<wgpu::Buffer> {
        if contents.is_empty() {
            return Err(SceneError::Resource(format!("buffer '{label}' is empty")));
        }
        let size = wgpu::util::align_to(contents.len() as u64, wgpu::COPY_BUFFER_ALIGNMENT);
        let max = self.device.limits().max_buffer_size;
        if size > max {
            return Err(SceneError::Resource(format!(
                "buffer '{label}' needs {size} bytes, device allows {max}"
            )));
        }

        let mut staged = contents.to_vec();
        staged.resize(size as usize, 0);
        let buffer = self.capture(
            label,
            |device, queue| {
                let staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Scene Staging Buffer"),
                    contents: &staged,
                    usage: wgpu::BufferUsages::COPY_SRC,
                });
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(label),
                    size,
                    usage: kind.usage() | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });

                let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Scene Upload Encoder"),
                });
                encoder.copy_buffer_to_buffer(&staging, 0, &buffer, 0, size);
                queue.submit(iter::once(encoder.finish()));
                buffer
            },
            |buffer| buffer.destroy(),
        )?;
        log::debug!("Uploaded {label} ({size} bytes)");
        Ok(buffer)
    }

    fn upload_texture(&mut self, upload: &TextureUpload<'_>) -> SceneResult<Texture> {
        upload.validate()?;
        let max = self.device.limits().max_texture_dimension_2d;
        if upload.width > max || upload.height > max {
            return Err(SceneError::Resource(format!(
                "texture '{}' is {}x{}, device allows {max}x{max}",
                upload.label, upload.width, upload.height
            )));
        }

        // Rows of a buffer-to-texture copy must start on an aligned offset.
        let row = upload.row_bytes();
        let padded_row = wgpu::util::align_to(row, u64::from(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT));
        let staged_len = padded_row * u64::from(upload.height);
        let max_buffer = self.device.limits().max_buffer_size;
        if staged_len > max_buffer {
            return Err(SceneError::Resource(format!(
                "texture '{}' needs a {staged_len} byte staging buffer, device allows {max_buffer}",
                upload.label
            )));
        }
        let padded_row = u32::try_from(padded_row)
            .map_err(|_| SceneError::Resource(format!("texture '{}' rows are too wide", upload.label)))?;

        let mut staged = vec![0u8; staged_len as usize];
        for (dst, src) in staged
            .chunks_exact_mut(padded_row as usize)
            .zip(upload.data.chunks_exact(row as usize))
        {
            dst[..src.len()].copy_from_slice(src);
        }
        let texture = self.capture(
            upload.label,
            |device, queue| {
                let staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Texture Staging Buffer"),
                    contents: &staged,
                    usage: wgpu::BufferUsages::COPY_SRC,
                });

                let texture = Texture::create_sampled(device, upload.label, upload.width, upload.height, upload.format);
                let mut encoder = device
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some("Texture Upload Encoder"),
                    });
                encoder.copy_buffer_to_texture(
                    wgpu::TexelCopyBufferInfo {
                        buffer: &staging,
                        layout: wgpu::TexelCopyBufferLayout {
                            offset: 0,
                            bytes_per_row: Some(padded_row),
                            rows_per_image: Some(upload.height),
                        },
                    },
                    wgpu::TexelCopyTextureInfo {
                        aspect: wgpu::TextureAspect::All,
                        texture: &texture.texture,
                        mip_level: 0,
                        origin: wgpu::Origin3d::ZERO,
                    },
                    wgpu::Extent3d {
                        width: upload.width,
                        height: upload.height,
                        depth_or_array_layers: 1,
                    },
                );
                queue.submit(iter::once(encoder.finish()));
                texture
            },
            |texture| texture.texture.destroy(),
        )?;
        log::debug!("Uploaded texture {} ({}x{})", upload.label, upload.width, upload.height);
        Ok(texture)
    }

    fn release_buffer(&mut self, buffer: wgpu::Buffer) {
        buffer.destroy();
    }

    fn release_texture(&mut self, texture: Texture) {
        texture.texture.destroy();
    }
}
