//! The runtime side of a loaded scene.
//!
//! An [`Engine`] owns every GPU resource created for a scene: the vertex and
//! index buffers, one texture per material slot and one texture per radiance
//! cascade. All of them are created and released through its [`GpuBackend`],
//! and all of them are released when the engine is dropped.

use std::path::PathBuf;

use crate::{
    data_structures::{cascade::RadianceCascade, texture::TexelFormat},
    error::{SceneError, SceneResult},
    gi::{self, GiConfig},
    gpu::{BufferKind, GpuBackend, TextureUpload, WgpuBackend},
    loader::Scene,
    resources,
};

pub const TEXTURE_SLOTS: usize = 8;

/// Material slot a surface type's texture is bound to.
///
/// Windows and ceiling lights are untextured.
pub fn texture_slot(surface_type_id: u32) -> Option<usize> {
    match surface_type_id {
        0 => Some(0), // floor
        1 => Some(1), // wall
        2 => Some(2), // ceiling
        4 => Some(3), // sphere
        5 => Some(4), // book
        6 => Some(5), // chair
        _ => None,
    }
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Texture paths in a scene are resolved against this directory.
    pub asset_root: PathBuf,
    pub gi: GiConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("."),
            gi: GiConfig::default(),
        }
    }
}

pub struct Engine<B: GpuBackend> {
    backend: B,
    config: EngineConfig,
    vertex_buffer: Option<B::Buffer>,
    index_buffer: Option<B::Buffer>,
    vertex_count: u32,
    index_count: u32,
    textures: [Option<B::Texture>; TEXTURE_SLOTS],
    cascades: Vec<RadianceCascade>,
    cascade_textures: Vec<B::Texture>,
}

impl<B: GpuBackend> Engine<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, EngineConfig::default())
    }

    pub fn with_config(backend: B, config: EngineConfig) -> Self {
        Self {
            backend,
            config,
            vertex_buffer: None,
            index_buffer: None,
            vertex_count: 0,
            index_count: 0,
            textures: std::array::from_fn(|_| None),
            cascades: Vec::new(),
            cascade_textures: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn vertex_buffer(&self) -> Option<&B::Buffer> {
        self.vertex_buffer.as_ref()
    }

    pub fn index_buffer(&self) -> Option<&B::Buffer> {
        self.index_buffer.as_ref()
    }

    pub fn has_geometry(&self) -> bool {
        self.vertex_buffer.is_some() && self.index_buffer.is_some()
    }

    /// True once a GI bake has completed and all cascades are on the GPU.
    pub fn has_gi(&self) -> bool {
        !self.cascade_textures.is_empty()
    }

    /// CPU copies of the baked cascades, finest first.
    pub fn cascades(&self) -> &[RadianceCascade] {
        &self.cascades
    }

    pub fn cascade_textures(&self) -> &[B::Texture] {
        &self.cascade_textures
    }

    pub fn texture(&self, slot: usize) -> Option<&B::Texture> {
        self.textures.get(slot)?.as_ref()
    }

    /// Upload the scene geometry, replacing any previous one, and bake GI
    /// when the scene carries a distance field.
    ///
    /// A failed GI bake is logged and leaves the engine without GI; the
    /// geometry stays usable.
    pub fn upload_scene(&mut self, scene: &Scene) -> SceneResult<()> {
        let vertices = scene.vertices();
        let indices = scene.indices();
        if vertices.is_empty() || indices.is_empty() {
            return Err(SceneError::InvalidConfig(format!(
                "scene has {} vertices and {} indices, nothing to upload",
                vertices.len(),
                indices.len()
            )));
        }

        self.release_geometry();
        let vertex_buffer =
            self.backend
                .upload_buffer("Scene Vertex Buffer", BufferKind::Vertex, bytemuck::cast_slice(&vertices))?;
        let index_buffer =
            match self
                .backend
                .upload_buffer("Scene Index Buffer", BufferKind::Index, bytemuck::cast_slice(&indices))
            {
                Ok(buffer) => buffer,
                Err(e) => {
                    log::error!("Failed to upload index buffer: {e}");
                    self.backend.release_buffer(vertex_buffer);
                    return Err(e);
                }
            };
        self.vertex_buffer = Some(vertex_buffer);
        self.index_buffer = Some(index_buffer);
        self.vertex_count = vertices.len() as u32;
        self.index_count = indices.len() as u32;
        log::info!(
            "Uploaded scene geometry: {} vertices, {} indices",
            self.vertex_count,
            self.index_count
        );

        if scene.has_sdf() {
            if let Err(e) = self.bake_gi(scene) {
                log::warn!("GI bake failed, rendering without GI: {e}");
            }
        } else {
            log::info!("Scene has no SDF, skipping GI");
            self.release_gi();
        }
        Ok(())
    }

    /// Bake radiance cascades from the scene's SDF and lights and upload one
    /// texture per cascade. Previous cascades are released first.
    pub fn bake_gi(&mut self, scene: &Scene) -> SceneResult<()> {
        self.release_gi();
        let sdf = scene
            .sdf()
            .ok_or_else(|| SceneError::InvalidConfig("scene has no SDF to bake GI from".into()))?;
        let lights = scene.lights();
        let cascades = gi::bake_cascades(&sdf, &lights, &scene.bounds(), &self.config.gi)?;

        let mut textures = Vec::with_capacity(cascades.len());
        for (level, cascade) in cascades.iter().enumerate() {
            let (width, height) = cascade.texture_extent();
            let label = format!("Radiance Cascade {level}");
            let upload = TextureUpload {
                label: &label,
                width,
                height,
                format: TexelFormat::Rgba32Float,
                data: cascade.texel_bytes(),
            };
            match self.backend.upload_texture(&upload) {
                Ok(texture) => textures.push(texture),
                Err(e) => {
                    log::error!("Failed to upload cascade {level}: {e}");
                    for texture in textures {
                        self.backend.release_texture(texture);
                    }
                    return Err(e);
                }
            }
        }

        log::info!(
            "Baked {} radiance cascades from {} lights",
            cascades.len(),
            lights.len()
        );
        self.cascades = cascades;
        self.cascade_textures = textures;
        Ok(())
    }

    /// Load, decode and upload the scene's surface textures.
    ///
    /// Problems with individual textures are logged and skipped. Returns the
    /// number of textures uploaded. When two entries target the same slot the
    /// later one replaces the earlier.
    pub fn load_textures(&mut self, scene: &Scene) -> usize {
        if scene.textures().len() == 0 {
            log::info!("Scene references no textures");
            return 0;
        }

        let mut loaded = 0;
        for entry in scene.textures() {
            let Some(slot) = texture_slot(entry.surface_type_id) else {
                log::warn!("No texture slot for surface type {}, skipping {:?}", entry.surface_type_id, entry.path);
                continue;
            };
            if entry.path.is_empty() {
                log::warn!("Surface type {} has an empty texture path", entry.surface_type_id);
                continue;
            }
            let image = match resources::texture::load_rgba(&self.config.asset_root, entry.path) {
                Ok(image) => image,
                Err(e) => {
                    log::warn!("Skipping texture {}: {e:#}", entry.path);
                    continue;
                }
            };

            let (width, height) = image.dimensions();
            let label = format!("Scene Texture {}", entry.path);
            let upload = TextureUpload {
                label: &label,
                width,
                height,
                format: TexelFormat::Rgba8Srgb,
                data: image.as_raw(),
            };
            match self.backend.upload_texture(&upload) {
                Ok(texture) => {
                    if let Some(previous) = self.textures[slot].replace(texture) {
                        log::warn!(
                            "Surface type {} has more than one texture, using {}",
                            entry.surface_type_id,
                            entry.path
                        );
                        self.backend.release_texture(previous);
                    }
                    loaded += 1;
                }
                Err(e) => log::warn!("Failed to upload texture {}: {e}", entry.path),
            }
        }
        log::info!("Loaded {loaded} scene textures");
        loaded
    }

    fn release_geometry(&mut self) {
        if let Some(buffer) = self.vertex_buffer.take() {
            self.backend.release_buffer(buffer);
        }
        if let Some(buffer) = self.index_buffer.take() {
            self.backend.release_buffer(buffer);
        }
        self.vertex_count = 0;
        self.index_count = 0;
    }

    fn release_gi(&mut self) {
        for texture in self.cascade_textures.drain(..) {
            self.backend.release_texture(texture);
        }
        self.cascades.clear();
    }

    fn release_textures(&mut self) {
        for slot in &mut self.textures {
            if let Some(texture) = slot.take() {
                self.backend.release_texture(texture);
            }
        }
    }
}

impl Engine<WgpuBackend> {
    /// Record the scene's indexed draw into `pass`. Pipeline and bind groups
    /// are the caller's.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) -> SceneResult<()> {
        let (Some(vertices), Some(indices)) = (&self.vertex_buffer, &self.index_buffer) else {
            return Err(SceneError::InvalidConfig("no scene uploaded to draw".into()));
        };
        pass.set_vertex_buffer(0, vertices.slice(..));
        pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
        Ok(())
    }
}

impl<B: GpuBackend> Drop for Engine<B> {
    fn drop(&mut self) {
        self.release_gi();
        self.release_textures();
        self.release_geometry();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_skip_untextured_surfaces() {
        let slots: Vec<_> = (0..8).map(texture_slot).collect();
        assert_eq!(
            slots,
            vec![Some(0), Some(1), Some(2), None, Some(3), Some(4), Some(5), None]
        );
    }
}
