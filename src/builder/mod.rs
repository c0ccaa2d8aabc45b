//! Scene construction.
//!
//! A [`SceneBuilder`] accumulates vertices, indices, lights, texture paths,
//! bounds and an optional SDF volume. [`SceneBuilder::generate`] fills it from
//! a [`SceneConfig`]: the mesh arrays are handed in ready-made (mesh
//! generation and model import live elsewhere), while lights, bounds and the
//! distance field are derived from the tile map.
//!
//! Serializing copies the builder's arrays into a fresh blob, so a builder can
//! be serialized any number of times.

pub mod sdf;
mod serialize;

use std::path::Path;

pub use sdf::{SdfBakeConfig, SdfVolume};
pub use serialize::SceneLayout;

use crate::{
    data_structures::format::{Bounds, SceneLight, SceneVertex, SdfDesc, SurfaceType},
    error::{SceneError, SceneResult},
};

pub const WALL_HEIGHT: f32 = 2.0;
pub const MAX_STATIC_LIGHTS: usize = 16;
pub const CEILING_LIGHT_HEIGHT: f32 = WALL_HEIGHT - 0.1;
pub const CEILING_LIGHT_INTENSITY: f32 = 1.4;

const LIGHT_PALETTE: [[f32; 3]; 7] = [
    [1.00, 0.95, 0.85], // warm white
    [0.85, 0.90, 1.00], // cool white
    [1.00, 0.85, 0.70], // warm amber
    [0.70, 0.85, 1.00], // cool blue
    [1.00, 0.90, 0.80], // soft warm
    [0.90, 0.95, 1.00], // cool tint
    [0.96, 0.90, 1.00], // soft magenta
];

/// One cell of the tile map.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tile {
    Empty,
    Wall,
    WindowNs,
    WindowEw,
    /// Floor cell with a ceiling light above it.
    Light,
    Other(i32),
}

impl Tile {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Tile::Empty,
            1 => Tile::Wall,
            2 => Tile::WindowNs,
            3 => Tile::WindowEw,
            9 => Tile::Light,
            other => Tile::Other(other),
        }
    }

    /// Walls and window frames block light; everything else is open.
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::Wall | Tile::WindowNs | Tile::WindowEw)
    }
}

/// Row-major grid of tile codes; cell `(x, z)` covers `[x, x+1] x [z, z+1]`
/// in world space.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TileMap {
    width: usize,
    height: usize,
    cells: Vec<i32>,
}

impl TileMap {
    pub fn new(width: usize, height: usize, cells: Vec<i32>) -> SceneResult<Self> {
        if width == 0 || height == 0 || width.checked_mul(height) != Some(cells.len()) {
            return Err(SceneError::InvalidConfig(format!(
                "tile map of {width}x{height} needs {} cells, got {}",
                width.saturating_mul(height),
                cells.len()
            )));
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn filled(width: usize, height: usize, code: i32) -> Self {
        Self {
            width,
            height,
            cells: vec![code; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, x: usize, z: usize) -> Option<Tile> {
        if x >= self.width || z >= self.height {
            return None;
        }
        Some(Tile::from_code(self.cells[z * self.width + x]))
    }

    pub fn set(&mut self, x: usize, z: usize, code: i32) {
        if x < self.width && z < self.height {
            self.cells[z * self.width + x] = code;
        }
    }

    /// Cells in row-major order as `(x, z, tile)`.
    pub fn tiles(&self) -> impl Iterator<Item = (usize, usize, Tile)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &code)| (i % self.width, i / self.width, Tile::from_code(code)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TexturePath {
    pub surface: SurfaceType,
    pub path: String,
}

impl TexturePath {
    pub fn new(surface: SurfaceType, path: impl Into<String>) -> Self {
        Self {
            surface,
            path: path.into(),
        }
    }
}

/// Input for [`SceneBuilder::generate`].
#[derive(Clone, Debug, Default)]
pub struct SceneConfig {
    pub map: TileMap,
    pub vertices: Vec<SceneVertex>,
    pub indices: Vec<u16>,
    pub textures: Vec<TexturePath>,
    /// Bake a distance field from the map's solid tiles; `None` skips it.
    pub sdf: Option<SdfBakeConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureEntry {
    pub surface_type_id: u32,
    pub path: String,
}

#[derive(Clone, Debug, Default)]
pub struct SceneBuilder {
    vertices: Vec<SceneVertex>,
    indices: Vec<u16>,
    lights: Vec<SceneLight>,
    textures: Vec<TextureEntry>,
    bounds: Option<Bounds>,
    sdf: Option<SdfVolume>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertices: usize, indices: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            indices: Vec::with_capacity(indices),
            ..Self::default()
        }
    }

    pub fn vertices(&self) -> &[SceneVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn lights(&self) -> &[SceneLight] {
        &self.lights
    }

    pub fn textures(&self) -> &[TextureEntry] {
        &self.textures
    }

    pub fn sdf(&self) -> Option<&SdfVolume> {
        self.sdf.as_ref()
    }

    pub fn add_vertices(&mut self, vertices: &[SceneVertex]) {
        self.vertices.extend_from_slice(vertices);
    }

    pub fn add_indices(&mut self, indices: &[u16]) {
        self.indices.extend_from_slice(indices);
    }

    pub fn add_light(&mut self, position: [f32; 3], color: [f32; 3]) {
        self.lights.push(SceneLight::new(position, color));
    }

    /// Register a texture path for a surface type. Paths are stored
    /// null-terminated, so they can't contain NUL bytes themselves.
    pub fn add_texture(&mut self, surface_type_id: u32, path: &str) -> SceneResult<()> {
        if path.as_bytes().contains(&0) {
            return Err(SceneError::InvalidConfig(format!(
                "texture path {path:?} contains a NUL byte"
            )));
        }
        self.textures.push(TextureEntry {
            surface_type_id,
            path: path.to_string(),
        });
        Ok(())
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = Some(bounds);
    }

    pub fn set_sdf(&mut self, desc: SdfDesc, data: Vec<f32>) -> SceneResult<()> {
        self.sdf = Some(SdfVolume::new(desc, data)?);
        Ok(())
    }

    /// Explicit bounds if set, otherwise the box around all vertices.
    pub fn bounds(&self) -> Bounds {
        if let Some(bounds) = self.bounds {
            return bounds;
        }
        let mut bounds = Bounds::empty();
        for v in &self.vertices {
            bounds.include(v.position);
        }
        if bounds.is_valid() { bounds } else { Bounds::default() }
    }

    /// Replace the builder contents with geometry, lights, textures, bounds
    /// and (optionally) an SDF derived from `config`.
    pub fn generate(&mut self, config: &SceneConfig) -> SceneResult<()> {
        let map = &config.map;
        if map.is_empty() {
            return Err(SceneError::InvalidConfig("scene config has an empty tile map".into()));
        }
        if config.vertices.len() > u16::MAX as usize + 1 {
            return Err(SceneError::InvalidConfig(format!(
                "{} vertices can't be addressed by 16-bit indices",
                config.vertices.len()
            )));
        }
        if let Some(bad) = config
            .indices
            .iter()
            .find(|&&i| i as usize >= config.vertices.len())
        {
            return Err(SceneError::InvalidConfig(format!(
                "index {bad} references one of only {} vertices",
                config.vertices.len()
            )));
        }

        log::info!("Generating scene from {}x{} tile map", map.width(), map.height());

        *self = Self::with_capacity(config.vertices.len(), config.indices.len());
        self.add_vertices(&config.vertices);
        self.add_indices(&config.indices);

        for (x, z, tile) in map.tiles() {
            if tile != Tile::Light {
                continue;
            }
            if self.lights.len() >= MAX_STATIC_LIGHTS {
                log::warn!("Max static lights reached, ignoring cell ({x},{z})");
                continue;
            }
            let palette = LIGHT_PALETTE[self.lights.len() % LIGHT_PALETTE.len()];
            self.add_light(
                [x as f32 + 0.5, CEILING_LIGHT_HEIGHT, z as f32 + 0.5],
                palette.map(|c| c * CEILING_LIGHT_INTENSITY),
            );
        }

        for texture in &config.textures {
            self.add_texture(texture.surface.id(), &texture.path)?;
        }

        let mut bounds = Bounds::empty();
        bounds.include([0.0, 0.0, 0.0]);
        bounds.include([map.width() as f32, WALL_HEIGHT, map.height() as f32]);
        for v in &self.vertices {
            bounds.include(v.position);
        }
        self.bounds = Some(bounds);

        if let Some(sdf_config) = &config.sdf {
            let volume = sdf::bake_tile_sdf(map, &bounds, sdf_config)?;
            log::info!(
                "Baked {}x{}x{} SDF at voxel size {}",
                volume.desc.dim[0],
                volume.desc.dim[1],
                volume.desc.dim[2],
                volume.desc.voxel_size
            );
            self.sdf = Some(volume);
        }

        log::info!(
            "Scene generation complete: {} vertices, {} indices, {} lights, {} textures",
            self.vertices.len(),
            self.indices.len(),
            self.lights.len(),
            self.textures.len()
        );
        Ok(())
    }

    /// Pack the builder into one self-contained blob (measure, then write).
    pub fn serialize(&self) -> SceneResult<Vec<u8>> {
        let layout = SceneLayout::measure(self)?;
        let blob = layout.write(self)?;
        log::info!("Serialized scene: {} bytes", blob.len());
        Ok(blob)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> SceneResult<()> {
        let path = path.as_ref();
        let blob = self.serialize()?;
        std::fs::write(path, &blob).map_err(|e| SceneError::io("failed to write scene", path, e))?;
        log::info!("Saved scene to {} ({} bytes)", path.display(), blob.len());
        Ok(())
    }
}
