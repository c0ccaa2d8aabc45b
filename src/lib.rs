//! scene-ngin
//!
//! A content pipeline for small indoor scenes. Scenes are packed into a single
//! relocatable `.scn` blob, loaded back without copying, and lit with a
//! precomputed multi-resolution global illumination approximation (radiance
//! cascades) before being handed to the GPU.
//!
//! High-level modules
//! - `builder`: scene construction, map-driven generation and serialization
//! - `data_structures`: wire format types, SDF grids, cascades and textures
//! - `engine`: owns GPU geometry, textures and cascades for a loaded scene
//! - `error`: the shared error type
//! - `gi`: radiance cascade bake
//! - `gpu`: backend trait for uploads plus the wgpu implementation
//! - `loader`: validation and typed views over loaded blobs
//! - `resources`: helpers to load texture assets from disk
//!

pub mod builder;
pub mod data_structures;
pub mod engine;
pub mod error;
pub mod gi;
pub mod gpu;
pub mod loader;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use builder::{SceneBuilder, SceneConfig, SdfBakeConfig, TexturePath, TileMap};
pub use data_structures::format::{Bounds, SceneHeader, SceneLight, SceneVertex, SurfaceType};
pub use engine::{Engine, EngineConfig};
pub use error::{ErrorKind, SceneError, SceneResult};
pub use gi::GiConfig;
pub use gpu::{GpuBackend, WgpuBackend};
pub use loader::{Scene, SceneBlob};

pub use cgmath;
pub use wgpu;
