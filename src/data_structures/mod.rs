//! Scene data structures: the wire format, SDF grids, cascades and textures.
//!
//! - `format` holds the `.scn` header, section descriptors and element types
//! - `sdf` is a read-only view over a baked signed distance field
//! - `cascade` holds the CPU side of a baked radiance cascade
//! - `texture` wraps GPU textures and samplers

pub mod cascade;
pub mod format;
pub mod sdf;
pub mod texture;
