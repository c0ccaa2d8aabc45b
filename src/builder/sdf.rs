//! Distance field bake from the solid tiles of a map.

use cgmath::{InnerSpace, Vector3};

use crate::{
    builder::{TileMap, WALL_HEIGHT},
    data_structures::format::{Bounds, SdfDesc},
    error::{SceneError, SceneResult},
};

/// Voxel counts above this are refused rather than allocated.
const MAX_SDF_VOXELS: u64 = 1 << 26;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SdfBakeConfig {
    pub voxel_size: f32,
    /// Distances are clamped to this, and it is what lookups outside the grid return.
    pub max_distance: f32,
}

impl Default for SdfBakeConfig {
    fn default() -> Self {
        Self {
            voxel_size: 0.25,
            max_distance: 4.0,
        }
    }
}

/// A dense distance grid owned by the builder.
#[derive(Clone, Debug, PartialEq)]
pub struct SdfVolume {
    pub desc: SdfDesc,
    pub data: Vec<f32>,
}

impl SdfVolume {
    pub fn new(desc: SdfDesc, data: Vec<f32>) -> SceneResult<Self> {
        let expected = desc.voxel_count();
        if !desc.is_present() || expected != Some(data.len() as u64) {
            return Err(SceneError::InvalidConfig(format!(
                "sdf grid {:?} needs {} samples, got {}",
                desc.dim,
                expected.map_or_else(|| "too many".to_string(), |n| n.to_string()),
                data.len()
            )));
        }
        if !(desc.voxel_size > 0.0) {
            return Err(SceneError::InvalidConfig(format!(
                "sdf voxel size must be positive, got {}",
                desc.voxel_size
            )));
        }
        Ok(Self { desc, data })
    }
}

struct SolidBox {
    center: Vector3<f32>,
    half: Vector3<f32>,
}

impl SolidBox {
    /// Distance from `p` to the box surface, 0 inside.
    fn distance(&self, p: Vector3<f32>) -> f32 {
        let d = p - self.center;
        let q = Vector3::new(
            (d.x.abs() - self.half.x).max(0.0),
            (d.y.abs() - self.half.y).max(0.0),
            (d.z.abs() - self.half.z).max(0.0),
        );
        q.magnitude()
    }
}

/// Samples along one axis: enough steps to cover `extent`, plus the far edge.
fn axis_samples(extent: f32, voxel_size: f32) -> Option<u32> {
    let steps = (extent / voxel_size).ceil();
    if !steps.is_finite() || steps < 0.0 || steps >= u32::MAX as f32 {
        return None;
    }
    u32::try_from(steps as u64).ok()?.checked_add(1)
}

/// Samples the distance to the nearest solid tile over a grid covering `bounds`.
///
/// Solid tiles are boxes `[x, x+1] x [0, WALL_HEIGHT] x [z, z+1]`. The grid
/// origin is `bounds.min` and each axis gets `ceil(extent / voxel_size) + 1`
/// samples, so the far corner is always covered.
pub fn bake_tile_sdf(map: &TileMap, bounds: &Bounds, config: &SdfBakeConfig) -> SceneResult<SdfVolume> {
    if !(config.voxel_size > 0.0) || !config.voxel_size.is_finite() {
        return Err(SceneError::InvalidConfig(format!(
            "sdf voxel size must be positive, got {}",
            config.voxel_size
        )));
    }
    if !(config.max_distance > 0.0) {
        return Err(SceneError::InvalidConfig(format!(
            "sdf max distance must be positive, got {}",
            config.max_distance
        )));
    }
    if !bounds.is_valid() {
        return Err(SceneError::InvalidConfig("sdf bake needs valid scene bounds".into()));
    }

    let extent = bounds.extent();
    let mut dim = [0u32; 3];
    for (slot, e) in dim.iter_mut().zip([extent.x, extent.y, extent.z]) {
        *slot = axis_samples(e, config.voxel_size).ok_or_else(|| {
            SceneError::InvalidConfig(format!(
                "sdf voxel size {} is too small for an extent of {e}",
                config.voxel_size
            ))
        })?;
    }
    let desc = SdfDesc {
        dim,
        voxel_size: config.voxel_size,
        origin: bounds.min,
        max_distance: config.max_distance,
    };
    let count = desc
        .voxel_count()
        .filter(|&n| n <= MAX_SDF_VOXELS)
        .ok_or_else(|| {
            SceneError::InvalidConfig(format!(
                "sdf grid {dim:?} is too large, raise the voxel size"
            ))
        })?;

    let half = Vector3::new(0.5, WALL_HEIGHT * 0.5, 0.5);
    let solids: Vec<SolidBox> = map
        .tiles()
        .filter(|(_, _, tile)| tile.is_solid())
        .map(|(x, z, _)| SolidBox {
            center: Vector3::new(x as f32 + 0.5, WALL_HEIGHT * 0.5, z as f32 + 0.5),
            half,
        })
        .collect();

    let origin = Vector3::from(bounds.min);
    let mut data = Vec::with_capacity(count as usize);
    for z in 0..dim[2] {
        for y in 0..dim[1] {
            for x in 0..dim[0] {
                let p = origin + Vector3::new(x as f32, y as f32, z as f32) * config.voxel_size;
                let d = solids
                    .iter()
                    .map(|s| s.distance(p))
                    .fold(config.max_distance, f32::min);
                data.push(d.clamp(0.0, config.max_distance));
            }
        }
    }

    SdfVolume::new(desc, data)
}
