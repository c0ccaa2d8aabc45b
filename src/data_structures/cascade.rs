//! CPU side of a baked radiance cascade.

use bytemuck::{Pod, Zeroable};
use cgmath::Vector3;

use crate::data_structures::sdf::{axis_cell_clamped, trilinear};

/// Irradiance and direct-light visibility of one cascade voxel.
///
/// Laid out as one `Rgba32Float` texel.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CascadeVoxel {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub visibility: f32,
}

impl CascadeVoxel {
    pub fn irradiance(&self) -> Vector3<f32> {
        Vector3::new(self.r, self.g, self.b)
    }
}

/// One cubic grid of precomputed lighting.
///
/// Voxel `(x, y, z)` sits at `origin + (x, y, z) * spacing` and is stored at
/// `x + y * dim + z * dim * dim`, which is also its texel in the flattened
/// `dim x dim²` texture.
#[derive(Clone, Debug, PartialEq)]
pub struct RadianceCascade {
    pub dim: u32,
    pub spacing: f32,
    pub origin: [f32; 3],
    pub voxels: Vec<CascadeVoxel>,
}

impl RadianceCascade {
    /// A cascade of `dim³` zeroed voxels centred on `center`.
    pub fn centered(dim: u32, spacing: f32, center: Vector3<f32>) -> Self {
        let half = spacing * dim.saturating_sub(1) as f32 * 0.5;
        let origin = center - Vector3::new(half, half, half);
        let count = dim as usize * dim as usize * dim as usize;
        Self {
            dim,
            spacing,
            origin: origin.into(),
            voxels: vec![CascadeVoxel::default(); count],
        }
    }

    pub fn center(&self) -> Vector3<f32> {
        let half = self.spacing * self.dim.saturating_sub(1) as f32 * 0.5;
        Vector3::from(self.origin) + Vector3::new(half, half, half)
    }

    pub fn index(&self, x: u32, y: u32, z: u32) -> usize {
        let dim = self.dim as usize;
        x as usize + y as usize * dim + z as usize * dim * dim
    }

    pub fn voxel_position(&self, x: u32, y: u32, z: u32) -> Vector3<f32> {
        Vector3::from(self.origin) + Vector3::new(x as f32, y as f32, z as f32) * self.spacing
    }

    /// Grid coordinates of the voxel closest to `world`, if it lies inside the cascade.
    pub fn nearest_voxel(&self, world: Vector3<f32>) -> Option<[u32; 3]> {
        let g = (world - Vector3::from(self.origin)) / self.spacing;
        let max = self.dim.checked_sub(1)? as f32;
        let mut out = [0u32; 3];
        for (slot, v) in out.iter_mut().zip([g.x, g.y, g.z]) {
            let v = v.round();
            if !(0.0..=max).contains(&v) {
                return None;
            }
            *slot = v as u32;
        }
        Some(out)
    }

    pub fn voxel_at(&self, world: Vector3<f32>) -> Option<&CascadeVoxel> {
        let [x, y, z] = self.nearest_voxel(world)?;
        self.voxels.get(self.index(x, y, z))
    }

    /// Trilinearly interpolated irradiance, clamped to the cascade edges.
    pub fn sample_irradiance(&self, world: Vector3<f32>) -> Vector3<f32> {
        if self.voxels.is_empty() || !(self.spacing > 0.0) {
            return Vector3::new(0.0, 0.0, 0.0);
        }
        let g = (world - Vector3::from(self.origin)) / self.spacing;
        let ax = axis_cell_clamped(g.x, self.dim);
        let ay = axis_cell_clamped(g.y, self.dim);
        let az = axis_cell_clamped(g.z, self.dim);
        let channel = |pick: fn(&CascadeVoxel) -> f32| {
            trilinear(ax, ay, az, |x, y, z| {
                pick(&self.voxels[self.index(x as u32, y as u32, z as u32)])
            })
        };
        Vector3::new(channel(|v| v.r), channel(|v| v.g), channel(|v| v.b))
    }

    /// Width and height of the flattened 2D texture.
    pub fn texture_extent(&self) -> (u32, u32) {
        (self.dim, self.dim.saturating_mul(self.dim))
    }

    pub fn texel_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.voxels)
    }
}
