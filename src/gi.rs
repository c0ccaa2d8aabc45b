//! Radiance cascade bake.
//!
//! Each cascade is a cubic grid of voxels centred on the scene, with spacing
//! doubling per level. For every voxel the bake sphere-traces towards each
//! light through the scene SDF, accumulates unoccluded light with a distance
//! falloff, and adds a damped bounce term sampled from the next coarser
//! cascade. Cascades are therefore built coarsest first; the coarsest level
//! gets no bounce.

use cgmath::{InnerSpace, Vector3};

use crate::{
    data_structures::{
        cascade::{CascadeVoxel, RadianceCascade},
        format::{Bounds, SceneLight},
        sdf::SdfGrid,
    },
    error::{SceneError, SceneResult},
};

/// Largest voxels-per-axis a cascade may have: 256³ voxels of 16 bytes, or a
/// 256 x 65536 texel texture.
pub const MAX_CASCADE_RESOLUTION: u32 = 256;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GiConfig {
    pub cascade_count: u32,
    /// Voxels per cascade axis.
    pub resolution: u32,
    pub max_steps: u32,
    pub min_step: f32,
    pub hit_epsilon: f32,
    pub bounce_damping: f32,
    pub ambient_floor: f32,
    /// Light falloff is `1 / (1 + attenuation * d²)`.
    pub attenuation: f32,
}

impl Default for GiConfig {
    fn default() -> Self {
        Self {
            cascade_count: 3,
            resolution: 32,
            max_steps: 32,
            min_step: 0.05,
            hit_epsilon: 0.02,
            bounce_damping: 0.6,
            ambient_floor: 0.03,
            attenuation: 1.0,
        }
    }
}

impl GiConfig {
    fn validate(&self) -> SceneResult<()> {
        if self.cascade_count == 0 {
            return Err(SceneError::InvalidConfig("gi needs at least one cascade".into()));
        }
        if self.resolution < 2 {
            return Err(SceneError::InvalidConfig(format!(
                "gi resolution must be at least 2, got {}",
                self.resolution
            )));
        }
        if self.resolution > MAX_CASCADE_RESOLUTION {
            return Err(SceneError::InvalidConfig(format!(
                "gi resolution {} is above the limit of {MAX_CASCADE_RESOLUTION}",
                self.resolution
            )));
        }
        // spacing doubles per level
        if self.cascade_count > 24 {
            return Err(SceneError::InvalidConfig(format!(
                "{} cascades is more than the spacing can represent",
                self.cascade_count
            )));
        }
        if !(self.min_step > 0.0) {
            return Err(SceneError::InvalidConfig(format!(
                "gi min step must be positive, got {}",
                self.min_step
            )));
        }
        Ok(())
    }
}

/// Outcome of tracing from a voxel towards a light.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Occluded,
}

/// Sphere-trace from `from` to `to` through `sdf`.
///
/// Steps by the sampled distance, but at least `min_step`. A sample closer
/// than `hit_epsilon` to a surface occludes; reaching the target or running
/// out of steps counts as visible.
pub fn trace_visibility(sdf: &SdfGrid<'_>, from: Vector3<f32>, to: Vector3<f32>, config: &GiConfig) -> Visibility {
    let delta = to - from;
    let distance = delta.magnitude();
    if !(distance > 0.0) {
        return Visibility::Visible;
    }
    let dir = delta / distance;
    let mut t = 0.0f32;
    for _ in 0..config.max_steps {
        if t >= distance {
            return Visibility::Visible;
        }
        let d = sdf.sample(from + dir * t);
        if d < config.hit_epsilon {
            return Visibility::Occluded;
        }
        t += d.max(config.min_step);
    }
    Visibility::Visible
}

/// Bake `config.cascade_count` cascades over `bounds`.
///
/// The returned vector is ordered finest first: index 0 has the smallest
/// spacing.
pub fn bake_cascades(
    sdf: &SdfGrid<'_>,
    lights: &[SceneLight],
    bounds: &Bounds,
    config: &GiConfig,
) -> SceneResult<Vec<RadianceCascade>> {
    config.validate()?;
    let extent = bounds.max_extent();
    if !bounds.is_valid() || !(extent > 0.0) {
        return Err(SceneError::InvalidConfig(format!(
            "gi bake needs non-degenerate bounds, got {:?}..{:?}",
            bounds.min, bounds.max
        )));
    }

    let dim = config.resolution;
    let base_spacing = extent / (dim - 1) as f32;
    let center = bounds.center();
    log::debug!(
        "Baking {} cascades of {dim}³ voxels, base spacing {base_spacing}, {} lights",
        config.cascade_count,
        lights.len()
    );

    let count = config.cascade_count as usize;
    let mut cascades: Vec<Option<RadianceCascade>> = vec![None; count];
    for level in (0..count).rev() {
        let spacing = base_spacing * (1u32 << level) as f32;
        let mut cascade = RadianceCascade::centered(dim, spacing, center);
        let coarser = cascades.get(level + 1).and_then(Option::as_ref);
        bake_level(&mut cascade, coarser, sdf, lights, config);
        log::debug!("Baked cascade {level} with spacing {spacing}");
        cascades[level] = Some(cascade);
    }
    Ok(cascades.into_iter().flatten().collect())
}

fn bake_level(
    cascade: &mut RadianceCascade,
    coarser: Option<&RadianceCascade>,
    sdf: &SdfGrid<'_>,
    lights: &[SceneLight],
    config: &GiConfig,
) {
    let dim = cascade.dim;
    for z in 0..dim {
        for y in 0..dim {
            for x in 0..dim {
                let pos = cascade.voxel_position(x, y, z);
                let mut radiance = Vector3::new(config.ambient_floor, config.ambient_floor, config.ambient_floor);
                let mut occluded = 0usize;

                for light in lights {
                    let light_pos = Vector3::from(light.position);
                    match trace_visibility(sdf, pos, light_pos, config) {
                        Visibility::Visible => {
                            let d2 = (light_pos - pos).magnitude2();
                            let falloff = 1.0 / (1.0 + config.attenuation * d2);
                            radiance += Vector3::from(light.color) * falloff;
                        }
                        Visibility::Occluded => occluded += 1,
                    }
                }

                if let Some(coarser) = coarser {
                    radiance += coarser.sample_irradiance(pos) * config.bounce_damping;
                }

                let visibility = if lights.is_empty() {
                    1.0
                } else {
                    1.0 - occluded as f32 / lights.len() as f32
                };
                let i = cascade.index(x, y, z);
                cascade.voxels[i] = CascadeVoxel {
                    r: radiance.x,
                    g: radiance.y,
                    b: radiance.z,
                    visibility,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::format::SdfDesc;

    fn open_grid() -> SdfGrid<'static> {
        let desc = SdfDesc {
            dim: [2, 2, 2],
            voxel_size: 10.0,
            origin: [0.0; 3],
            max_distance: 5.0,
        };
        SdfGrid::new(desc, vec![5.0; 8]).unwrap()
    }

    #[test]
    fn trace_reaches_light_in_open_space() {
        let v = trace_visibility(
            &open_grid(),
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(8.0, 1.0, 1.0),
            &GiConfig::default(),
        );
        assert_eq!(v, Visibility::Visible);
    }

    #[test]
    fn trace_hits_surface() {
        let desc = SdfDesc {
            dim: [2, 2, 2],
            voxel_size: 10.0,
            origin: [0.0; 3],
            max_distance: 5.0,
        };
        let grid = SdfGrid::new(desc, vec![0.0; 8]).unwrap();
        let v = trace_visibility(&grid, Vector3::new(1.0, 1.0, 1.0), Vector3::new(8.0, 1.0, 1.0), &GiConfig::default());
        assert_eq!(v, Visibility::Occluded);
    }

    #[test]
    fn rejects_degenerate_input() {
        let flat = Bounds {
            min: [1.0; 3],
            max: [1.0; 3],
        };
        assert!(bake_cascades(&open_grid(), &[], &flat, &GiConfig::default()).is_err());

        let bounds = Bounds {
            min: [0.0; 3],
            max: [1.0; 3],
        };
        let config = GiConfig {
            resolution: 1,
            ..Default::default()
        };
        assert!(bake_cascades(&open_grid(), &[], &bounds, &config).is_err());
        let config = GiConfig {
            cascade_count: 0,
            ..Default::default()
        };
        assert!(bake_cascades(&open_grid(), &[], &bounds, &config).is_err());
    }
}
