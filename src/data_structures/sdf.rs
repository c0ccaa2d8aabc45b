//! Read-only view over a baked signed distance field.

use std::borrow::Cow;

use cgmath::Vector3;

use crate::data_structures::format::SdfDesc;

/// A dense SDF grid, either borrowed straight from a loaded blob or owned.
#[derive(Clone, Debug)]
pub struct SdfGrid<'a> {
    desc: SdfDesc,
    data: Cow<'a, [f32]>,
}

impl<'a> SdfGrid<'a> {
    /// `data` must hold exactly `desc.voxel_count()` samples; returns `None` otherwise.
    pub fn new(desc: SdfDesc, data: impl Into<Cow<'a, [f32]>>) -> Option<Self> {
        let data = data.into();
        let expected = desc.voxel_count()?;
        if !desc.is_present() || expected != data.len() as u64 {
            return None;
        }
        Some(Self { desc, data })
    }

    pub fn desc(&self) -> &SdfDesc {
        &self.desc
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_owned(self) -> SdfGrid<'static> {
        SdfGrid {
            desc: self.desc,
            data: Cow::Owned(self.data.into_owned()),
        }
    }

    fn at(&self, x: usize, y: usize, z: usize) -> f32 {
        let [dx, dy, _] = self.desc.dim.map(|d| d as usize);
        self.data[x + y * dx + z * dx * dy]
    }

    /// Trilinearly interpolated distance at a world position.
    ///
    /// Points outside the covered volume return `max_distance`, so the
    /// outside of the grid always reads as open space.
    pub fn sample(&self, world: Vector3<f32>) -> f32 {
        let desc = &self.desc;
        if !(desc.voxel_size > 0.0) {
            return desc.max_distance;
        }
        let origin = Vector3::from(desc.origin);
        let g = (world - origin) / desc.voxel_size;
        let (Some(ax), Some(ay), Some(az)) = (
            axis_cell(g.x, desc.dim[0]),
            axis_cell(g.y, desc.dim[1]),
            axis_cell(g.z, desc.dim[2]),
        ) else {
            return desc.max_distance;
        };
        trilinear(ax, ay, az, |x, y, z| self.at(x, y, z))
    }
}

/// Lower/upper sample index and blend factor of one grid axis.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct AxisCell {
    pub lo: usize,
    pub hi: usize,
    pub t: f32,
}

/// Locates the grid coordinate `g` on an axis with `dim` samples, `None` if
/// it lies outside `[0, dim - 1]`.
pub(crate) fn axis_cell(g: f32, dim: u32) -> Option<AxisCell> {
    if dim == 0 || !g.is_finite() || g < 0.0 || g > (dim - 1) as f32 {
        return None;
    }
    if dim == 1 {
        return Some(AxisCell { lo: 0, hi: 0, t: 0.0 });
    }
    let lo = (g.floor() as usize).min(dim as usize - 2);
    Some(AxisCell {
        lo,
        hi: lo + 1,
        t: g - lo as f32,
    })
}

/// Same as [`axis_cell`] but clamps `g` to the grid instead of rejecting it.
pub(crate) fn axis_cell_clamped(g: f32, dim: u32) -> AxisCell {
    let max = dim.saturating_sub(1) as f32;
    let g = if g.is_finite() { g.clamp(0.0, max) } else { 0.0 };
    axis_cell(g, dim.max(1)).unwrap_or(AxisCell { lo: 0, hi: 0, t: 0.0 })
}

pub(crate) fn trilinear<F>(ax: AxisCell, ay: AxisCell, az: AxisCell, fetch: F) -> f32
where
    F: Fn(usize, usize, usize) -> f32,
{
    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
    let c00 = lerp(fetch(ax.lo, ay.lo, az.lo), fetch(ax.hi, ay.lo, az.lo), ax.t);
    let c10 = lerp(fetch(ax.lo, ay.hi, az.lo), fetch(ax.hi, ay.hi, az.lo), ax.t);
    let c01 = lerp(fetch(ax.lo, ay.lo, az.hi), fetch(ax.hi, ay.lo, az.hi), ax.t);
    let c11 = lerp(fetch(ax.lo, ay.hi, az.hi), fetch(ax.hi, ay.hi, az.hi), ax.t);
    let c0 = lerp(c00, c10, ay.t);
    let c1 = lerp(c01, c11, ay.t);
    lerp(c0, c1, az.t)
}
