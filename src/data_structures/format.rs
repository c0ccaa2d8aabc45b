//! The `.scn` wire format.
//!
//! A blob is laid out as
//!
//! ```text
//! [SceneHeader][SceneVertex x N][u16 x M][SceneLight x L][SceneTexture x T][strings][f32 sdf]
//! ```
//!
//! Every struct in here is `Pod` and is cast directly from/to the blob bytes,
//! so the field order and explicit padding are part of the format. Offsets are
//! stored as [`ByteOffset`] and stay offsets for the whole lifetime of a
//! loaded scene; the loader never turns them into pointers.

use std::fmt;

use bytemuck::{Pod, Zeroable};

#[cfg(target_endian = "big")]
compile_error!("scene blobs are little-endian and cast in place; big-endian targets are not supported");

/// "SCNE"
pub const SCENE_MAGIC: u32 = 0x5343_4E45;
pub const SCENE_VERSION: u32 = 1;
pub const HEADER_SIZE: usize = std::mem::size_of::<SceneHeader>();

/// A byte offset relative to the start of the blob, or of the string arena
/// for [`SceneTexture::path_offset`].
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
pub struct ByteOffset(pub u64);

impl ByteOffset {
    pub const ZERO: ByteOffset = ByteOffset(0);

    pub fn get(self) -> u64 {
        self.0
    }

    /// `self + len`, or `None` on overflow.
    pub fn checked_end(self, len: u64) -> Option<u64> {
        self.0.checked_add(len)
    }
}

/// Location and shape of one section inside the blob.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct SectionDesc {
    pub offset: ByteOffset,
    pub size: u64,
    pub count: u32,
    pub _pad: u32,
}

impl SectionDesc {
    pub fn new(offset: u64, size: u64, count: u32) -> Self {
        Self {
            offset: ByteOffset(offset),
            size,
            count,
            _pad: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn end(&self) -> Option<u64> {
        self.offset.checked_end(self.size)
    }
}

/// Shape of the baked signed distance field stored in the sdf section.
///
/// Samples are laid out x fastest, then y, then z. `max_distance` doubles as
/// the value returned for points outside the grid.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SdfDesc {
    pub dim: [u32; 3],
    pub voxel_size: f32,
    pub origin: [f32; 3],
    pub max_distance: f32,
}

impl SdfDesc {
    /// Number of samples the grid holds, `None` on overflow.
    pub fn voxel_count(&self) -> Option<u64> {
        let [x, y, z] = self.dim.map(u64::from);
        x.checked_mul(y)?.checked_mul(z)
    }

    pub fn is_present(&self) -> bool {
        self.dim.iter().all(|&d| d > 0)
    }
}

/// Axis aligned scene bounds.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Bounds {
    /// An inverted box that any `include` call will replace.
    pub fn empty() -> Self {
        Self {
            min: [f32::INFINITY; 3],
            max: [f32::NEG_INFINITY; 3],
        }
    }

    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.min[i].is_finite() && self.max[i].is_finite() && self.min[i] <= self.max[i])
    }

    pub fn include(&mut self, point: [f32; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(point[i]);
            self.max[i] = self.max[i].max(point[i]);
        }
    }

    pub fn center(&self) -> cgmath::Vector3<f32> {
        let min = cgmath::Vector3::from(self.min);
        let max = cgmath::Vector3::from(self.max);
        (min + max) * 0.5
    }

    pub fn extent(&self) -> cgmath::Vector3<f32> {
        cgmath::Vector3::from(self.max) - cgmath::Vector3::from(self.min)
    }

    pub fn max_extent(&self) -> f32 {
        let e = self.extent();
        e.x.max(e.y).max(e.z)
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SceneHeader {
    pub magic: u32,
    pub version: u32,
    pub total_size: u64,
    pub vertices: SectionDesc,
    pub indices: SectionDesc,
    pub lights: SectionDesc,
    pub textures: SectionDesc,
    pub strings: SectionDesc,
    pub sdf: SectionDesc,
    pub sdf_desc: SdfDesc,
    pub bounds: Bounds,
}

const _: () = assert!(std::mem::size_of::<SceneHeader>() == 216);
const _: () = assert!(std::mem::size_of::<SceneVertex>() == 36);
const _: () = assert!(std::mem::size_of::<SceneLight>() == 32);
const _: () = assert!(std::mem::size_of::<SceneTexture>() == 16);

impl SceneHeader {
    pub fn section(&self, section: Section) -> &SectionDesc {
        match section {
            Section::Vertices => &self.vertices,
            Section::Indices => &self.indices,
            Section::Lights => &self.lights,
            Section::Textures => &self.textures,
            Section::Strings => &self.strings,
            Section::Sdf => &self.sdf,
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut SectionDesc {
        match section {
            Section::Vertices => &mut self.vertices,
            Section::Indices => &mut self.indices,
            Section::Lights => &mut self.lights,
            Section::Textures => &mut self.textures,
            Section::Strings => &mut self.strings,
            Section::Sdf => &mut self.sdf,
        }
    }
}

/// The data sections of a blob, in the order they are laid out.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Section {
    Vertices,
    Indices,
    Lights,
    Textures,
    Strings,
    Sdf,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Vertices,
        Section::Indices,
        Section::Lights,
        Section::Textures,
        Section::Strings,
        Section::Sdf,
    ];

    /// Size of one element; the string arena counts bytes.
    pub fn element_size(self) -> u64 {
        let size = match self {
            Section::Vertices => std::mem::size_of::<SceneVertex>(),
            Section::Indices => std::mem::size_of::<u16>(),
            Section::Lights => std::mem::size_of::<SceneLight>(),
            Section::Textures => std::mem::size_of::<SceneTexture>(),
            Section::Strings => 1,
            Section::Sdf => std::mem::size_of::<f32>(),
        };
        size as u64
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::Vertices => "vertex",
            Section::Indices => "index",
            Section::Lights => "light",
            Section::Textures => "texture",
            Section::Strings => "string",
            Section::Sdf => "sdf",
        };
        f.write_str(name)
    }
}

/// GPU-ready vertex: position, material id, texture coordinates and normal.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SceneVertex {
    pub position: [f32; 3],
    pub surface_type: f32,
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl SceneVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32,
        2 => Float32x2,
        3 => Float32x3
    ];

    pub fn new(position: [f32; 3], surface_type: SurfaceType, uv: [f32; 2], normal: [f32; 3]) -> Self {
        Self {
            position,
            surface_type: surface_type.id() as f32,
            uv,
            normal,
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SceneVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Point light in the layout the shaders expect.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SceneLight {
    pub position: [f32; 3],
    // Uniforms require 16 byte (4 float) spacing
    pub _pad0: f32,
    pub color: [f32; 3],
    pub _pad1: f32,
}

impl SceneLight {
    pub fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            position,
            _pad0: 0.0,
            color,
            _pad1: 0.0,
        }
    }
}

/// Reference from a surface type to a texture path in the string arena.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct SceneTexture {
    pub path_offset: ByteOffset,
    pub surface_type_id: u32,
    pub _pad: u32,
}

/// Material ids stored in [`SceneVertex::surface_type`] and
/// [`SceneTexture::surface_type_id`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum SurfaceType {
    Floor = 0,
    Wall = 1,
    Ceiling = 2,
    Window = 3,
    Sphere = 4,
    Book = 5,
    Chair = 6,
    CeilingLight = 7,
}

impl SurfaceType {
    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn from_id(id: u32) -> Option<Self> {
        Some(match id {
            0 => Self::Floor,
            1 => Self::Wall,
            2 => Self::Ceiling,
            3 => Self::Window,
            4 => Self::Sphere,
            5 => Self::Book,
            6 => Self::Chair,
            7 => Self::CeilingLight,
            _ => return None,
        })
    }
}
