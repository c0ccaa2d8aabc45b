//! Loading and validating `.scn` blobs.
//!
//! A [`Scene`] owns its backing bytes (a memory map or a heap buffer) and
//! hands out typed views into them. Everything about the layout is checked
//! once in [`Scene::load_from_memory`]; afterwards every accessor slices a
//! range that is known to lie inside the blob.
//!
//! Sections are packed tightly, so a section that follows the `u16` indices
//! or the string arena may not be aligned for its element type. Views borrow
//! when the bytes happen to be aligned and fall back to an owned copy
//! otherwise.

use std::{
    borrow::Cow,
    fs::File,
    io::{self, Read},
    ops::{Deref, Range},
    path::Path,
};

use bytemuck::Pod;
use memmap2::Mmap;

use crate::{
    data_structures::{
        format::{
            Bounds, HEADER_SIZE, SCENE_MAGIC, SCENE_VERSION, SceneHeader, SceneLight, SceneTexture,
            SceneVertex, Section,
        },
        sdf::SdfGrid,
    },
    error::{SceneError, SceneResult},
};

/// The bytes behind a loaded scene.
#[derive(Debug)]
pub enum SceneBlob {
    Mapped(Mmap),
    Heap(Vec<u8>),
}

impl Deref for SceneBlob {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            SceneBlob::Mapped(map) => map,
            SceneBlob::Heap(bytes) => bytes,
        }
    }
}

impl From<Vec<u8>> for SceneBlob {
    fn from(bytes: Vec<u8>) -> Self {
        SceneBlob::Heap(bytes)
    }
}

impl From<&[u8]> for SceneBlob {
    fn from(bytes: &[u8]) -> Self {
        SceneBlob::Heap(bytes.to_vec())
    }
}

impl From<Mmap> for SceneBlob {
    fn from(map: Mmap) -> Self {
        SceneBlob::Mapped(map)
    }
}

/// A texture entry with its path resolved against the string arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TextureRef<'a> {
    pub surface_type_id: u32,
    pub path: &'a str,
}

#[derive(Clone, Debug)]
struct ResolvedTexture {
    surface_type_id: u32,
    path: Range<usize>,
}

/// A validated scene blob.
#[derive(Debug)]
pub struct Scene {
    blob: SceneBlob,
    header: SceneHeader,
    ranges: [Range<usize>; 6],
    textures: Vec<ResolvedTexture>,
}

impl Scene {
    /// Validate `blob` and take ownership of it. On error the blob is dropped.
    pub fn load_from_memory(blob: impl Into<SceneBlob>) -> SceneResult<Self> {
        let blob = blob.into();
        let header = validate(&blob)?;
        let ranges = Section::ALL.map(|section| {
            let desc = header.section(section);
            let start = desc.offset.get() as usize;
            start..start + desc.size as usize
        });
        let textures = resolve_textures(&blob, &ranges)?;

        let scene = Self {
            blob,
            header,
            ranges,
            textures,
        };
        log::info!(
            "Loaded scene: {} vertices, {} indices, {} lights, {} textures, sdf {:?} ({} bytes)",
            scene.header.vertices.count,
            scene.header.indices.count,
            scene.header.lights.count,
            scene.header.textures.count,
            scene.header.sdf_desc.dim,
            scene.blob.len()
        );
        Ok(scene)
    }

    /// Map `path` into memory, or read it into a buffer if mapping fails.
    pub fn load_from_file(path: impl AsRef<Path>) -> SceneResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SceneError::io("failed to open scene", path, e))?;
        let len = file
            .metadata()
            .map_err(|e| SceneError::io("failed to stat scene", path, e))?
            .len();
        if len == 0 {
            return Err(SceneError::io(
                "scene file is empty",
                path,
                io::Error::new(io::ErrorKind::UnexpectedEof, "empty file"),
            ));
        }

        // SAFETY: the map is read-only and owned by the returned scene. The
        // file may still be truncated or rewritten by another process while
        // mapped; scene files are treated as immutable once written.
        match unsafe { Mmap::map(&file) } {
            Ok(map) => return Self::load_from_memory(map),
            Err(e) => log::warn!("Failed to map {}, reading it instead: {e}", path.display()),
        }

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len as usize)
            .map_err(|e| SceneError::Resource(format!("failed to allocate {len} bytes for scene: {e}")))?;
        (&file)
            .take(len)
            .read_to_end(&mut bytes)
            .map_err(|e| SceneError::io("failed to read scene", path, e))?;
        if bytes.len() as u64 != len {
            return Err(SceneError::io(
                "short read on scene",
                path,
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("read {} of {len} bytes", bytes.len()),
                ),
            ));
        }
        Self::load_from_memory(bytes)
    }

    pub fn header(&self) -> &SceneHeader {
        &self.header
    }

    pub fn bounds(&self) -> Bounds {
        self.header.bounds
    }

    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.blob, SceneBlob::Mapped(_))
    }

    /// Validated byte range of a section inside [`Scene::blob`].
    pub fn section_range(&self, section: Section) -> Range<usize> {
        self.ranges[section.index()].clone()
    }

    pub fn section_bytes(&self, section: Section) -> &[u8] {
        &self.blob[self.section_range(section)]
    }

    fn view<T: Pod>(&self, section: Section) -> Cow<'_, [T]> {
        let bytes = self.section_bytes(section);
        match bytemuck::try_cast_slice(bytes) {
            Ok(slice) => Cow::Borrowed(slice),
            Err(_) => Cow::Owned(bytemuck::pod_collect_to_vec(bytes)),
        }
    }

    pub fn vertices(&self) -> Cow<'_, [SceneVertex]> {
        self.view(Section::Vertices)
    }

    pub fn indices(&self) -> Cow<'_, [u16]> {
        self.view(Section::Indices)
    }

    pub fn lights(&self) -> Cow<'_, [SceneLight]> {
        self.view(Section::Lights)
    }

    /// Raw texture records as stored, offsets untouched.
    pub fn texture_records(&self) -> Cow<'_, [SceneTexture]> {
        self.view(Section::Textures)
    }

    pub fn textures(&self) -> impl ExactSizeIterator<Item = TextureRef<'_>> + '_ {
        self.textures.iter().map(|t| TextureRef {
            surface_type_id: t.surface_type_id,
            // Checked as UTF-8 when resolved.
            path: std::str::from_utf8(&self.blob[t.path.clone()]).unwrap_or_default(),
        })
    }

    /// Path of the first texture registered for `surface_type_id`.
    pub fn texture_path(&self, surface_type_id: u32) -> Option<&str> {
        self.textures()
            .find(|t| t.surface_type_id == surface_type_id)
            .map(|t| t.path)
    }

    pub fn has_sdf(&self) -> bool {
        self.header.sdf_desc.is_present() && !self.header.sdf.is_empty()
    }

    pub fn sdf(&self) -> Option<SdfGrid<'_>> {
        if !self.has_sdf() {
            return None;
        }
        SdfGrid::new(self.header.sdf_desc, self.view::<f32>(Section::Sdf))
    }
}

fn validate(blob: &[u8]) -> SceneResult<SceneHeader> {
    let actual = blob.len() as u64;
    if blob.len() < HEADER_SIZE {
        return Err(SceneError::TooSmall {
            size: actual,
            required: HEADER_SIZE as u64,
        });
    }
    let header: SceneHeader = bytemuck::pod_read_unaligned(&blob[..HEADER_SIZE]);

    if header.magic != SCENE_MAGIC {
        return Err(SceneError::BadMagic {
            found: header.magic,
            expected: SCENE_MAGIC,
        });
    }
    if header.version != SCENE_VERSION {
        return Err(SceneError::BadVersion {
            found: header.version,
            expected: SCENE_VERSION,
        });
    }
    if header.total_size != actual {
        return Err(SceneError::TotalSizeMismatch {
            declared: header.total_size,
            actual,
        });
    }

    let mut previous_end = HEADER_SIZE as u64;
    for section in Section::ALL {
        let desc = header.section(section);
        let out_of_bounds = || SceneError::SectionOutOfBounds {
            section,
            offset: desc.offset.get(),
            size: desc.size,
            total: actual,
        };
        let end = desc.end().ok_or_else(out_of_bounds)?;
        if end > actual {
            return Err(out_of_bounds());
        }

        let expected = u64::from(desc.count) * section.element_size();
        if desc.size != expected {
            return Err(SceneError::SectionSizeMismatch {
                section,
                size: desc.size,
                count: desc.count,
                expected,
            });
        }

        if !desc.is_empty() {
            if desc.offset.get() < previous_end {
                return Err(SceneError::SectionOrder { section });
            }
            previous_end = end;
        }
    }

    let sdf = &header.sdf_desc;
    let expected = sdf
        .voxel_count()
        .and_then(|n| n.checked_mul(std::mem::size_of::<f32>() as u64))
        .unwrap_or(u64::MAX);
    if header.sdf.size != expected {
        return Err(SceneError::SdfSizeMismatch {
            dim: sdf.dim,
            size: header.sdf.size,
            expected,
        });
    }

    Ok(header)
}

fn resolve_textures(blob: &[u8], ranges: &[Range<usize>; 6]) -> SceneResult<Vec<ResolvedTexture>> {
    let bytes = &blob[ranges[Section::Textures.index()].clone()];
    let strings = ranges[Section::Strings.index()].clone();
    let record_size = std::mem::size_of::<SceneTexture>();

    let mut textures = Vec::new();
    textures
        .try_reserve_exact(bytes.len() / record_size)
        .map_err(|e| SceneError::Resource(format!("failed to allocate texture table: {e}")))?;

    for (i, chunk) in bytes.chunks_exact(record_size).enumerate() {
        let record: SceneTexture = bytemuck::pod_read_unaligned(chunk);
        let offset = record.path_offset.get();
        let start = if offset >= strings.len() as u64 {
            log::warn!(
                "Texture {i} path offset {offset} is outside the {} byte string table, using its start",
                strings.len()
            );
            strings.start
        } else {
            strings.start + offset as usize
        };

        let tail = &blob[start..strings.end];
        let len = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        let path = if std::str::from_utf8(&tail[..len]).is_ok() {
            start..start + len
        } else {
            log::warn!("Texture {i} path is not valid UTF-8, ignoring it");
            start..start
        };

        textures.push(ResolvedTexture {
            surface_type_id: record.surface_type_id,
            path,
        });
    }
    Ok(textures)
}
