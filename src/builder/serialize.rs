use std::ops::Range;

use bytemuck::Zeroable;

use crate::{
    builder::SceneBuilder,
    data_structures::format::{
        ByteOffset, HEADER_SIZE, SCENE_MAGIC, SCENE_VERSION, SceneHeader, SceneTexture, Section,
        SectionDesc, SdfDesc,
    },
    error::{SceneError, SceneResult},
};

/// Result of the measure phase: a fully populated header whose section
/// offsets describe a tightly packed blob of `total_size` bytes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SceneLayout {
    pub header: SceneHeader,
}

impl SceneLayout {
    pub fn measure(builder: &SceneBuilder) -> SceneResult<Self> {
        let string_size: u64 = builder
            .textures
            .iter()
            .map(|t| t.path.len() as u64 + 1)
            .sum();
        let sdf_count = builder.sdf.as_ref().map_or(0, |v| v.data.len()) as u64;

        let mut header = SceneHeader::zeroed();
        header.magic = SCENE_MAGIC;
        header.version = SCENE_VERSION;

        let mut offset = HEADER_SIZE as u64;
        for section in Section::ALL {
            let count = match section {
                Section::Vertices => builder.vertices.len() as u64,
                Section::Indices => builder.indices.len() as u64,
                Section::Lights => builder.lights.len() as u64,
                Section::Textures => builder.textures.len() as u64,
                Section::Strings => string_size,
                Section::Sdf => sdf_count,
            };
            let count32 = u32::try_from(count).map_err(|_| {
                SceneError::InvalidConfig(format!("{section} section holds {count} elements, too many for the format"))
            })?;
            let size = count
                .checked_mul(section.element_size())
                .ok_or_else(|| SceneError::InvalidConfig(format!("{section} section size overflows")))?;
            *header.section_mut(section) = SectionDesc::new(offset, size, count32);
            offset = offset
                .checked_add(size)
                .ok_or_else(|| SceneError::InvalidConfig("scene blob size overflows".into()))?;
        }

        header.total_size = offset;
        header.sdf_desc = builder.sdf.as_ref().map_or(SdfDesc::default(), |v| v.desc);
        header.bounds = builder.bounds();
        Ok(Self { header })
    }

    pub fn total_size(&self) -> u64 {
        self.header.total_size
    }

    fn range(&self, section: Section) -> Range<usize> {
        let desc = self.header.section(section);
        let start = desc.offset.get() as usize;
        start..start + desc.size as usize
    }

    /// Write phase: allocate exactly `total_size` bytes and fill them.
    pub fn write(&self, builder: &SceneBuilder) -> SceneResult<Vec<u8>> {
        let total = usize::try_from(self.total_size())
            .map_err(|_| SceneError::Resource(format!("{} byte blob exceeds the address space", self.total_size())))?;
        let mut blob = Vec::new();
        blob.try_reserve_exact(total)
            .map_err(|e| SceneError::Resource(format!("failed to allocate {total} byte scene blob: {e}")))?;
        blob.resize(total, 0);

        blob[..HEADER_SIZE].copy_from_slice(bytemuck::bytes_of(&self.header));
        blob[self.range(Section::Vertices)].copy_from_slice(bytemuck::cast_slice(&builder.vertices));
        blob[self.range(Section::Indices)].copy_from_slice(bytemuck::cast_slice(&builder.indices));
        blob[self.range(Section::Lights)].copy_from_slice(bytemuck::cast_slice(&builder.lights));

        // Texture records and their paths are written together; each record
        // stores where its path starts inside the string arena.
        let records = self.range(Section::Textures);
        let strings = self.range(Section::Strings);
        let record_size = std::mem::size_of::<SceneTexture>();
        let mut cursor = 0usize;
        for (i, entry) in builder.textures.iter().enumerate() {
            let record = SceneTexture {
                path_offset: ByteOffset(cursor as u64),
                surface_type_id: entry.surface_type_id,
                _pad: 0,
            };
            let at = records.start + i * record_size;
            blob[at..at + record_size].copy_from_slice(bytemuck::bytes_of(&record));

            let path = entry.path.as_bytes();
            let at = strings.start + cursor;
            blob[at..at + path.len()].copy_from_slice(path);
            blob[at + path.len()] = 0;
            cursor += path.len() + 1;
        }
        debug_assert_eq!(cursor, strings.len());

        if let Some(volume) = &builder.sdf {
            blob[self.range(Section::Sdf)].copy_from_slice(bytemuck::cast_slice(&volume.data));
        }

        Ok(blob)
    }
}
