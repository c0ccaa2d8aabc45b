//! Error types shared by the builder, loader, GI bake and engine.
//!
//! Structural problems with a blob are fail-fast and surface as
//! [`SceneError`]. Asset problems (a texture that can't be read or decoded)
//! are logged by the engine and never reach this type.

use std::path::PathBuf;

use thiserror::Error;

use crate::data_structures::format::Section;

/// Coarse classification of a [`SceneError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad magic/version, total-size mismatch or a blob shorter than the header.
    Format,
    /// A section escapes the blob, disagrees with its element count or is out of order.
    Bounds,
    /// Reading, mapping or writing a file failed.
    Io,
    /// An allocation or GPU resource could not be created.
    Resource,
    /// The caller handed in inconsistent input.
    Config,
}

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("scene blob is {size} bytes, smaller than the {required} byte header")]
    TooSmall { size: u64, required: u64 },

    #[error("invalid scene magic 0x{found:08x} (expected 0x{expected:08x})")]
    BadMagic { found: u32, expected: u32 },

    #[error("unsupported scene version {found} (expected {expected})")]
    BadVersion { found: u32, expected: u32 },

    #[error("scene header declares {declared} bytes but the blob holds {actual}")]
    TotalSizeMismatch { declared: u64, actual: u64 },

    #[error("{section} section at offset {offset} with {size} bytes exceeds the {total} byte blob")]
    SectionOutOfBounds {
        section: Section,
        offset: u64,
        size: u64,
        total: u64,
    },

    #[error("{section} section is {size} bytes but {count} elements need {expected}")]
    SectionSizeMismatch {
        section: Section,
        size: u64,
        count: u32,
        expected: u64,
    },

    #[error("{section} section overlaps the header or the previous section")]
    SectionOrder { section: Section },

    #[error("sdf section is {size} bytes but a {dim:?} grid needs {expected}")]
    SdfSizeMismatch {
        dim: [u32; 3],
        size: u64,
        expected: u64,
    },

    #[error("{context} {path:?}: {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("resource error: {0}")]
    Resource(String),

    #[error("invalid input: {0}")]
    InvalidConfig(String),
}

impl SceneError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TooSmall { .. }
            | Self::BadMagic { .. }
            | Self::BadVersion { .. }
            | Self::TotalSizeMismatch { .. } => ErrorKind::Format,
            Self::SectionOutOfBounds { .. }
            | Self::SectionSizeMismatch { .. }
            | Self::SectionOrder { .. }
            | Self::SdfSizeMismatch { .. } => ErrorKind::Bounds,
            Self::Io { .. } => ErrorKind::Io,
            Self::Resource(_) => ErrorKind::Resource,
            Self::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }
}

pub type SceneResult<T> = Result<T, SceneError>;
