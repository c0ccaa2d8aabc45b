use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
};

use scene_ngin::{
    SceneBuilder, SceneConfig, SceneError, SceneVertex, SdfBakeConfig, SurfaceType, TileMap,
    data_structures::texture::TexelFormat,
    gpu::{BufferKind, GpuBackend, TextureUpload},
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A scratch directory unique to the calling test.
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("scene_ngin_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_png(path: &Path, width: u32, height: u32, rgba: [u8; 4]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    image::RgbaImage::from_pixel(width, height, image::Rgba(rgba))
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

/// A single floor quad covering `[0, size] x [0, size]` at y = 0.
pub fn floor_quad(size: f32) -> (Vec<SceneVertex>, Vec<u16>) {
    let up = [0.0, 1.0, 0.0];
    let vertices = vec![
        SceneVertex::new([0.0, 0.0, 0.0], SurfaceType::Floor, [0.0, 0.0], up),
        SceneVertex::new([size, 0.0, 0.0], SurfaceType::Floor, [1.0, 0.0], up),
        SceneVertex::new([size, 0.0, size], SurfaceType::Floor, [1.0, 1.0], up),
        SceneVertex::new([0.0, 0.0, size], SurfaceType::Floor, [0.0, 1.0], up),
    ];
    (vertices, vec![0, 2, 1, 0, 3, 2])
}

/// 10x10 open map with one wall tile at (6, 5) and a single white light at
/// (5.5, 1.9, 5.5), right next to the wall.
pub fn wall_scene_builder() -> SceneBuilder {
    let mut map = TileMap::filled(10, 10, 0);
    map.set(6, 5, 1);
    let (vertices, indices) = floor_quad(10.0);
    let config = SceneConfig {
        map,
        vertices,
        indices,
        textures: Vec::new(),
        sdf: Some(SdfBakeConfig::default()),
    };
    let mut builder = SceneBuilder::new();
    builder.generate(&config).unwrap();
    builder.add_light([5.5, 1.9, 5.5], [1.0, 1.0, 1.0]);
    builder
}

/// A small scene touching every section: geometry, lights, textures and an SDF.
pub fn sample_builder() -> SceneBuilder {
    let mut map = TileMap::filled(4, 4, 0);
    map.set(0, 0, 1);
    map.set(3, 3, 2);
    map.set(1, 2, 9);
    map.set(2, 1, 9);
    let (vertices, indices) = floor_quad(4.0);
    let config = SceneConfig {
        map,
        vertices,
        indices,
        textures: vec![
            scene_ngin::TexturePath::new(SurfaceType::Floor, "assets/floor.png"),
            scene_ngin::TexturePath::new(SurfaceType::Wall, "assets/wall.png"),
            scene_ngin::TexturePath::new(SurfaceType::Chair, "assets/chair_02_diff_1k.jpg"),
        ],
        sdf: Some(SdfBakeConfig {
            voxel_size: 0.5,
            max_distance: 3.0,
        }),
    };
    let mut builder = SceneBuilder::new();
    builder.generate(&config).unwrap();
    builder
}

#[derive(Clone, Debug, PartialEq)]
pub struct MockBuffer {
    pub id: usize,
    pub kind: BufferKind,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MockTexture {
    pub id: usize,
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TexelFormat,
}

#[derive(Debug, Default)]
pub struct MockStats {
    pub buffer_uploads: usize,
    pub texture_uploads: usize,
    pub live_buffers: usize,
    pub live_textures: usize,
    pub released_buffers: usize,
    pub released_textures: usize,
}

/// Backend that records what would have been created on the GPU.
///
/// Failures can be injected per buffer kind or on the n-th texture upload.
/// Stats are shared so they can be inspected after the engine is dropped.
#[derive(Default)]
pub struct MockBackend {
    pub stats: Rc<RefCell<MockStats>>,
    pub fail_buffer: Option<BufferKind>,
    /// Fail the texture upload with this zero-based index.
    pub fail_texture_upload: Option<usize>,
    next_id: usize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer_failure(mut self, kind: BufferKind) -> Self {
        self.fail_buffer = Some(kind);
        self
    }

    pub fn with_texture_failure(mut self, attempt: usize) -> Self {
        self.fail_texture_upload = Some(attempt);
        self
    }

    pub fn stats(&self) -> Rc<RefCell<MockStats>> {
        self.stats.clone()
    }
}

impl GpuBackend for MockBackend {
    type Buffer = MockBuffer;
    type Texture = MockTexture;

    fn upload_buffer(&mut self, label: &str, kind: BufferKind, contents: &[u8]) -> Result<MockBuffer, SceneError> {
        if self.fail_buffer == Some(kind) {
            return Err(SceneError::Resource(format!("injected failure for {label}")));
        }
        let mut stats = self.stats.borrow_mut();
        stats.buffer_uploads += 1;
        stats.live_buffers += 1;
        self.next_id += 1;
        Ok(MockBuffer {
            id: self.next_id,
            kind,
            bytes: contents.to_vec(),
        })
    }

    fn upload_texture(&mut self, upload: &TextureUpload<'_>) -> Result<MockTexture, SceneError> {
        upload.validate()?;
        let mut stats = self.stats.borrow_mut();
        let attempt = stats.texture_uploads;
        stats.texture_uploads += 1;
        if self.fail_texture_upload == Some(attempt) {
            return Err(SceneError::Resource(format!("injected failure for {}", upload.label)));
        }
        stats.live_textures += 1;
        self.next_id += 1;
        Ok(MockTexture {
            id: self.next_id,
            label: upload.label.to_string(),
            width: upload.width,
            height: upload.height,
            format: upload.format,
        })
    }

    fn release_buffer(&mut self, _buffer: MockBuffer) {
        let mut stats = self.stats.borrow_mut();
        stats.live_buffers -= 1;
        stats.released_buffers += 1;
    }

    fn release_texture(&mut self, _texture: MockTexture) {
        let mut stats = self.stats.borrow_mut();
        stats.live_textures -= 1;
        stats.released_textures += 1;
    }
}
