use scene_ngin::{
    Engine, EngineConfig, ErrorKind, GiConfig, Scene, SceneBuilder, SurfaceType,
    data_structures::texture::TexelFormat,
    gpu::BufferKind,
};

use crate::common::test_utils::{
    MockBackend, floor_quad, init_logger, temp_dir, wall_scene_builder, write_png,
};

mod common;

fn small_gi() -> EngineConfig {
    EngineConfig {
        gi: GiConfig {
            resolution: 8,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn wall_scene() -> Scene {
    Scene::load_from_memory(wall_scene_builder().serialize().unwrap()).unwrap()
}

fn quad_scene_without_sdf() -> Scene {
    let mut builder = SceneBuilder::new();
    let (vertices, indices) = floor_quad(2.0);
    builder.add_vertices(&vertices);
    builder.add_indices(&indices);
    Scene::load_from_memory(builder.serialize().unwrap()).unwrap()
}

#[test]
fn upload_with_sdf_bakes_and_uploads_cascades() {
    init_logger();
    let backend = MockBackend::new();
    let stats = backend.stats();
    let mut engine = Engine::with_config(backend, small_gi());
    let scene = wall_scene();

    engine.upload_scene(&scene).unwrap();
    assert!(engine.has_geometry());
    assert_eq!(engine.vertex_count(), 4);
    assert_eq!(engine.index_count(), 6);
    assert_eq!(engine.vertex_buffer().unwrap().kind, BufferKind::Vertex);
    assert_eq!(engine.index_buffer().unwrap().bytes, bytemuck::cast_slice::<u16, u8>(&scene.indices()));

    assert!(engine.has_gi());
    assert_eq!(engine.cascades().len(), 3);
    assert_eq!(engine.cascade_textures().len(), 3);
    for texture in engine.cascade_textures() {
        assert_eq!((texture.width, texture.height), (8, 64));
        assert_eq!(texture.format, TexelFormat::Rgba32Float);
    }
    assert_eq!(stats.borrow().live_buffers, 2);
    assert_eq!(stats.borrow().live_textures, 3);
}

#[test]
fn upload_without_sdf_skips_gi() {
    let backend = MockBackend::new();
    let stats = backend.stats();
    let mut engine = Engine::new(backend);
    engine.upload_scene(&quad_scene_without_sdf()).unwrap();
    assert!(engine.has_geometry());
    assert!(!engine.has_gi());
    assert!(engine.cascades().is_empty());
    assert_eq!(stats.borrow().texture_uploads, 0);
}

#[test]
fn upload_needs_geometry() {
    let mut builder = SceneBuilder::new();
    let (vertices, _) = floor_quad(1.0);
    builder.add_vertices(&vertices);
    let scene = Scene::load_from_memory(builder.serialize().unwrap()).unwrap();

    let backend = MockBackend::new();
    let stats = backend.stats();
    let mut engine = Engine::new(backend);
    let err = engine.upload_scene(&scene).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(!engine.has_geometry());
    assert_eq!(stats.borrow().buffer_uploads, 0);
}

#[test]
fn failed_index_upload_releases_the_vertex_buffer() {
    let backend = MockBackend::new().with_buffer_failure(BufferKind::Index);
    let stats = backend.stats();
    let mut engine = Engine::with_config(backend, small_gi());

    let err = engine.upload_scene(&wall_scene()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resource);
    assert!(!engine.has_geometry());
    assert!(!engine.has_gi());
    let stats = stats.borrow();
    assert_eq!(stats.buffer_uploads, 1);
    assert_eq!(stats.live_buffers, 0);
    assert_eq!(stats.released_buffers, 1);
}

#[test]
fn failed_cascade_upload_leaves_no_gi_and_no_leaks() {
    init_logger();
    let backend = MockBackend::new().with_texture_failure(1);
    let stats = backend.stats();
    let mut engine = Engine::with_config(backend, small_gi());

    // GI is optional; the geometry upload still succeeds
    engine.upload_scene(&wall_scene()).unwrap();
    assert!(engine.has_geometry());
    assert!(!engine.has_gi());
    assert!(engine.cascades().is_empty());
    assert!(engine.cascade_textures().is_empty());
    let stats = stats.borrow();
    assert_eq!(stats.live_textures, 0);
    assert_eq!(stats.released_textures, 1);
}

#[test]
fn bake_gi_reports_cascade_upload_failure() {
    let backend = MockBackend::new().with_texture_failure(2);
    let mut engine = Engine::with_config(backend, small_gi());
    let err = engine.bake_gi(&wall_scene()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resource);
    assert!(!engine.has_gi());

    let err = engine.bake_gi(&quad_scene_without_sdf()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn rebaking_replaces_cascade_textures() {
    let backend = MockBackend::new();
    let stats = backend.stats();
    let mut engine = Engine::with_config(backend, small_gi());
    let scene = wall_scene();

    engine.upload_scene(&scene).unwrap();
    engine.bake_gi(&scene).unwrap();
    engine.bake_gi(&scene).unwrap();
    assert!(engine.has_gi());
    let stats = stats.borrow();
    assert_eq!(stats.texture_uploads, 9);
    assert_eq!(stats.live_textures, 3);
    assert_eq!(stats.released_textures, 6);
}

#[test]
fn reuploading_replaces_geometry() {
    let backend = MockBackend::new();
    let stats = backend.stats();
    let mut engine = Engine::with_config(backend, small_gi());

    engine.upload_scene(&wall_scene()).unwrap();
    engine.upload_scene(&quad_scene_without_sdf()).unwrap();
    assert!(!engine.has_gi());
    let stats = stats.borrow();
    assert_eq!(stats.buffer_uploads, 4);
    assert_eq!(stats.live_buffers, 2);
    assert_eq!(stats.live_textures, 0);
}

#[test]
fn dropping_the_engine_releases_everything() {
    init_logger();
    let dir = temp_dir("engine_drop");
    write_png(&dir.join("floor.png"), 2, 2, [200, 180, 150, 255]);

    let mut builder = wall_scene_builder();
    builder.add_texture(SurfaceType::Floor.id(), "floor.png").unwrap();
    let scene = Scene::load_from_memory(builder.serialize().unwrap()).unwrap();

    let backend = MockBackend::new();
    let stats = backend.stats();
    let config = EngineConfig {
        asset_root: dir.clone(),
        ..small_gi()
    };
    let mut engine = Engine::with_config(backend, config);
    engine.upload_scene(&scene).unwrap();
    assert_eq!(engine.load_textures(&scene), 1);
    assert_eq!(stats.borrow().live_textures, 4);

    drop(engine);
    let stats = stats.borrow();
    assert_eq!(stats.live_buffers, 0);
    assert_eq!(stats.live_textures, 0);
    assert_eq!(stats.released_buffers, 2);
    assert_eq!(stats.released_textures, 4);

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn scene_without_textures_loads_none() {
    let backend = MockBackend::new();
    let stats = backend.stats();
    let mut engine = Engine::new(backend);
    assert_eq!(engine.load_textures(&quad_scene_without_sdf()), 0);
    assert_eq!(stats.borrow().texture_uploads, 0);
    for slot in 0..8 {
        assert!(engine.texture(slot).is_none());
    }
}

#[test]
fn texture_problems_are_skipped() {
    init_logger();
    let dir = temp_dir("engine_textures");
    write_png(&dir.join("floor_a.png"), 4, 4, [255, 0, 0, 255]);
    write_png(&dir.join("floor_b.png"), 2, 1, [0, 255, 0, 255]);
    write_png(&dir.join("chair.png"), 1, 1, [0, 0, 255, 255]);
    write_png(&dir.join("window.png"), 1, 1, [9, 9, 9, 255]);
    std::fs::write(dir.join("broken.png"), b"definitely not a png").unwrap();

    let mut builder = SceneBuilder::new();
    let (vertices, indices) = floor_quad(1.0);
    builder.add_vertices(&vertices);
    builder.add_indices(&indices);
    builder.add_texture(SurfaceType::Floor.id(), "floor_a.png").unwrap();
    builder.add_texture(SurfaceType::Wall.id(), "missing.png").unwrap();
    builder.add_texture(SurfaceType::Ceiling.id(), "broken.png").unwrap();
    builder.add_texture(SurfaceType::Window.id(), "window.png").unwrap();
    builder.add_texture(SurfaceType::Chair.id(), "chair.png").unwrap();
    builder.add_texture(SurfaceType::Floor.id(), "floor_b.png").unwrap();
    builder.add_texture(SurfaceType::Book.id(), "").unwrap();
    let scene = Scene::load_from_memory(builder.serialize().unwrap()).unwrap();

    let backend = MockBackend::new();
    let stats = backend.stats();
    let config = EngineConfig {
        asset_root: dir.clone(),
        ..Default::default()
    };
    let mut engine = Engine::with_config(backend, config);

    assert_eq!(engine.load_textures(&scene), 3);
    // the later floor texture wins
    let floor = engine.texture(0).unwrap();
    assert_eq!((floor.width, floor.height), (2, 1));
    assert_eq!(floor.format, TexelFormat::Rgba8Srgb);
    assert!(engine.texture(1).is_none());
    assert!(engine.texture(2).is_none());
    let chair = engine.texture(5).unwrap();
    assert_eq!((chair.width, chair.height), (1, 1));
    assert!(engine.texture(3).is_none());
    assert!(engine.texture(4).is_none());

    let stats = stats.borrow();
    assert_eq!(stats.texture_uploads, 3);
    assert_eq!(stats.live_textures, 2);
    assert_eq!(stats.released_textures, 1);
    drop(stats);

    std::fs::remove_dir_all(dir).unwrap();
}
