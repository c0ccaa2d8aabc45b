//! Generates the default scene and writes it to a `.scn` file.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use scene_ngin::{
    SceneBuilder, SceneConfig, SceneVertex, SdfBakeConfig, SurfaceType, TexturePath, TileMap,
    builder::WALL_HEIGHT,
};

const MAP_WIDTH: usize = 10;
const MAP_HEIGHT: usize = 10;

#[rustfmt::skip]
const DEFAULT_MAP: [i32; MAP_WIDTH * MAP_HEIGHT] = [
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 0, 0, 0, 0, 0, 0, 0, 0, 1,
    1, 0, 0, 0, 0, 0, 0, 0, 0, 2,
    1, 0, 0, 0, 0, 0, 0, 0, 0, 1,
    1, 0, 0, 0, 9, 0, 0, 0, 0, 3,
    1, 0, 0, 0, 0, 0, 0, 0, 0, 1,
    1, 0, 0, 0, 0, 0, 9, 0, 0, 2,
    1, 0, 0, 0, 0, 0, 0, 0, 0, 1,
    1, 0, 0, 0, 0, 0, 0, 0, 0, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
];

const TEXTURES: [(SurfaceType, &str); 6] = [
    (SurfaceType::Floor, "assets/WoodFloor007_1K-JPG_Color.jpg"),
    (SurfaceType::Wall, "assets/Concrete046_1K-JPG_Color.jpg"),
    (SurfaceType::Ceiling, "assets/OfficeCeiling001_1K-JPG_Color.jpg"),
    (SurfaceType::Sphere, "assets/Land_ocean_ice_2048.jpg"),
    (SurfaceType::Book, "assets/checker_board_4k.png"),
    (SurfaceType::Chair, "assets/chair_02_diff_1k.jpg"),
];

#[derive(Parser)]
#[command(name = "scene_builder", version, about = "Generate the default scene as a .scn blob")]
struct Args {
    /// Where to write the scene.
    #[arg(value_name = "PATH", default_value = "scene.scn")]
    output: PathBuf,
    /// Skip the SDF bake; loaders of the scene will then have no GI.
    #[arg(long)]
    no_sdf: bool,
    #[arg(long, value_name = "METERS", default_value_t = SdfBakeConfig::default().voxel_size)]
    sdf_voxel_size: f32,
}

/// Floor and ceiling quads spanning the whole map; walls and props are
/// produced by the mesh pipeline.
fn floor_and_ceiling(width: f32, depth: f32) -> (Vec<SceneVertex>, Vec<u16>) {
    let up = [0.0, 1.0, 0.0];
    let down = [0.0, -1.0, 0.0];
    let vertices = vec![
        SceneVertex::new([0.0, 0.0, 0.0], SurfaceType::Floor, [0.0, 0.0], up),
        SceneVertex::new([width, 0.0, 0.0], SurfaceType::Floor, [width, 0.0], up),
        SceneVertex::new([width, 0.0, depth], SurfaceType::Floor, [width, depth], up),
        SceneVertex::new([0.0, 0.0, depth], SurfaceType::Floor, [0.0, depth], up),
        SceneVertex::new([0.0, WALL_HEIGHT, 0.0], SurfaceType::Ceiling, [0.0, 0.0], down),
        SceneVertex::new([width, WALL_HEIGHT, 0.0], SurfaceType::Ceiling, [width, 0.0], down),
        SceneVertex::new([width, WALL_HEIGHT, depth], SurfaceType::Ceiling, [width, depth], down),
        SceneVertex::new([0.0, WALL_HEIGHT, depth], SurfaceType::Ceiling, [0.0, depth], down),
    ];
    // floor faces up, ceiling faces down
    let indices = vec![0, 2, 1, 0, 3, 2, 4, 5, 6, 4, 6, 7];
    (vertices, indices)
}

fn main() -> anyhow::Result<()> {
    let _ = env_logger::try_init();
    let args = Args::parse();

    let map = TileMap::new(MAP_WIDTH, MAP_HEIGHT, DEFAULT_MAP.to_vec())?;
    let (vertices, indices) = floor_and_ceiling(MAP_WIDTH as f32, MAP_HEIGHT as f32);
    let config = SceneConfig {
        map,
        vertices,
        indices,
        textures: TEXTURES
            .iter()
            .map(|&(surface, path)| TexturePath::new(surface, path))
            .collect(),
        sdf: (!args.no_sdf).then(|| SdfBakeConfig {
            voxel_size: args.sdf_voxel_size,
            ..SdfBakeConfig::default()
        }),
    };

    let mut builder = SceneBuilder::new();
    builder.generate(&config).context("failed to generate scene")?;
    builder
        .save(&args.output)
        .with_context(|| format!("failed to save scene to {}", args.output.display()))?;

    println!(
        "Wrote {} ({} vertices, {} lights, {} textures)",
        args.output.display(),
        builder.vertices().len(),
        builder.lights().len(),
        builder.textures().len()
    );
    Ok(())
}
