//! Terrain mesh baker: builds tiled multi-LOD meshes from noise terrain.
//!
//! Usage: cargo run --release --bin bake_terrain -- [OPTIONS]
//!
//! Options:
//!   --size <METERS>    Terrain size in meters (default: 1024)
//!   --height <H>       Terrain height scale (default: 64)
//!   --seed <SEED>      Random seed (default: 12345)
//!   --slices <N>       Slice depth, 2^N tiles per side (default: 2)
//!   --lods <N>         Number of LODs, finest first (default: 3)
//!   --config <PATH>    JSON mesh config, overrides --slices/--lods
//!   --out <DIR>        Output directory (default: "assets/terrain_mesh")
//!
//! Output structure:
//!   <out>/
//!     manifest.json       # Per-LOD tile lists with uv scale/offset
//!     lod_0/
//!       tile_0.tmesh
//!       ...

use std::path::{Path, PathBuf};
use std::time::Instant;

use glam::{UVec2, Vec3};

use tilemesh::export::export_terrain;
use tilemesh::math::Aabb;
use tilemesh::pipeline::{BuildPhase, TerrainMeshBuilder};
use tilemesh::scan::{MeshLodSetting, TerrainMeshConfig};
use tilemesh::terrain::{NoiseTerrain, TerrainParams};

fn main() {
    tilemesh::core::logging::init();

    let args: Vec<String> = std::env::args().collect();
    let size = parse_f32_arg(&args, "--size").unwrap_or(1024.0);
    let height = parse_f32_arg(&args, "--height").unwrap_or(64.0);
    let seed = parse_u32_arg(&args, "--seed").unwrap_or(12345);
    let slices = parse_u32_arg(&args, "--slices").unwrap_or(2);
    let lod_count = parse_u32_arg(&args, "--lods").unwrap_or(3).max(1);
    let out = PathBuf::from(parse_str_arg(&args, "--out").unwrap_or_else(|| "assets/terrain_mesh".to_string()));

    let config = match parse_str_arg(&args, "--config") {
        Some(path) => match TerrainMeshConfig::load(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => TerrainMeshConfig {
            slice_depth: slices,
            // Each LOD halves the lattice resolution of the previous one
            lods: (0..lod_count)
                .map(|i| MeshLodSetting {
                    subdivision: 5u32.saturating_sub(i).max(1),
                    slope_angle_error: 2.0 + i as f32 * 3.0,
                })
                .collect(),
            min_triangle_area: None,
        },
    };

    println!("=== Tilemesh Terrain Baker ===");
    println!("Size:   {}m x {}m, height {}m", size, size, height);
    println!("Seed:   {}", seed);
    println!("Tiles:  {} x {}", config.grid_size(), config.grid_size());
    println!("LODs:   {}", config.lods.len());
    println!("Output: {}", out.display());
    println!();

    let bounds = Aabb::new(Vec3::ZERO, Vec3::new(size, height, size));
    let params = TerrainParams {
        seed,
        scale: size / 8.0,
        height_scale: height,
        sea_level: height * 0.2,
        snow_line: height * 0.8,
        ..Default::default()
    };
    let terrain = NoiseTerrain::new(params, bounds, UVec2::splat(256));

    let builder = match TerrainMeshBuilder::new(config, bounds) {
        Ok(builder) => builder,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let start = Instant::now();
    let mut reported = (BuildPhase::Scanning, -1i32);
    let mesh = match builder.build(&terrain, |phase, progress| {
        let percent = (progress * 10.0) as i32 * 10;
        if reported != (phase, percent) {
            reported = (phase, percent);
            println!("  {:>12}: {:>3}%", phase, percent);
        }
    }) {
        Ok(mesh) => mesh,
        Err(e) => {
            eprintln!("Build failed: {}", e);
            std::process::exit(1);
        }
    };

    let manifest = match export_terrain(&out, &mesh) {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("Export failed: {}", e);
            std::process::exit(1);
        }
    };

    println!();
    for lod in &manifest.lods {
        let triangles: usize = lod.tiles.iter().map(|t| t.triangle_count).sum();
        println!("LOD {}: {} meshes, {} triangles", lod.lod, lod.tiles.len(), triangles);
    }
    println!("Done in {:.2?}", start.elapsed());
}

fn parse_f32_arg(args: &[String], name: &str) -> Option<f32> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], name: &str) -> Option<u32> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
