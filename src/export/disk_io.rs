//! Mesh serialization and disk I/O

use std::io;
use std::path::{Path, PathBuf};

use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};

use crate::core::types::Vec2;
use crate::grid::TileCoord;
use crate::mesh::{MeshLod, PackedVertex};
use crate::pipeline::TerrainMesh;

/// Serializable mesh of one tile at one LOD
#[derive(Archive, Deserialize, Serialize)]
pub struct MeshLodData {
    pub tile_x: u32,
    pub tile_z: u32,
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
    /// Interleaved vertices (already Pod-compatible)
    pub vertices: Vec<PackedVertex>,
    pub indices: Vec<u32>,
}

/// One exported tile mesh
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TileEntry {
    pub id: usize,
    pub x: u32,
    pub z: u32,
    /// Relative to the export directory
    pub path: String,
    /// (scale.x, scale.y, offset.x, offset.y) into terrain uv
    pub scale_offset: [f32; 4],
    pub vertex_count: usize,
    pub triangle_count: usize,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LodEntry {
    pub lod: usize,
    pub tiles: Vec<TileEntry>,
}

/// Index of everything written by [`export_terrain`]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExportManifest {
    pub max_x: u32,
    pub max_z: u32,
    pub lods: Vec<LodEntry>,
}

/// Serialize a mesh to bytes (uncompressed)
pub fn serialize_mesh_lod(mesh: &MeshLod) -> Result<Vec<u8>, io::Error> {
    let data = MeshLodData {
        tile_x: mesh.tile.x,
        tile_z: mesh.tile.z,
        uv_min: mesh.uv_min.to_array(),
        uv_max: mesh.uv_max.to_array(),
        vertices: mesh.packed_vertices(),
        indices: mesh.indices.clone(),
    };

    let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&data)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    Ok(bytes.to_vec())
}

/// Deserialize a mesh from bytes (uncompressed)
pub fn deserialize_mesh_lod(data: &[u8]) -> Result<MeshLod, io::Error> {
    // Archived data must be aligned, byte buffers from disk are not
    let mut aligned = AlignedVec::<16>::with_capacity(data.len());
    aligned.extend_from_slice(data);

    let archived = rkyv::access::<ArchivedMeshLodData, rkyv::rancor::Error>(&aligned)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    let mesh: MeshLodData = rkyv::deserialize::<MeshLodData, rkyv::rancor::Error>(archived)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    let vertex_count = mesh.vertices.len();
    if let Some(bad) = mesh.indices.iter().find(|i| **i as usize >= vertex_count) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("index {} out of range for {} vertices", bad, vertex_count),
        ));
    }

    Ok(MeshLod::from_packed(
        TileCoord::new(mesh.tile_x, mesh.tile_z),
        Vec2::from_array(mesh.uv_min),
        Vec2::from_array(mesh.uv_max),
        &mesh.vertices,
        mesh.indices,
    ))
}

/// Compress a serialized mesh using LZ4
pub fn compress_mesh_lod(mesh: &MeshLod) -> Result<Vec<u8>, io::Error> {
    let serialized = serialize_mesh_lod(mesh)?;
    Ok(lz4_flex::compress_prepend_size(&serialized))
}

/// Decompress and deserialize a mesh
pub fn decompress_mesh_lod(data: &[u8]) -> Result<MeshLod, io::Error> {
    let decompressed = lz4_flex::decompress_size_prepended(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("LZ4 decompression failed: {}", e)))?;
    deserialize_mesh_lod(&decompressed)
}

/// Path of a tile mesh relative to the export directory
pub fn mesh_path(lod: usize, id: usize) -> PathBuf {
    // Format: lod_{lod}/tile_{id}.tmesh
    PathBuf::from(format!("lod_{}", lod)).join(format!("tile_{}.tmesh", id))
}

/// Save a mesh to disk (compressed)
pub fn save_mesh_lod(path: &Path, mesh: &MeshLod) -> Result<(), io::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, compress_mesh_lod(mesh)?)
}

/// Load a mesh from disk (if it exists)
pub fn load_mesh_lod(path: &Path) -> Result<Option<MeshLod>, io::Error> {
    if !path.exists() {
        return Ok(None);
    }
    let compressed = std::fs::read(path)?;
    decompress_mesh_lod(&compressed).map(Some)
}

/// Write every exported LOD of `mesh` under `dir` plus `manifest.json`
pub fn export_terrain(dir: &Path, mesh: &TerrainMesh) -> Result<ExportManifest, io::Error> {
    std::fs::create_dir_all(dir)?;

    let mut manifest = ExportManifest {
        max_x: mesh.max_x,
        max_z: mesh.max_z,
        lods: (0..mesh.lod_count).map(|lod| LodEntry { lod, tiles: Vec::new() }).collect(),
    };

    let mut bytes = 0usize;
    for (lod, tile, lod_mesh) in mesh.exported_lods() {
        let relative = mesh_path(lod, tile.id);
        save_mesh_lod(&dir.join(&relative), lod_mesh)?;
        bytes += bytemuck::cast_slice::<PackedVertex, u8>(&lod_mesh.packed_vertices()).len()
            + lod_mesh.indices.len() * std::mem::size_of::<u32>();

        let (scale, offset) = lod_mesh.scale_offset();
        if let Some(entry) = manifest.lods.get_mut(lod) {
            entry.tiles.push(TileEntry {
                id: tile.id,
                x: tile.coord.x,
                z: tile.coord.z,
                path: relative.to_string_lossy().replace('\\', "/"),
                scale_offset: [scale.x, scale.y, offset.x, offset.y],
                vertex_count: lod_mesh.vertex_count(),
                triangle_count: lod_mesh.triangle_count(),
            });
        }
    }

    save_manifest(dir, &manifest)?;
    let files: usize = manifest.lods.iter().map(|l| l.tiles.len()).sum();
    log::info!("Exported {} meshes ({} KB raw) to {}", files, bytes / 1024, dir.display());
    Ok(manifest)
}

pub fn save_manifest(dir: &Path, manifest: &ExportManifest) -> Result<(), io::Error> {
    let json = serde_json::to_string_pretty(manifest)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    std::fs::write(dir.join("manifest.json"), json)
}

pub fn load_manifest(dir: &Path) -> Result<ExportManifest, io::Error> {
    let json = std::fs::read_to_string(dir.join("manifest.json"))?;
    serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Aabb;
    use crate::pipeline::TerrainMeshBuilder;
    use crate::scan::{MeshLodSetting, TerrainMeshConfig};
    use crate::terrain::FlatTerrain;
    use glam::{UVec2, Vec3};

    fn sample_mesh() -> MeshLod {
        MeshLod {
            positions: vec![Vec3::new(0.0, 1.0, 0.0), Vec3::new(2.0, 1.5, 0.0), Vec3::new(0.0, 0.5, 2.0)],
            normals: vec![Vec3::Y, Vec3::new(0.0, 0.8, 0.6), Vec3::Y],
            uvs: vec![Vec2::ZERO, Vec2::new(0.5, 0.0), Vec2::new(0.0, 0.5)],
            indices: vec![2, 1, 0],
            uv_min: Vec2::new(0.25, 0.0),
            uv_max: Vec2::new(0.5, 0.25),
            tile: TileCoord::new(1, 0),
        }
    }

    #[test]
    fn test_mesh_path() {
        assert_eq!(mesh_path(2, 17), PathBuf::from("lod_2").join("tile_17.tmesh"));
    }

    #[test]
    fn test_compress_decompress_mesh() {
        let mesh = sample_mesh();
        let compressed = compress_mesh_lod(&mesh).unwrap();
        assert_eq!(decompress_mesh_lod(&compressed).unwrap(), mesh);
    }

    #[test]
    fn test_corrupt_data_is_invalid() {
        let err = decompress_mesh_lod(&[1, 2, 3]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_load_missing_mesh() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_mesh_lod(&dir.path().join("nope.tmesh")).unwrap().is_none());
    }

    #[test]
    fn test_export_terrain() {
        let config = TerrainMeshConfig {
            slice_depth: 1,
            lods: vec![
                MeshLodSetting { subdivision: 2, slope_angle_error: 0.0 },
                MeshLodSetting { subdivision: 1, slope_angle_error: 0.0 },
            ],
            min_triangle_area: None,
        };
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(32.0, 8.0, 32.0));
        let mut terrain = FlatTerrain::new(1.0, UVec2::splat(8));
        terrain.paint(UVec2::new(4, 0), UVec2::new(8, 8), 1);
        let mesh = TerrainMeshBuilder::new(config, bounds).unwrap().build(&terrain, |_, _| {}).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let manifest = export_terrain(dir.path(), &mesh).unwrap();
        assert_eq!(load_manifest(dir.path()).unwrap(), manifest);

        let exported = mesh.exported_lods().count();
        let listed: usize = manifest.lods.iter().map(|l| l.tiles.len()).sum();
        assert_eq!(listed, exported);
        assert_eq!(manifest.lods[1].tiles.len(), 4);

        for lod in &manifest.lods {
            for entry in &lod.tiles {
                let loaded = load_mesh_lod(&dir.path().join(&entry.path)).unwrap().unwrap();
                let built = &mesh.tile(TileCoord::new(entry.x, entry.z)).unwrap().lods[lod.lod];
                assert_eq!(&loaded, built);
                let (scale, offset) = built.scale_offset();
                assert_eq!(entry.scale_offset, [scale.x, scale.y, offset.x, offset.y]);
            }
        }
    }
}
