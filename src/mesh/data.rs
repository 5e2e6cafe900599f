//! Per-tile mesh buffers

use bytemuck::{Pod, Zeroable};
use rkyv::{Archive, Deserialize, Serialize};

use crate::core::types::{Vec2, Vec3};
use crate::grid::TileCoord;

/// Interleaved vertex layout used on disk (32 bytes)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Archive, Deserialize, Serialize)]
pub struct PackedVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Mesh of one tile at one LOD
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshLod {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    /// Triangle list
    pub indices: Vec<u32>,
    pub uv_min: Vec2,
    pub uv_max: Vec2,
    /// Tile whose sampler tree produced this mesh
    pub tile: TileCoord,
}

impl MeshLod {
    /// Mesh with no geometry covering `[uv_min, uv_max]`
    pub fn empty(tile: TileCoord, uv_min: Vec2, uv_max: Vec2) -> Self {
        Self {
            tile,
            uv_min,
            uv_max,
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Move `other`'s geometry into this mesh.
    ///
    /// Indices are rebased past the current vertices and the uv footprint grows
    /// to cover both. `other` keeps its tile and footprint but no geometry.
    pub fn absorb(&mut self, other: &mut MeshLod) {
        let base = self.positions.len() as u32;
        self.positions.append(&mut other.positions);
        self.normals.append(&mut other.normals);
        self.uvs.append(&mut other.uvs);
        self.indices.extend(other.indices.drain(..).map(|i| i + base));
        self.uv_min = self.uv_min.min(other.uv_min);
        self.uv_max = self.uv_max.max(other.uv_max);
    }

    /// (scale, offset) mapping the mesh's [0, 1] footprint onto terrain uv
    pub fn scale_offset(&self) -> (Vec2, Vec2) {
        (self.uv_max - self.uv_min, self.uv_min)
    }

    pub fn packed_vertices(&self) -> Vec<PackedVertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .zip(&self.uvs)
            .map(|((p, n), uv)| PackedVertex {
                position: p.to_array(),
                normal: n.to_array(),
                uv: uv.to_array(),
            })
            .collect()
    }

    /// Rebuild a mesh from interleaved vertices
    pub fn from_packed(
        tile: TileCoord,
        uv_min: Vec2,
        uv_max: Vec2,
        vertices: &[PackedVertex],
        indices: Vec<u32>,
    ) -> Self {
        Self {
            positions: vertices.iter().map(|v| Vec3::from_array(v.position)).collect(),
            normals: vertices.iter().map(|v| Vec3::from_array(v.normal)).collect(),
            uvs: vertices.iter().map(|v| Vec2::from_array(v.uv)).collect(),
            indices,
            uv_min,
            uv_max,
            tile,
        }
    }
}

/// All LODs of one tile
#[derive(Debug, Clone, PartialEq)]
pub struct TileMesh {
    /// Row-major tile index
    pub id: usize,
    pub coord: TileCoord,
    /// Finest first
    pub lods: Vec<MeshLod>,
}

/// Outcome of the merge pass for one tile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileRole {
    Standalone,
    /// Owns the LOD 0 geometry of the listed tiles
    Root { absorbed: Vec<TileCoord> },
    /// LOD 0 geometry lives in `root`
    Absorbed { root: TileCoord },
}

impl TileRole {
    pub fn is_absorbed(&self) -> bool {
        matches!(self, TileRole::Absorbed { .. })
    }
}
