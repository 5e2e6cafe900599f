//! Turns finalized sampler trees into triangle meshes.

use glam::DVec2;

use super::data::{MeshLod, TileMesh};
use super::delaunay;
use crate::core::types::Result;
use crate::core::Error;
use crate::sampler::SampleVertex;
use crate::scan::TerrainScanner;

/// Triangulate the xz projection of `vertices`.
///
/// Output vertex `i` is input vertex `i`. Triangles whose xz area is below
/// `min_triangle_area` are dropped and the rest are emitted with reversed
/// winding. Fewer than three vertices give an empty mesh; a triangulation that
/// leaves any vertex out is a [`Error::Tessellation`].
pub fn tessellate(vertices: &[SampleVertex], min_triangle_area: f32) -> Result<MeshLod> {
    let mut lod = MeshLod::default();
    if vertices.len() < 3 {
        return Ok(lod);
    }

    let points: Vec<DVec2> = vertices
        .iter()
        .map(|v| DVec2::new(v.position.x as f64, v.position.z as f64))
        .collect();
    let triangles = delaunay::triangulate(&points);

    let mut used = vec![false; vertices.len()];
    for t in &triangles {
        for &v in t {
            used[v] = true;
        }
    }
    let actual = used.iter().filter(|u| **u).count();
    if actual != vertices.len() {
        return Err(Error::Tessellation {
            expected: vertices.len(),
            actual,
        });
    }

    lod.positions = vertices.iter().map(|v| v.position).collect();
    lod.normals = vertices.iter().map(|v| v.normal).collect();
    lod.uvs = vertices.iter().map(|v| v.uv).collect();
    lod.indices.reserve(triangles.len() * 3);

    let min_area = min_triangle_area as f64;
    for [p0, p1, p2] in triangles {
        let area = delaunay::orient(points[p0], points[p1], points[p2]).abs() / 2.0;
        if area < min_area {
            continue;
        }
        lod.indices.extend([p2 as u32, p1 as u32, p0 as u32]);
    }
    Ok(lod)
}

/// Stepwise tessellation of every tile at every LOD.
///
/// Each `update()` meshes one tile (all of its LODs). A tile that fails to
/// tessellate is logged and gets an empty mesh.
pub struct TessellationJob<'a> {
    scanners: &'a [TerrainScanner],
    min_triangle_area: f32,
    tile_count: usize,
    meshes: Vec<TileMesh>,
}

impl<'a> TessellationJob<'a> {
    /// `scanners` are finished scanners, finest LOD first
    pub fn new(scanners: &'a [TerrainScanner], min_triangle_area: f32) -> Self {
        let tile_count = scanners.first().map_or(0, |s| s.trees().len());
        Self {
            scanners,
            min_triangle_area,
            tile_count,
            meshes: Vec::with_capacity(tile_count),
        }
    }

    pub fn min_triangle_area(&self) -> f32 {
        self.min_triangle_area
    }

    pub fn is_done(&self) -> bool {
        self.meshes.len() >= self.tile_count
    }

    pub fn progress(&self) -> f32 {
        if self.tile_count == 0 {
            return 1.0;
        }
        self.meshes.len() as f32 / self.tile_count as f32
    }

    pub fn update(&mut self) {
        if self.is_done() {
            return;
        }
        let id = self.meshes.len();
        let coord = self.scanners[0].trees().coord_of(id);

        let mut lods = Vec::with_capacity(self.scanners.len());
        for (lod_index, scanner) in self.scanners.iter().enumerate() {
            let Some(tree) = scanner.trees().cells().get(id).and_then(|t| t.as_ref()) else {
                log::warn!("Tile {} LOD {} was never scanned", coord, lod_index);
                lods.push(MeshLod { tile: coord, ..Default::default() });
                continue;
            };

            let mut lod = match tessellate(tree.vertices(), self.min_triangle_area) {
                Ok(lod) => lod,
                Err(e) => {
                    log::error!("Tile {} LOD {}: {}", coord, lod_index, e);
                    MeshLod::default()
                }
            };
            lod.tile = tree.coord();
            lod.uv_min = tree.uv_min();
            lod.uv_max = tree.uv_max();
            log::trace!(
                "Tile {} LOD {}: {} vertices, {} triangles",
                coord, lod_index, lod.vertex_count(), lod.triangle_count()
            );
            lods.push(lod);
        }

        self.meshes.push(TileMesh { id, coord, lods });
    }

    pub fn meshes(&self) -> &[TileMesh] {
        &self.meshes
    }

    pub fn into_meshes(self) -> Vec<TileMesh> {
        self.meshes
    }
}
