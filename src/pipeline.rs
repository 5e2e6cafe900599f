//! End-to-end terrain mesh build.
//!
//! Phases run strictly in order: scan every LOD, fill and stitch, tessellate
//! every tile, then merge LOD 0. Each phase is a stepwise job; the builder
//! drives them to completion and reports progress through a callback.

use std::fmt;
use std::time::Instant;

use crate::core::types::Result;
use crate::grid::TileCoord;
use crate::math::Aabb;
use crate::mesh::{merge_tiles, MeshLod, TessellationJob, TileMesh, TileRole};
use crate::scan::{LodCoordinator, TerrainMeshConfig};
use crate::terrain::HeightSampler;

/// Build phase reported to the progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Scanning,
    Tessellating,
    Merging,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildPhase::Scanning => "scanning",
            BuildPhase::Tessellating => "tessellating",
            BuildPhase::Merging => "merging",
        };
        f.pad(name)
    }
}

/// Finished multi-LOD terrain mesh
#[derive(Debug, Clone)]
pub struct TerrainMesh {
    pub max_x: u32,
    pub max_z: u32,
    pub lod_count: usize,
    /// Row-major
    pub tiles: Vec<TileMesh>,
    /// Merge outcome per tile, row-major
    pub roles: Vec<TileRole>,
}

impl TerrainMesh {
    pub fn tile(&self, coord: TileCoord) -> Option<&TileMesh> {
        if coord.x >= self.max_x || coord.z >= self.max_z {
            return None;
        }
        self.tiles.get(coord.z as usize * self.max_x as usize + coord.x as usize)
    }

    pub fn role(&self, coord: TileCoord) -> Option<&TileRole> {
        self.tile(coord).and_then(|t| self.roles.get(t.id))
    }

    /// Every `(lod, tile, mesh)` worth persisting.
    ///
    /// Absorbed tiles are skipped at LOD 0, their geometry lives in the root.
    pub fn exported_lods(&self) -> impl Iterator<Item = (usize, &TileMesh, &MeshLod)> + '_ {
        (0..self.lod_count).flat_map(move |lod| {
            self.tiles.iter().filter_map(move |tile| {
                let absorbed = self.roles.get(tile.id).is_some_and(|r| r.is_absorbed());
                if lod == 0 && absorbed {
                    return None;
                }
                tile.lods.get(lod).map(|mesh| (lod, tile, mesh))
            })
        })
    }
}

/// Drives the whole build for one terrain
pub struct TerrainMeshBuilder {
    config: TerrainMeshConfig,
    bounds: Aabb,
}

impl TerrainMeshBuilder {
    pub fn new(config: TerrainMeshConfig, bounds: Aabb) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, bounds })
    }

    pub fn config(&self) -> &TerrainMeshConfig {
        &self.config
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Build the mesh, calling `progress(phase, fraction)` after every step
    pub fn build(
        &self,
        sampler: &dyn HeightSampler,
        mut progress: impl FnMut(BuildPhase, f32),
    ) -> Result<TerrainMesh> {
        let start = Instant::now();
        let grid = self.config.grid_size();
        log::info!(
            "Building terrain mesh: {}x{} tiles, {} LODs",
            grid, grid, self.config.lods.len()
        );

        let mut coordinator = LodCoordinator::new(self.bounds, grid, grid, &self.config.lods)?;
        while !coordinator.is_done() {
            coordinator.update(sampler);
            progress(BuildPhase::Scanning, coordinator.progress());
        }
        coordinator.end_process()?;
        let mut scanners = coordinator.into_scanners();
        log::info!("Scan finished in {:.2?}", start.elapsed());

        let min_area = self.config.min_triangle_area_for(&self.bounds);
        let mut tiles = {
            let mut job = TessellationJob::new(&scanners, min_area);
            while !job.is_done() {
                job.update();
                progress(BuildPhase::Tessellating, job.progress());
            }
            job.into_meshes()
        };
        log::info!("Tessellated {} tiles (min triangle area {})", tiles.len(), min_area);

        let roles = match scanners.first_mut() {
            Some(detail) => merge_tiles(detail.trees_mut(), &mut tiles),
            None => vec![TileRole::Standalone; tiles.len()],
        };
        progress(BuildPhase::Merging, 1.0);

        log::info!("Terrain mesh built in {:.2?}", start.elapsed());
        Ok(TerrainMesh {
            max_x: grid,
            max_z: grid,
            lod_count: self.config.lods.len(),
            tiles,
            roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;
    use crate::scan::MeshLodSetting;
    use crate::terrain::{FlatTerrain, NoiseTerrain, TerrainParams};
    use glam::{UVec2, Vec3};

    fn bounds() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::new(64.0, 32.0, 64.0))
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TerrainMeshConfig { lods: vec![], ..Default::default() };
        assert!(matches!(TerrainMeshBuilder::new(config, bounds()), Err(Error::Config(_))));
    }

    #[test]
    fn test_flat_single_layer_merges_into_one_root() {
        let config = TerrainMeshConfig {
            slice_depth: 1,
            lods: vec![MeshLodSetting { subdivision: 1, slope_angle_error: 0.0 }],
            min_triangle_area: None,
        };
        let terrain = FlatTerrain::new(0.0, UVec2::splat(4));
        let builder = TerrainMeshBuilder::new(config, bounds()).unwrap();

        let mut last = 0.0;
        let mut phases = Vec::new();
        let mesh = builder
            .build(&terrain, |phase, p| {
                if phases.last() != Some(&phase) {
                    phases.push(phase);
                    last = 0.0;
                }
                assert!(p >= last && p <= 1.0);
                last = p;
            })
            .unwrap();
        assert_eq!(phases, vec![BuildPhase::Scanning, BuildPhase::Tessellating, BuildPhase::Merging]);

        assert_eq!(
            mesh.role(TileCoord::new(0, 0)),
            Some(&TileRole::Root {
                absorbed: vec![TileCoord::new(0, 1), TileCoord::new(1, 0), TileCoord::new(1, 1)]
            })
        );
        let exported: Vec<_> = mesh.exported_lods().collect();
        assert_eq!(exported.len(), 1);
        let (lod, tile, root) = exported[0];
        assert_eq!((lod, tile.coord), (0, TileCoord::new(0, 0)));
        assert_eq!(root.vertex_count(), 4 * 9);
        assert_eq!(root.triangle_count(), 4 * 8);
    }

    #[test]
    fn test_seams_match_across_tiles_and_lods() {
        let config = TerrainMeshConfig {
            slice_depth: 1,
            lods: vec![
                MeshLodSetting { subdivision: 3, slope_angle_error: 1.0 },
                MeshLodSetting { subdivision: 2, slope_angle_error: 0.0 },
            ],
            min_triangle_area: Some(0.0),
        };
        let terrain = NoiseTerrain::new(TerrainParams { scale: 20.0, ..Default::default() }, bounds(), UVec2::splat(16));
        let mesh = TerrainMeshBuilder::new(config, bounds()).unwrap().build(&terrain, |_, _| {}).unwrap();

        // Coarse LODs of both tiles meet on the seam samples taken at LOD 0
        let left = &mesh.tile(TileCoord::new(0, 0)).unwrap().lods[1];
        let right = &mesh.tile(TileCoord::new(1, 0)).unwrap().lods[1];
        let seam_x = 32.0;
        let on_seam = |lod: &MeshLod| {
            let mut v: Vec<(u32, u32, u32)> = lod
                .positions
                .iter()
                .zip(&lod.normals)
                .filter(|(p, _)| p.x == seam_x)
                .map(|(p, n)| (p.z.to_bits(), p.y.to_bits(), n.y.to_bits()))
                .collect();
            v.sort();
            v
        };
        assert_eq!(on_seam(left), on_seam(right));
        assert_eq!(on_seam(left).len(), 9);
    }
}
