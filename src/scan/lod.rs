//! Drives one scanner per LOD and shares the finest LOD's seams with the rest.

use super::config::MeshLodSetting;
use super::scanner::TerrainScanner;
use crate::core::types::Result;
use crate::core::Error;
use crate::math::Aabb;
use crate::terrain::HeightSampler;

/// Runs the per-LOD scanners in sequence, finest first.
///
/// Only LOD 0 samples borders and blend layers. `end_process` copies its
/// stitched borders and layer sets into the coarser LODs so every LOD of a
/// tile meets its neighbors on the same seam.
pub struct LodCoordinator {
    scanners: Vec<TerrainScanner>,
    current: usize,
}

impl LodCoordinator {
    pub fn new(bounds: Aabb, max_x: u32, max_z: u32, settings: &[MeshLodSetting]) -> Result<Self> {
        if settings.is_empty() {
            return Err(Error::Config("no LOD settings".into()));
        }
        let scanners = settings
            .iter()
            .enumerate()
            .map(|(lod, setting)| TerrainScanner::new(bounds, setting, max_x, max_z, lod == 0))
            .collect();
        log::debug!("LOD coordinator: {} LODs over {}x{} tiles", settings.len(), max_x, max_z);
        Ok(Self { scanners, current: 0 })
    }

    pub fn lod_count(&self) -> usize {
        self.scanners.len()
    }

    /// Advance the active scanner by one tile, moving to the next LOD when it completes
    pub fn update(&mut self, sampler: &dyn HeightSampler) {
        let Some(scanner) = self.scanners.get_mut(self.current) else {
            return;
        };
        scanner.update(sampler);
        if scanner.is_done() {
            log::debug!("LOD {} scanned", self.current);
            self.current += 1;
        }
    }

    pub fn is_done(&self) -> bool {
        self.current >= self.scanners.len()
    }

    /// Overall progress in [0, 1]
    pub fn progress(&self) -> f32 {
        let Some(scanner) = self.scanners.get(self.current) else {
            return 1.0;
        };
        (self.current as f32 + scanner.progress()) / self.scanners.len() as f32
    }

    /// Finish every LOD once all of them are scanned.
    ///
    /// LOD 0 is filled and stitched first; each coarser LOD then takes over its
    /// border samples and layer set before being filled.
    pub fn end_process(&mut self) -> Result<()> {
        if !self.is_done() {
            return Err(Error::InvalidState(format!(
                "end_process called at {:.0}% progress",
                self.progress() * 100.0
            )));
        }

        let (detail, coarser) = self
            .scanners
            .split_first_mut()
            .ok_or_else(|| Error::InvalidState("no scanners".into()))?;
        detail.finish()?;

        for scanner in coarser {
            let targets = scanner.trees_mut().cells_mut();
            for (source, target) in detail.trees().cells().iter().zip(targets.iter_mut()) {
                if let (Some(source), Some(target)) = (source, target.as_mut()) {
                    target.share_boundaries_from(source);
                    target.set_ref_texture_index(source.ref_texture_index());
                }
            }
            scanner.finish()?;
        }
        Ok(())
    }

    pub fn scanners(&self) -> &[TerrainScanner] {
        &self.scanners
    }

    pub fn scanners_mut(&mut self) -> &mut [TerrainScanner] {
        &mut self.scanners
    }

    pub fn into_scanners(self) -> Vec<TerrainScanner> {
        self.scanners
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TileCoord;
    use crate::sampler::Border;
    use crate::terrain::{NoiseTerrain, TerrainParams};
    use glam::{UVec2, Vec3};

    fn bounds() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::new(128.0, 64.0, 128.0))
    }

    fn lods() -> Vec<MeshLodSetting> {
        vec![
            MeshLodSetting { subdivision: 3, slope_angle_error: 2.0 },
            MeshLodSetting { subdivision: 1, slope_angle_error: 0.0 },
        ]
    }

    fn run(coordinator: &mut LodCoordinator, sampler: &dyn HeightSampler) {
        while !coordinator.is_done() {
            coordinator.update(sampler);
        }
    }

    #[test]
    fn test_empty_settings_rejected() {
        assert!(matches!(LodCoordinator::new(bounds(), 2, 2, &[]), Err(Error::Config(_))));
    }

    #[test]
    fn test_progress_spans_all_lods() {
        let terrain = NoiseTerrain::new(TerrainParams::default(), bounds(), UVec2::splat(16));
        let mut coordinator = LodCoordinator::new(bounds(), 2, 2, &lods()).unwrap();
        for _ in 0..4 {
            coordinator.update(&terrain);
        }
        assert!(!coordinator.is_done());
        assert_eq!(coordinator.progress(), 0.5);

        run(&mut coordinator, &terrain);
        assert_eq!(coordinator.progress(), 1.0);
        coordinator.update(&terrain);
        assert!(coordinator.is_done());
    }

    #[test]
    fn test_end_process_before_done_fails() {
        let mut coordinator = LodCoordinator::new(bounds(), 2, 2, &lods()).unwrap();
        assert!(matches!(coordinator.end_process(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_coarse_lods_share_finest_borders() {
        let terrain = NoiseTerrain::new(TerrainParams::default(), bounds(), UVec2::splat(16));
        let mut coordinator = LodCoordinator::new(bounds(), 2, 2, &lods()).unwrap();
        run(&mut coordinator, &terrain);
        coordinator.end_process().unwrap();

        let scanners = coordinator.scanners();
        for z in 0..2 {
            for x in 0..2 {
                let coord = TileCoord::new(x, z);
                let fine = scanners[0].tree(coord).unwrap();
                let coarse = scanners[1].tree(coord).unwrap();
                assert_eq!(fine.boundaries(), coarse.boundaries());
                assert_eq!(fine.ref_texture_index(), coarse.ref_texture_index());

                // Border samples close the vertex list of both LODs identically
                let border_count: usize = fine.boundaries().values().map(|v| v.len()).sum();
                let fine_tail = &fine.vertices()[fine.vertices().len() - border_count..];
                let coarse_tail = &coarse.vertices()[coarse.vertices().len() - border_count..];
                assert_eq!(fine_tail, coarse_tail);
                assert_eq!(fine.boundary(Border::Bottom).unwrap().len(), 7);
            }
        }
    }
}
