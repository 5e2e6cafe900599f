//! Per-LOD terrain scan.
//!
//! The scanner walks the tile grid one tile per `update()` call in row-major
//! order, sampling each tile's lattice and, for the finest LOD, its border
//! samples and blend layers. `finish()` then fills every tile and stitches
//! shared corners and edges so neighboring tiles agree on their seams.

use std::collections::BTreeSet;

use glam::{Vec2, Vec3};

use super::config::MeshLodSetting;
use crate::core::types::Result;
use crate::core::Error;
use crate::grid::{pair_mut, TileCoord, TileGrid};
use crate::math::Aabb;
use crate::sampler::{average_normal, Border, LayerMask, SampleVertex, SamplerTree};
use crate::terrain::HeightSampler;

/// Inward offset for samples on the outer terrain edge, keeps the sampler off the exact rim
pub const BORDER_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Scanning { x: u32, z: u32 },
    Done,
}

/// Scans every tile of the grid at one LOD
pub struct TerrainScanner {
    bounds: Aabb,
    max_x: u32,
    max_z: u32,
    subdivision: u32,
    slope_angle_error: f32,
    grid_size: Vec2,
    stitch_borders: bool,
    trees: TileGrid<Option<SamplerTree>>,
    state: ScanState,
}

impl TerrainScanner {
    /// Create a scanner over `bounds` split into `max_x * max_z` tiles.
    ///
    /// Only the scanner with `stitch_borders` samples borders and blend layers;
    /// the others receive them from it.
    pub fn new(bounds: Aabb, setting: &MeshLodSetting, max_x: u32, max_z: u32, stitch_borders: bool) -> Self {
        let max_x = max_x.max(1);
        let max_z = max_z.max(1);
        let size = bounds.size_xz();
        Self {
            bounds,
            max_x,
            max_z,
            subdivision: setting.subdivision.max(1),
            slope_angle_error: setting.slope_angle_error,
            grid_size: Vec2::new(size.x / max_x as f32, size.y / max_z as f32),
            stitch_borders,
            trees: TileGrid::from_fn(max_x, max_z, |_| None),
            state: ScanState::Scanning { x: 0, z: 0 },
        }
    }

    pub fn max_x(&self) -> u32 {
        self.max_x
    }

    pub fn max_z(&self) -> u32 {
        self.max_z
    }

    pub fn subdivision(&self) -> u32 {
        self.subdivision
    }

    /// World size of one tile (x, z)
    pub fn grid_size(&self) -> Vec2 {
        self.grid_size
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn stitches_borders(&self) -> bool {
        self.stitch_borders
    }

    pub fn is_done(&self) -> bool {
        self.state == ScanState::Done
    }

    /// Fraction of tiles scanned, in [0, 1]
    pub fn progress(&self) -> f32 {
        match self.state {
            ScanState::Scanning { x, z } => {
                (x + z * self.max_x) as f32 / (self.max_x * self.max_z) as f32
            }
            ScanState::Done => 1.0,
        }
    }

    pub fn tree(&self, coord: TileCoord) -> Option<&SamplerTree> {
        self.trees.get(coord).and_then(|t| t.as_ref())
    }

    pub fn tree_mut(&mut self, coord: TileCoord) -> Option<&mut SamplerTree> {
        self.trees.get_mut(coord).and_then(|t| t.as_mut())
    }

    pub fn trees(&self) -> &TileGrid<Option<SamplerTree>> {
        &self.trees
    }

    pub fn trees_mut(&mut self) -> &mut TileGrid<Option<SamplerTree>> {
        &mut self.trees
    }

    pub fn into_trees(self) -> TileGrid<Option<SamplerTree>> {
        self.trees
    }

    /// Scan the next tile. No-op once every tile has been scanned.
    pub fn update(&mut self, sampler: &dyn HeightSampler) {
        let ScanState::Scanning { x, z } = self.state else {
            return;
        };
        let coord = TileCoord::new(x, z);

        if let Err(e) = self.scan_tile(coord, sampler) {
            log::error!("Scan of tile {} failed: {}", coord, e);
        }

        self.state = if x + 1 < self.max_x {
            ScanState::Scanning { x: x + 1, z }
        } else if z + 1 < self.max_z {
            ScanState::Scanning { x: 0, z: z + 1 }
        } else {
            ScanState::Done
        };
    }

    fn scan_tile(&mut self, coord: TileCoord, sampler: &dyn HeightSampler) -> Result<()> {
        let last = 1u32 << self.subdivision;
        let side = last as usize + 1;

        let mut lattice = Vec::with_capacity(side * side);
        for lz in 0..=last {
            for lx in 0..=last {
                lattice.push(self.sample_lattice_point(coord, lx, lz, sampler));
            }
        }

        let layers = if self.stitch_borders {
            self.sample_blend_layers(coord, sampler)
        } else {
            LayerMask::EMPTY
        };

        let uv_step = Vec2::new(1.0 / self.max_x as f32, 1.0 / self.max_z as f32);
        let uv_min = Vec2::new(coord.x as f32, coord.z as f32) * uv_step;
        let subdivision = self.subdivision;
        let stitch_borders = self.stitch_borders;

        let slot = self
            .trees
            .get_mut(coord)
            .ok_or_else(|| Error::InvalidState(format!("tile {} outside the grid", coord)))?;
        let tree = slot.get_or_insert_with(|| SamplerTree::new(coord, subdivision, uv_min, uv_min + uv_step));

        if stitch_borders {
            // Row-major walk keeps each edge's samples in increasing order
            for (i, vertex) in lattice.iter().enumerate() {
                let (x, z) = ((i % side) as u32, (i / side) as u32);
                if let Some(border) = Border::of_lattice_point(x, z, last) {
                    tree.add_boundary(x, z, border, *vertex)?;
                }
            }
            for layer in layers.iter() {
                tree.update_ref_texture_index(layer);
            }
        }

        tree.set_lattice(lattice)?;
        log::trace!("Scanned tile {} ({} layers)", coord, layers.count());
        Ok(())
    }

    /// Sample lattice point (lx, lz) of a tile
    fn sample_lattice_point(&self, coord: TileCoord, lx: u32, lz: u32, sampler: &dyn HeightSampler) -> SampleVertex {
        let last = 1u32 << self.subdivision;
        let steps = last as f32;

        let mut fx = (coord.x as f32 + lx as f32 / steps) * self.grid_size.x;
        let mut fz = (coord.z as f32 + lz as f32 / steps) * self.grid_size.y;
        if lx == 0 && coord.x == 0 {
            fx += BORDER_EPSILON;
        }
        if lx == last && coord.x == self.max_x - 1 {
            fx -= BORDER_EPSILON;
        }
        if lz == 0 && coord.z == 0 {
            fz += BORDER_EPSILON;
        }
        if lz == last && coord.z == self.max_z - 1 {
            fz -= BORDER_EPSILON;
        }

        let (x, z) = self.bounds.clamp_xz(self.bounds.min.x + fx, self.bounds.min.z + fz);
        let (height, normal) = sampler.sample_height_normal(x, z);
        SampleVertex::new(Vec3::new(x, height, z), normal, self.bounds.normalized_xz(x, z))
    }

    /// Layers with non-zero weight anywhere in the tile's texel footprint.
    ///
    /// The footprint is dilated by one texel on every side, the same set of
    /// texels a 3x3 tap around each footprint texel reaches.
    fn sample_blend_layers(&self, coord: TileCoord, sampler: &dyn HeightSampler) -> LayerMask {
        let res = sampler.blend_resolution();
        if res.x == 0 || res.y == 0 {
            return LayerMask::EMPTY;
        }
        let size = self.bounds.size_xz();

        let axis = |tile: u32, grid: f32, extent: f32, texels: u32| -> BTreeSet<u32> {
            let start = tile as f32 * grid / extent * texels as f32;
            let count = ((grid / extent) * texels as f32).ceil().max(1.0) as i64;
            let max = (texels - 1) as f32;
            (-1..=count)
                .map(|k| (start + k as f32).clamp(0.0, max).floor() as u32)
                .collect()
        };
        let xs = axis(coord.x, self.grid_size.x, size.x, res.x);
        let zs = axis(coord.z, self.grid_size.y, size.y, res.y);

        let layer_count = sampler.layer_count();
        if layer_count > LayerMask::CAPACITY {
            log::warn!(
                "Sampler has {} blend layers, only the first {} are tracked",
                layer_count, LayerMask::CAPACITY
            );
        }
        let mut weights = vec![0.0; layer_count.min(LayerMask::CAPACITY) as usize];

        let mut mask = LayerMask::EMPTY;
        for &tz in &zs {
            for &tx in &xs {
                weights.fill(0.0);
                sampler.sample_blend_weights(tx, tz, &mut weights);
                for (layer, weight) in weights.iter().enumerate() {
                    if *weight != 0.0 {
                        mask.insert(layer as u32);
                    }
                }
            }
        }
        mask
    }

    /// Fill every tile and stitch the seams.
    ///
    /// Fails with `InvalidState` until every tile has been scanned. Faults
    /// while stitching a single tile are logged and do not stop the others.
    pub fn finish(&mut self) -> Result<()> {
        if !self.is_done() {
            return Err(Error::InvalidState(format!(
                "scanner finished at {:.0}% progress",
                self.progress() * 100.0
            )));
        }

        for tree in self.trees.cells_mut().iter_mut().flatten() {
            if let Err(e) = tree.fill_data(self.slope_angle_error) {
                log::error!("Fill of tile {} failed: {}", tree.coord(), e);
            }
        }

        if self.stitch_borders {
            let last = 1u32 << self.subdivision;
            let merge_distance = self.grid_size.x.min(self.grid_size.y) / last as f32 / 2.0;
            for index in 0..self.trees.len() {
                let coord = self.trees.coord_of(index);
                for corner in Border::CORNERS {
                    if let Err(e) = self.stitch_corner(coord, corner) {
                        log::error!("Corner stitch {:?} of tile {} failed: {}", corner, coord, e);
                    }
                }
                for edge in Border::EDGES {
                    if let Err(e) = self.stitch_edge(coord, edge, merge_distance) {
                        log::error!("Edge stitch {:?} of tile {} failed: {}", edge, coord, e);
                    }
                }
            }
        }

        let mut vertex_count = 0;
        for tree in self.trees.cells_mut().iter_mut().flatten() {
            tree.append_boundaries();
            vertex_count += tree.vertices().len();
        }
        log::debug!(
            "Filled {} tiles at subdivision {} ({} vertices, stitched: {})",
            self.trees.len(), self.subdivision, vertex_count, self.stitch_borders
        );
        Ok(())
    }

    fn stitch_edge(&mut self, coord: TileCoord, edge: Border, merge_distance: f32) -> Result<()> {
        let center = self
            .trees
            .index_of(coord)
            .ok_or_else(|| Error::InvalidState(format!("tile {} outside the grid", coord)))?;
        let neighbor = self.trees.neighbor_index(coord, edge.neighbor_offset());
        let cells = self.trees.cells_mut();

        let (tree, other) = match neighbor {
            Some(n) => {
                let (tree, other) = pair_mut(cells, center, n);
                (tree, other.as_mut())
            }
            None => (&mut cells[center], None),
        };
        let tree = tree
            .as_mut()
            .ok_or_else(|| Error::InvalidState(format!("tile {} was never scanned", coord)))?;
        tree.stitch_border(edge, edge.opposite(), merge_distance, other)
    }

    /// Give every tile sharing a corner the same corner sample
    fn stitch_corner(&mut self, coord: TileCoord, corner: Border) -> Result<()> {
        let center = self
            .trees
            .index_of(coord)
            .ok_or_else(|| Error::InvalidState(format!("tile {} outside the grid", coord)))?;
        let neighbors = corner
            .corner_neighbors()
            .ok_or_else(|| Error::InvalidState(format!("{:?} is not a corner", corner)))?;

        let cells = self.trees.cells();
        let center_tree = cells[center]
            .as_ref()
            .ok_or_else(|| Error::InvalidState(format!("tile {} was never scanned", coord)))?;
        if center_tree.is_stitched(corner) {
            return Ok(());
        }

        let mut members = vec![(center, corner)];
        for (offset, theirs) in neighbors {
            if let Some(n) = self.trees.neighbor_index(coord, offset) {
                if cells[n].is_some() {
                    members.push((n, theirs));
                }
            }
        }

        let corner_sample = |index: usize, border: Border| {
            cells[index]
                .as_ref()
                .and_then(|t| t.boundary(border))
                .and_then(|l| l.first())
                .copied()
                .ok_or_else(|| {
                    Error::InvalidState(format!(
                        "boundary data missing: {:?} of tile {}",
                        border,
                        self.trees.coord_of(index)
                    ))
                })
        };

        let anchor = corner_sample(center, corner)?;
        let mut normals = Vec::with_capacity(members.len());
        for &(index, border) in &members {
            normals.push(corner_sample(index, border)?.normal);
        }
        let stitched = SampleVertex {
            normal: average_normal(normals),
            ..anchor
        };

        for (index, border) in members {
            if let Some(tree) = self.trees.cells_mut()[index].as_mut() {
                tree.set_corner(border, stitched)?;
                tree.mark_stitched(border);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::FlatTerrain;
    use glam::UVec2;

    fn bounds() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::new(100.0, 10.0, 100.0))
    }

    fn setting(subdivision: u32) -> MeshLodSetting {
        MeshLodSetting { subdivision, slope_angle_error: 0.0 }
    }

    /// Sloped surface with position-dependent normals, so stitching has something to average
    struct Bumpy;

    impl HeightSampler for Bumpy {
        fn sample_height_normal(&self, x: f32, z: f32) -> (f32, Vec3) {
            let h = (x * 0.1).sin() * 3.0 + (z * 0.07).cos() * 2.0;
            let n = Vec3::new(-(x * 0.1).cos() * 0.3, 1.0, (z * 0.07).sin() * 0.14).normalize();
            (h, n)
        }

        fn blend_resolution(&self) -> UVec2 {
            UVec2::new(8, 8)
        }

        fn layer_count(&self) -> u32 {
            3
        }

        fn sample_blend_weights(&self, texel_x: u32, _texel_z: u32, weights: &mut [f32]) {
            let row: [f32; 3] = if texel_x < 4 { [1.0, 0.0, 0.0] } else { [0.0, 0.5, 0.5] };
            weights.copy_from_slice(&row);
        }
    }

    fn scan(scanner: &mut TerrainScanner, sampler: &dyn HeightSampler) {
        while !scanner.is_done() {
            scanner.update(sampler);
        }
    }

    #[test]
    fn test_update_count_reaches_done() {
        let terrain = FlatTerrain::new(0.0, UVec2::splat(4));
        let mut scanner = TerrainScanner::new(bounds(), &setting(1), 3, 2, true);
        assert_eq!(scanner.progress(), 0.0);
        for i in 0..6 {
            assert!(!scanner.is_done(), "done after {} updates", i);
            scanner.update(&terrain);
        }
        assert!(scanner.is_done());
        assert_eq!(scanner.progress(), 1.0);

        scanner.update(&terrain);
        assert!(scanner.is_done());
        assert_eq!(scanner.progress(), 1.0);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let terrain = FlatTerrain::new(0.0, UVec2::splat(4));
        let mut scanner = TerrainScanner::new(bounds(), &setting(1), 4, 4, false);
        let mut last = scanner.progress();
        while !scanner.is_done() {
            scanner.update(&terrain);
            assert!(scanner.progress() >= last);
            assert!(scanner.progress() <= 1.0);
            last = scanner.progress();
        }
    }

    #[test]
    fn test_finish_before_done_is_invalid_state() {
        let terrain = FlatTerrain::new(0.0, UVec2::splat(4));
        let mut scanner = TerrainScanner::new(bounds(), &setting(1), 2, 2, true);
        scanner.update(&terrain);
        assert!(matches!(scanner.finish(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_scanned_tile_layout() {
        let terrain = FlatTerrain::new(2.0, UVec2::splat(4));
        let mut scanner = TerrainScanner::new(bounds(), &setting(2), 2, 2, true);
        scan(&mut scanner, &terrain);

        let tree = scanner.tree(TileCoord::new(1, 0)).unwrap();
        assert_eq!(tree.lattice().len(), 25);
        for corner in Border::CORNERS {
            assert_eq!(tree.boundary(corner).unwrap().len(), 1);
        }
        for edge in Border::EDGES {
            assert_eq!(tree.boundary(edge).unwrap().len(), 3);
        }
        assert_eq!(tree.uv_min(), Vec2::new(0.5, 0.0));
        assert_eq!(tree.uv_max(), Vec2::new(1.0, 0.5));

        // Outer edges are pulled inside the terrain, inner seams are exact
        let rb = tree.boundary(Border::RightBottom).unwrap()[0];
        assert!(rb.position.x <= 100.0 && rb.position.z > 0.0);
        let lb = tree.boundary(Border::LeftBottom).unwrap()[0];
        assert_eq!(lb.position.x, 50.0);
        assert_eq!(lb.position.y, 2.0);
    }

    #[test]
    fn test_full_lattice_vertex_count_after_finish() {
        let terrain = FlatTerrain::new(0.0, UVec2::splat(4));
        let mut scanner = TerrainScanner::new(bounds(), &setting(1), 2, 2, true);
        scan(&mut scanner, &terrain);
        scanner.finish().unwrap();
        for (_, tree) in scanner.trees().iter() {
            assert_eq!(tree.as_ref().unwrap().vertices().len(), 9);
        }
    }

    #[test]
    fn test_seams_are_consistent_after_stitching() {
        let mut scanner = TerrainScanner::new(bounds(), &setting(2), 3, 3, true);
        scan(&mut scanner, &Bumpy);
        scanner.finish().unwrap();

        for (coord, tree) in scanner.trees().iter() {
            let tree = tree.as_ref().unwrap();
            for border in Border::ALL {
                let Some(n) = coord.offset(border.neighbor_offset()) else { continue };
                let Some(other) = scanner.tree(n) else { continue };
                let ours = tree.boundary(border).unwrap();
                let theirs = other.boundary(border.opposite()).unwrap();
                for v in ours {
                    assert!(
                        theirs.iter().any(|t| t.position == v.position && t.normal == v.normal),
                        "seam mismatch at {} {:?}", coord, border
                    );
                }
            }
            // Corners shared with orthogonal neighbors too
            for corner in Border::CORNERS {
                let v = tree.boundary(corner).unwrap()[0];
                for (offset, theirs) in corner.corner_neighbors().unwrap() {
                    if let Some(other) = coord.offset(offset).and_then(|c| scanner.tree(c)) {
                        assert_eq!(other.boundary(theirs).unwrap()[0], v);
                    }
                }
                assert!(tree.is_stitched(corner));
            }
        }
    }

    #[test]
    fn test_finish_continues_past_a_broken_tile() {
        let mut scanner = TerrainScanner::new(bounds(), &setting(2), 2, 2, true);
        scan(&mut scanner, &Bumpy);

        // Unsampled tree: its fill and every stitch touching it fail
        let broken = TileCoord::new(1, 1);
        *scanner.trees_mut().get_mut(broken).unwrap() =
            Some(SamplerTree::new(broken, 2, Vec2::splat(0.5), Vec2::ONE));
        scanner.finish().unwrap();

        assert!(scanner.tree(broken).unwrap().vertices().is_empty());
        for coord in [TileCoord::new(0, 0), TileCoord::new(1, 0), TileCoord::new(0, 1)] {
            assert_eq!(scanner.tree(coord).unwrap().vertices().len(), 25);
        }

        // Seams between healthy tiles are still stitched
        let origin = scanner.tree(TileCoord::new(0, 0)).unwrap();
        assert!(origin.is_stitched(Border::Right));
        assert!(origin.is_stitched(Border::Top));
        assert!(origin.is_stitched(Border::LeftBottom));
        assert!(!origin.is_stitched(Border::RightTop));
        assert!(!scanner.tree(TileCoord::new(0, 1)).unwrap().is_stitched(Border::Right));
        assert!(!scanner.tree(TileCoord::new(1, 0)).unwrap().is_stitched(Border::Top));
    }

    #[test]
    fn test_blend_layers_are_dilated() {
        let mut scanner = TerrainScanner::new(bounds(), &setting(1), 2, 2, true);
        scan(&mut scanner, &Bumpy);

        // Tile 0 covers texels 0..4 and reaches texel 4 through dilation
        let left = scanner.tree(TileCoord::new(0, 0)).unwrap();
        assert_eq!(left.ref_texture_index(), LayerMask(0b111));
        assert!(!left.is_single_blend());

        let right = scanner.tree(TileCoord::new(1, 0)).unwrap();
        assert_eq!(right.ref_texture_index(), LayerMask(0b111));
    }

    #[test]
    fn test_layers_past_four_channels_are_tracked() {
        let mut terrain = FlatTerrain::new(0.0, UVec2::splat(8));
        terrain.paint(UVec2::ZERO, UVec2::new(3, 8), 9);
        let mut scanner = TerrainScanner::new(bounds(), &setting(1), 2, 1, true);
        scan(&mut scanner, &terrain);

        // Dilation reaches texel 4, which is still layer 0
        let left = scanner.tree(TileCoord::new(0, 0)).unwrap();
        assert_eq!(left.ref_texture_index(), LayerMask((1 << 9) | 1));
        let right = scanner.tree(TileCoord::new(1, 0)).unwrap();
        assert_eq!(right.ref_texture_index(), LayerMask(1));
        assert!(right.is_single_blend());
    }

    #[test]
    fn test_coarse_scanner_skips_borders_and_layers() {
        let terrain = FlatTerrain::new(0.0, UVec2::splat(4));
        let mut scanner = TerrainScanner::new(bounds(), &setting(1), 2, 2, false);
        scan(&mut scanner, &terrain);
        let tree = scanner.tree(TileCoord::new(0, 0)).unwrap();
        assert!(tree.boundaries().is_empty());
        assert!(tree.ref_texture_index().is_empty());
        assert_eq!(tree.lattice().len(), 9);
    }
}
