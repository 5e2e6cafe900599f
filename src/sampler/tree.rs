//! Per-tile sample store with border bookkeeping.
//!
//! A `SamplerTree` holds everything the mesher knows about one tile at one LOD:
//! the sampled lattice, the border samples shared with neighbors, which borders
//! have already been reconciled, which blend layers the tile touches, and the
//! tile's merge state.
//!
//! The interior lattice is reduced with a quadtree when a slope error is given:
//! cells whose normals all stay within the error of the cell mean keep only
//! their corners.

use std::collections::{BTreeMap, BTreeSet};

use super::border::Border;
use super::layer_mask::LayerMask;
use super::vertex::{average_normal, SampleVertex};
use crate::core::types::{Result, Vec2};
use crate::core::Error;
use crate::grid::TileCoord;

/// Sampled surface description of one tile at one LOD
#[derive(Debug, Clone)]
pub struct SamplerTree {
    coord: TileCoord,
    subdivision: u32,
    lattice: Vec<SampleVertex>,
    vertices: Vec<SampleVertex>,
    boundaries: BTreeMap<Border, Vec<SampleVertex>>,
    stitched_borders: BTreeSet<Border>,
    ref_texture_index: LayerMask,
    has_merged: bool,
    merged_tiles: BTreeSet<TileCoord>,
    uv_min: Vec2,
    uv_max: Vec2,
}

impl SamplerTree {
    /// Create an empty tree for `coord` covering `[uv_min, uv_max]` of the terrain
    pub fn new(coord: TileCoord, subdivision: u32, uv_min: Vec2, uv_max: Vec2) -> Self {
        Self {
            coord,
            subdivision,
            lattice: Vec::new(),
            vertices: Vec::new(),
            boundaries: BTreeMap::new(),
            stitched_borders: BTreeSet::new(),
            ref_texture_index: LayerMask::EMPTY,
            has_merged: false,
            merged_tiles: BTreeSet::new(),
            uv_min,
            uv_max,
        }
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn subdivision(&self) -> u32 {
        self.subdivision
    }

    /// Last lattice index along each axis (2^subdivision)
    pub fn last(&self) -> u32 {
        1 << self.subdivision
    }

    /// Lattice points per side
    pub fn lattice_side(&self) -> usize {
        self.last() as usize + 1
    }

    pub fn uv_min(&self) -> Vec2 {
        self.uv_min
    }

    pub fn uv_max(&self) -> Vec2 {
        self.uv_max
    }

    /// Store the full sampled lattice (row-major, x fastest, border ring included)
    pub fn set_lattice(&mut self, lattice: Vec<SampleVertex>) -> Result<()> {
        let side = self.lattice_side();
        if lattice.len() != side * side {
            return Err(Error::InvalidState(format!(
                "tile {} expects {} lattice samples, got {}",
                self.coord,
                side * side,
                lattice.len()
            )));
        }
        self.lattice = lattice;
        Ok(())
    }

    pub fn lattice(&self) -> &[SampleVertex] {
        &self.lattice
    }

    /// Record a sample on a border at lattice position (local_x, local_z)
    pub fn add_boundary(
        &mut self,
        local_x: u32,
        local_z: u32,
        border: Border,
        vertex: SampleVertex,
    ) -> Result<()> {
        if !border.contains(local_x, local_z, self.last()) {
            return Err(Error::InvalidBoundary(format!(
                "({}, {}) is not on the {:?} border of tile {} (subdivision {})",
                local_x, local_z, border, self.coord, self.subdivision
            )));
        }
        self.boundaries.entry(border).or_default().push(vertex);
        Ok(())
    }

    pub fn boundary(&self, border: Border) -> Option<&[SampleVertex]> {
        self.boundaries.get(&border).map(|v| v.as_slice())
    }

    pub fn boundaries(&self) -> &BTreeMap<Border, Vec<SampleVertex>> {
        &self.boundaries
    }

    /// Replace this tree's border samples with another tree's.
    ///
    /// Coarser LODs take their borders from the finest LOD so every LOD shares
    /// the same seam.
    pub fn share_boundaries_from(&mut self, source: &SamplerTree) {
        self.boundaries = source.boundaries.clone();
    }

    pub fn is_stitched(&self, border: Border) -> bool {
        self.stitched_borders.contains(&border)
    }

    pub(crate) fn mark_stitched(&mut self, border: Border) {
        self.stitched_borders.insert(border);
    }

    /// Overwrite the single sample of a corner
    pub(crate) fn set_corner(&mut self, corner: Border, vertex: SampleVertex) -> Result<()> {
        let coord = self.coord;
        let slot = self
            .boundaries
            .get_mut(&corner)
            .and_then(|l| l.first_mut())
            .ok_or_else(|| Error::InvalidState(format!("tile {} has no {:?} corner sample", coord, corner)))?;
        *slot = vertex;
        Ok(())
    }

    /// Reconcile one border with the matching border of `neighbor`.
    ///
    /// Samples closer than `merge_distance` are coincident: the neighbor's copy
    /// takes this tile's position and uv, and both get the averaged normal.
    /// A missing neighbor (outer grid edge) is a no-op.
    pub fn stitch_border(
        &mut self,
        border: Border,
        neighbor_border: Border,
        merge_distance: f32,
        neighbor: Option<&mut SamplerTree>,
    ) -> Result<()> {
        let Some(neighbor) = neighbor else {
            return Ok(());
        };
        if self.stitched_borders.contains(&border) {
            return Ok(());
        }

        let coord = self.coord;
        let neighbor_coord = neighbor.coord;
        let own = self.boundaries.get_mut(&border).ok_or_else(|| {
            Error::InvalidState(format!("tile {} has no {:?} boundary", coord, border))
        })?;
        let theirs = neighbor.boundaries.get_mut(&neighbor_border).ok_or_else(|| {
            Error::InvalidState(format!("tile {} has no {:?} boundary", neighbor_coord, neighbor_border))
        })?;

        let mut matched = 0;
        for vertex in own.iter_mut() {
            let nearest = theirs
                .iter_mut()
                .map(|other| (other.position.distance(vertex.position), other))
                .min_by(|a, b| a.0.total_cmp(&b.0));

            if let Some((distance, other)) = nearest {
                if distance <= merge_distance {
                    let normal = average_normal([vertex.normal, other.normal]);
                    vertex.normal = normal;
                    other.normal = normal;
                    other.position = vertex.position;
                    other.uv = vertex.uv;
                    matched += 1;
                }
            }
        }

        if matched != own.len() {
            log::warn!(
                "Stitched {}/{} samples between {} {:?} and {} {:?}",
                matched, own.len(), coord, border, neighbor_coord, neighbor_border
            );
        }

        self.stitched_borders.insert(border);
        neighbor.stitched_borders.insert(neighbor_border);
        Ok(())
    }

    /// Add a blend layer seen anywhere in the tile
    pub fn update_ref_texture_index(&mut self, layer: u32) {
        if !self.ref_texture_index.insert(layer) {
            log::warn!("Tile {}: blend layer {} out of range, ignored", self.coord, layer);
        }
    }

    pub fn ref_texture_index(&self) -> LayerMask {
        self.ref_texture_index
    }

    pub(crate) fn set_ref_texture_index(&mut self, mask: LayerMask) {
        self.ref_texture_index = mask;
    }

    /// True iff exactly one blend layer is referenced
    pub fn is_single_blend(&self) -> bool {
        self.ref_texture_index.count() == 1
    }

    /// Build the interior vertex list from the lattice.
    ///
    /// `slope_angle_error <= 0` keeps every interior sample; otherwise flat
    /// quadtree cells keep only their corners. Border-ring samples are skipped,
    /// they are appended from the border lists by `append_boundaries`.
    pub fn fill_data(&mut self, slope_angle_error: f32) -> Result<()> {
        let side = self.lattice_side();
        if self.lattice.len() != side * side {
            return Err(Error::InvalidState(format!(
                "tile {} filled before its lattice was sampled",
                self.coord
            )));
        }

        let last = self.last();
        let full = slope_angle_error <= 0.0;
        let mut keep = vec![full; side * side];
        if !full {
            let min_cos = slope_angle_error.to_radians().cos();
            self.mark_cell(0, 0, last, min_cos, &mut keep);
        }

        self.vertices.clear();
        for z in 1..last {
            for x in 1..last {
                let idx = z as usize * side + x as usize;
                if keep[idx] {
                    self.vertices.push(self.lattice[idx]);
                }
            }
        }
        Ok(())
    }

    fn mark_cell(&self, x0: u32, z0: u32, size: u32, min_cos: f32, keep: &mut [bool]) {
        if size <= 1 || self.cell_is_flat(x0, z0, size, min_cos) {
            let side = self.lattice_side();
            for (x, z) in [(x0, z0), (x0 + size, z0), (x0, z0 + size), (x0 + size, z0 + size)] {
                keep[z as usize * side + x as usize] = true;
            }
            return;
        }

        let half = size / 2;
        self.mark_cell(x0, z0, half, min_cos, keep);
        self.mark_cell(x0 + half, z0, half, min_cos, keep);
        self.mark_cell(x0, z0 + half, half, min_cos, keep);
        self.mark_cell(x0 + half, z0 + half, half, min_cos, keep);
    }

    fn cell_is_flat(&self, x0: u32, z0: u32, size: u32, min_cos: f32) -> bool {
        let side = self.lattice_side();
        let normals = (z0..=z0 + size).flat_map(|z| {
            (x0..=x0 + size).map(move |x| self.lattice[z as usize * side + x as usize].normal)
        });
        let mean = average_normal(normals.clone());
        normals.into_iter().all(|n| n.dot(mean) >= min_cos)
    }

    /// Append border samples after the interior vertices, in `Border` order
    pub fn append_boundaries(&mut self) {
        for samples in self.boundaries.values() {
            self.vertices.extend_from_slice(samples);
        }
    }

    /// Finalized vertex list consumed by tessellation
    pub fn vertices(&self) -> &[SampleVertex] {
        &self.vertices
    }

    pub fn has_merged(&self) -> bool {
        self.has_merged
    }

    /// Tiles this one absorbed (root) or the root that absorbed it
    pub fn merged_tiles(&self) -> &BTreeSet<TileCoord> {
        &self.merged_tiles
    }

    /// A root has absorbed at least one tile and was not absorbed itself
    pub fn is_merge_root(&self) -> bool {
        !self.has_merged && !self.merged_tiles.is_empty()
    }

    pub(crate) fn record_absorbed(&mut self, tile: TileCoord) {
        self.merged_tiles.insert(tile);
    }

    pub(crate) fn mark_merged_into(&mut self, root: TileCoord) {
        self.has_merged = true;
        self.merged_tiles.insert(root);
    }
}
