//! Flood-fill merging of compatible neighboring tiles at LOD 0.
//!
//! Two tiles are compatible when both are single-blend with the same layer, or
//! both are multi-blend. Each unmerged tile, visited in row-major order, grows
//! a region through compatible neighbors and absorbs their LOD 0 geometry.

use glam::IVec2;

use super::data::{TileMesh, TileRole};
use crate::grid::{pair_mut, TileGrid};
use crate::sampler::{LayerMask, SamplerTree};

/// Neighbor visiting order: E, W, NE, N, NW, SW, S, SE
pub const MERGE_ORDER: [IVec2; 8] = [
    IVec2::new(1, 0),
    IVec2::new(-1, 0),
    IVec2::new(1, 1),
    IVec2::new(0, 1),
    IVec2::new(-1, 1),
    IVec2::new(-1, -1),
    IVec2::new(0, -1),
    IVec2::new(1, -1),
];

fn compatible(single: bool, mask: LayerMask, other: &SamplerTree) -> bool {
    other.is_single_blend() == single && (!single || other.ref_texture_index() == mask)
}

/// Merge LOD 0 of `meshes` (indexed like `trees`) and record merge state in `trees`.
///
/// Returns the role of every tile in row-major order.
pub fn merge_tiles(trees: &mut TileGrid<Option<SamplerTree>>, meshes: &mut [TileMesh]) -> Vec<TileRole> {
    if meshes.len() != trees.len() {
        log::warn!(
            "Merge: {} meshes for {} tiles, geometry of unmatched tiles is left in place",
            meshes.len(), trees.len()
        );
    }

    let mut stack = Vec::new();
    for start in 0..trees.len() {
        let Some(root) = trees.cells()[start].as_ref() else {
            continue;
        };
        if root.has_merged() || root.is_merge_root() {
            continue;
        }
        let root_coord = root.coord();
        let single = root.is_single_blend();
        let mask = root.ref_texture_index();

        stack.clear();
        stack.push(start);
        while let Some(current) = stack.pop() {
            let coord = trees.coord_of(current);
            for offset in MERGE_ORDER {
                let Some(n) = trees.neighbor_index(coord, offset) else {
                    continue;
                };
                if n == start {
                    continue;
                }
                let Some(neighbor) = trees.cells_mut()[n].as_mut() else {
                    continue;
                };
                if neighbor.has_merged() || neighbor.is_merge_root() || !compatible(single, mask, neighbor) {
                    continue;
                }

                let absorbed = neighbor.coord();
                neighbor.mark_merged_into(root_coord);
                if let Some(root) = trees.cells_mut()[start].as_mut() {
                    root.record_absorbed(absorbed);
                }
                if start < meshes.len() && n < meshes.len() {
                    let (root_mesh, absorbed_mesh) = pair_mut(meshes, start, n);
                    if let (Some(into), Some(from)) = (root_mesh.lods.first_mut(), absorbed_mesh.lods.first_mut()) {
                        into.absorb(from);
                    }
                }
                log::trace!("Tile {} absorbed into {}", absorbed, root_coord);
                stack.push(n);
            }
        }
    }

    let roles: Vec<TileRole> = trees
        .cells()
        .iter()
        .map(|tree| match tree {
            Some(t) if t.has_merged() => match t.merged_tiles().first() {
                Some(root) => TileRole::Absorbed { root: *root },
                None => TileRole::Standalone,
            },
            Some(t) if t.is_merge_root() => TileRole::Root {
                absorbed: t.merged_tiles().iter().copied().collect(),
            },
            _ => TileRole::Standalone,
        })
        .collect();

    let root_count = roles.iter().filter(|r| matches!(r, TileRole::Root { .. })).count();
    let absorbed_count = roles.iter().filter(|r| r.is_absorbed()).count();
    log::info!("Merged {} tiles into {} roots", absorbed_count, root_count);
    roles
}
