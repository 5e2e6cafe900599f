//! Tile grid addressing
//!
//! The terrain footprint is split into `max_x * max_z` tiles stored row-major
//! (x varies fastest). Neighbor lookups outside the grid resolve to `None`,
//! which every stitching and merge step treats as "no neighbor".

use serde::{Deserialize, Serialize};

use crate::core::types::IVec2;

/// Integer coordinate of a tile in the grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub z: u32,
}

impl TileCoord {
    pub fn new(x: u32, z: u32) -> Self {
        Self { x, z }
    }

    /// Coordinate shifted by `offset`, or `None` if it would go negative
    pub fn offset(&self, offset: IVec2) -> Option<TileCoord> {
        let x = self.x as i64 + offset.x as i64;
        let z = self.z as i64 + offset.y as i64;
        if x < 0 || z < 0 || x > u32::MAX as i64 || z > u32::MAX as i64 {
            return None;
        }
        Some(TileCoord::new(x as u32, z as u32))
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Arena of per-tile values indexed by grid coordinate
#[derive(Debug, Clone)]
pub struct TileGrid<T> {
    max_x: u32,
    max_z: u32,
    cells: Vec<T>,
}

impl<T> TileGrid<T> {
    /// Create a grid filled by calling `init` for every coordinate in row-major order
    pub fn from_fn(max_x: u32, max_z: u32, mut init: impl FnMut(TileCoord) -> T) -> Self {
        let mut cells = Vec::with_capacity(max_x as usize * max_z as usize);
        for z in 0..max_z {
            for x in 0..max_x {
                cells.push(init(TileCoord::new(x, z)));
            }
        }
        Self { max_x, max_z, cells }
    }

    pub fn max_x(&self) -> u32 {
        self.max_x
    }

    pub fn max_z(&self) -> u32 {
        self.max_z
    }

    /// Number of tiles
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Row-major index of a coordinate, `None` when out of range
    pub fn index_of(&self, coord: TileCoord) -> Option<usize> {
        if coord.x >= self.max_x || coord.z >= self.max_z {
            return None;
        }
        Some(coord.z as usize * self.max_x as usize + coord.x as usize)
    }

    /// Coordinate of a row-major index
    pub fn coord_of(&self, index: usize) -> TileCoord {
        let max_x = self.max_x.max(1) as usize;
        TileCoord::new((index % max_x) as u32, (index / max_x) as u32)
    }

    /// Index of the neighbor of `coord` in direction `offset`
    pub fn neighbor_index(&self, coord: TileCoord, offset: IVec2) -> Option<usize> {
        coord.offset(offset).and_then(|c| self.index_of(c))
    }

    pub fn get(&self, coord: TileCoord) -> Option<&T> {
        self.index_of(coord).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, coord: TileCoord) -> Option<&mut T> {
        self.index_of(coord).map(|i| &mut self.cells[i])
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [T] {
        &mut self.cells
    }

    /// Iterate `(coord, value)` in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (TileCoord, &T)> + '_ {
        self.cells.iter().enumerate().map(|(i, v)| (self.coord_of(i), v))
    }
}

/// Borrow two distinct elements of a slice mutably.
///
/// Panics if `a == b`.
pub fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    assert_ne!(a, b, "pair_mut requires distinct indices");
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_indexing() {
        let grid = TileGrid::from_fn(3, 2, |c| (c.x, c.z));
        assert_eq!(grid.len(), 6);
        assert_eq!(grid.index_of(TileCoord::new(2, 1)), Some(5));
        assert_eq!(grid.coord_of(4), TileCoord::new(1, 1));
        assert_eq!(grid.cells()[1], (1, 0));
    }

    #[test]
    fn test_out_of_range_is_none() {
        let grid = TileGrid::from_fn(2, 2, |_| 0u8);
        assert_eq!(grid.index_of(TileCoord::new(2, 0)), None);
        assert_eq!(grid.neighbor_index(TileCoord::new(0, 0), IVec2::new(-1, 0)), None);
        assert_eq!(grid.neighbor_index(TileCoord::new(0, 0), IVec2::new(1, 1)), Some(3));
    }

    #[test]
    fn test_pair_mut_either_order() {
        let mut v = vec![1, 2, 3];
        {
            let (a, b) = pair_mut(&mut v, 2, 0);
            std::mem::swap(a, b);
        }
        assert_eq!(v, vec![3, 2, 1]);
    }
}
