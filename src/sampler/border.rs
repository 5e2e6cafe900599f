//! The eight addressable pieces of a tile's border.

use crate::core::types::IVec2;

/// A tile corner or the interior run of a tile edge.
///
/// Edges never include their end points; those belong to the corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Border {
    LeftBottom,
    LeftTop,
    RightTop,
    RightBottom,
    Bottom,
    Top,
    Left,
    Right,
}

impl Border {
    pub const ALL: [Border; 8] = [
        Border::LeftBottom,
        Border::LeftTop,
        Border::RightTop,
        Border::RightBottom,
        Border::Bottom,
        Border::Top,
        Border::Left,
        Border::Right,
    ];

    /// Corners in stitching order
    pub const CORNERS: [Border; 4] = [
        Border::LeftBottom,
        Border::RightBottom,
        Border::LeftTop,
        Border::RightTop,
    ];

    /// Edges in stitching order
    pub const EDGES: [Border; 4] = [Border::Bottom, Border::Left, Border::Right, Border::Top];

    /// The border of the adjacent tile that coincides with this one.
    ///
    /// For corners this is the diagonal neighbor's corner.
    pub fn opposite(&self) -> Border {
        match self {
            Border::LeftBottom => Border::RightTop,
            Border::LeftTop => Border::RightBottom,
            Border::RightTop => Border::LeftBottom,
            Border::RightBottom => Border::LeftTop,
            Border::Bottom => Border::Top,
            Border::Top => Border::Bottom,
            Border::Left => Border::Right,
            Border::Right => Border::Left,
        }
    }

    /// Grid direction of the tile across this border (z grows toward `Top`)
    pub fn neighbor_offset(&self) -> IVec2 {
        match self {
            Border::LeftBottom => IVec2::new(-1, -1),
            Border::LeftTop => IVec2::new(-1, 1),
            Border::RightTop => IVec2::new(1, 1),
            Border::RightBottom => IVec2::new(1, -1),
            Border::Bottom => IVec2::new(0, -1),
            Border::Top => IVec2::new(0, 1),
            Border::Left => IVec2::new(-1, 0),
            Border::Right => IVec2::new(1, 0),
        }
    }

    /// For a corner, the three tiles sharing it and the corner id each of them uses.
    ///
    /// Returns `None` for edges.
    pub fn corner_neighbors(&self) -> Option<[(IVec2, Border); 3]> {
        let n = match self {
            Border::LeftBottom => [
                (IVec2::new(-1, 0), Border::RightBottom),
                (IVec2::new(-1, -1), Border::RightTop),
                (IVec2::new(0, -1), Border::LeftTop),
            ],
            Border::RightBottom => [
                (IVec2::new(1, 0), Border::LeftBottom),
                (IVec2::new(1, -1), Border::LeftTop),
                (IVec2::new(0, -1), Border::RightTop),
            ],
            Border::LeftTop => [
                (IVec2::new(-1, 0), Border::RightTop),
                (IVec2::new(-1, 1), Border::RightBottom),
                (IVec2::new(0, 1), Border::LeftBottom),
            ],
            Border::RightTop => [
                (IVec2::new(1, 0), Border::LeftTop),
                (IVec2::new(1, 1), Border::LeftBottom),
                (IVec2::new(0, 1), Border::RightBottom),
            ],
            Border::Bottom | Border::Top | Border::Left | Border::Right => return None,
        };
        Some(n)
    }

    /// Whether lattice point (x, z) belongs to this border of a lattice whose
    /// last index is `last` (= 2^subdivision).
    pub fn contains(&self, x: u32, z: u32, last: u32) -> bool {
        let inner = |v: u32| v > 0 && v < last;
        match self {
            Border::LeftBottom => x == 0 && z == 0,
            Border::LeftTop => x == 0 && z == last,
            Border::RightTop => x == last && z == last,
            Border::RightBottom => x == last && z == 0,
            Border::Bottom => z == 0 && inner(x),
            Border::Top => z == last && inner(x),
            Border::Left => x == 0 && inner(z),
            Border::Right => x == last && inner(z),
        }
    }

    /// Border owning a lattice point on the ring, `None` for interior points
    pub fn of_lattice_point(x: u32, z: u32, last: u32) -> Option<Border> {
        Border::ALL.into_iter().find(|b| b.contains(x, z, last))
    }
}
