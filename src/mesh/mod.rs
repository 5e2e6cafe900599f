//! Tessellation and merging of tile meshes

pub mod data;
pub mod delaunay;
pub mod merge;
pub mod tessellation;

pub use data::{MeshLod, PackedVertex, TileMesh, TileRole};
pub use merge::{merge_tiles, MERGE_ORDER};
pub use tessellation::{tessellate, TessellationJob};
