//! Tilemesh - tiled multi-LOD terrain mesh generation

pub mod core;
pub mod math;
pub mod grid;
pub mod terrain;
pub mod sampler;
pub mod scan;
pub mod mesh;
pub mod pipeline;
pub mod export;
