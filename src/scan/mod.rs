//! Tile scanning and per-LOD coordination

pub mod config;
pub mod lod;
pub mod scanner;

pub use config::{MeshLodSetting, TerrainMeshConfig, MAX_SLICE_DEPTH, MAX_SUBDIVISION};
pub use lod::LodCoordinator;
pub use scanner::{TerrainScanner, BORDER_EPSILON};
