//! Height-field sources consumed by the scanner

pub mod sampler;
pub use sampler::HeightSampler;

pub mod generator;
pub use generator::{NoiseTerrain, TerrainParams};

pub mod flat;
pub use flat::FlatTerrain;
