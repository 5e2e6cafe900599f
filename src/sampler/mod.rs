//! Per-tile sampled surface records

pub mod border;
pub mod layer_mask;
pub mod tree;
pub mod vertex;

pub use border::Border;
pub use layer_mask::LayerMask;
pub use tree::SamplerTree;
pub use vertex::{average_normal, SampleVertex};
