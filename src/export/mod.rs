//! Persisting built terrain meshes

pub mod disk_io;

pub use disk_io::{export_terrain, load_manifest, load_mesh_lod, ExportManifest};
