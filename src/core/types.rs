//! Core type aliases and re-exports

pub use glam::{
    Vec2, Vec3,
    DVec2,
    IVec2, UVec2,
};

/// Standard Result type for the mesher
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;
