//! A single surface sample

use crate::core::types::{Vec2, Vec3};

/// Sampled surface point: world position, unit normal and terrain-space uv
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl SampleVertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self { position, normal, uv }
    }
}

/// Normalized mean of a set of normals, +Y when they cancel out
pub fn average_normal(normals: impl IntoIterator<Item = Vec3>) -> Vec3 {
    let sum: Vec3 = normals.into_iter().sum();
    let n = sum.normalize_or_zero();
    if n == Vec3::ZERO { Vec3::Y } else { n }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_normal() {
        let n = average_normal([Vec3::X, Vec3::Y]);
        assert!((n - Vec3::new(1.0, 1.0, 0.0).normalize()).length() < 1e-6);
        assert_eq!(average_normal([Vec3::X, -Vec3::X]), Vec3::Y);
        assert_eq!(average_normal(std::iter::empty()), Vec3::Y);
    }
}
