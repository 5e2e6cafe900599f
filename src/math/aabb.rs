//! Axis-aligned bounding box of the terrain volume

use crate::core::types::{Vec2, Vec3};

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Get center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get size (max - min)
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Horizontal footprint (x, z) of the box
    pub fn size_xz(&self) -> Vec2 {
        let size = self.size();
        Vec2::new(size.x, size.z)
    }

    /// Check if point is inside AABB
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y &&
        p.z >= self.min.z && p.z <= self.max.z
    }

    /// Clamp a horizontal position into the footprint
    pub fn clamp_xz(&self, x: f32, z: f32) -> (f32, f32) {
        (x.clamp(self.min.x, self.max.x), z.clamp(self.min.z, self.max.z))
    }

    /// Map a horizontal world position to [0, 1]² over the footprint
    pub fn normalized_xz(&self, x: f32, z: f32) -> Vec2 {
        let size = self.size_xz();
        Vec2::new((x - self.min.x) / size.x, (z - self.min.z) / size.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_accessors() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert_eq!(aabb.center(), Vec3::splat(0.5));
        assert_eq!(aabb.size(), Vec3::ONE);
        assert_eq!(aabb.size_xz(), Vec2::ONE);
    }

    #[test]
    fn test_contains_point() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(aabb.contains_point(Vec3::splat(0.5)));
        assert!(!aabb.contains_point(Vec3::splat(2.0)));
    }

    #[test]
    fn test_clamp_and_normalize_xz() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::new(200.0, 10.0, 100.0));
        assert_eq!(aabb.clamp_xz(-5.0, 150.0), (0.0, 100.0));
        assert_eq!(aabb.normalized_xz(100.0, 25.0), Vec2::new(0.5, 0.25));
    }
}
