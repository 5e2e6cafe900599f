//! Flat terrain with a painted blend map.
//!
//! Handy for driving the mesher with a known surface: every sample has the same
//! height and an up normal, and blend layers are painted per texel.

use super::sampler::HeightSampler;
use crate::core::types::{UVec2, Vec3};
use crate::sampler::LayerMask;

/// Constant-height surface whose blend map is a per-texel layer index
#[derive(Clone, Debug)]
pub struct FlatTerrain {
    height: f32,
    resolution: UVec2,
    layers: Vec<u8>,
    /// One past the highest layer ever painted
    layer_count: u32,
}

impl FlatTerrain {
    /// Create a flat surface at `height` with every texel painted with layer 0
    pub fn new(height: f32, resolution: UVec2) -> Self {
        let resolution = resolution.max(UVec2::ONE);
        Self {
            height,
            resolution,
            layers: vec![0; (resolution.x * resolution.y) as usize],
            layer_count: 1,
        }
    }

    /// Paint every texel in `[min, max)` with `layer`.
    ///
    /// Layers the scanner cannot track are ignored.
    pub fn paint(&mut self, min: UVec2, max: UVec2, layer: u8) -> &mut Self {
        if layer as u32 >= LayerMask::CAPACITY {
            log::warn!("FlatTerrain: layer {} exceeds {} tracked layers, ignored", layer, LayerMask::CAPACITY);
            return self;
        }
        self.layer_count = self.layer_count.max(layer as u32 + 1);
        let max = max.min(self.resolution);
        for z in min.y..max.y {
            for x in min.x..max.x {
                let idx = (z * self.resolution.x + x) as usize;
                self.layers[idx] = layer;
            }
        }
        self
    }

    /// Layer painted at a texel
    pub fn layer_at(&self, texel_x: u32, texel_z: u32) -> u8 {
        let x = texel_x.min(self.resolution.x - 1);
        let z = texel_z.min(self.resolution.y - 1);
        self.layers[(z * self.resolution.x + x) as usize]
    }
}

impl HeightSampler for FlatTerrain {
    fn sample_height_normal(&self, _x: f32, _z: f32) -> (f32, Vec3) {
        (self.height, Vec3::Y)
    }

    fn blend_resolution(&self) -> UVec2 {
        self.resolution
    }

    fn layer_count(&self) -> u32 {
        self.layer_count
    }

    fn sample_blend_weights(&self, texel_x: u32, texel_z: u32, weights: &mut [f32]) {
        if let Some(w) = weights.get_mut(self.layer_at(texel_x, texel_z) as usize) {
            *w = 1.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_sample() {
        let terrain = FlatTerrain::new(3.0, UVec2::new(4, 4));
        assert_eq!(terrain.sample_height_normal(12.0, -7.0), (3.0, Vec3::Y));
        assert_eq!(terrain.layer_count(), 1);
        let mut w = [0.0; 1];
        terrain.sample_blend_weights(0, 0, &mut w);
        assert_eq!(w, [1.0]);
    }

    #[test]
    fn test_paint_region() {
        let mut terrain = FlatTerrain::new(0.0, UVec2::new(4, 4));
        terrain.paint(UVec2::new(2, 0), UVec2::new(4, 4), 1);
        assert_eq!(terrain.layer_at(1, 3), 0);
        assert_eq!(terrain.layer_at(2, 0), 1);
        assert_eq!(terrain.layer_count(), 2);
        let mut w = [0.0; 2];
        terrain.sample_blend_weights(3, 3, &mut w);
        assert_eq!(w, [0.0, 1.0]);
    }

    #[test]
    fn test_paint_high_layer() {
        let mut terrain = FlatTerrain::new(0.0, UVec2::new(2, 2));
        terrain.paint(UVec2::ZERO, UVec2::ONE, 9);
        assert_eq!(terrain.layer_count(), 10);
        let mut w = vec![0.0; 10];
        terrain.sample_blend_weights(0, 0, &mut w);
        assert_eq!(w[9], 1.0);
        assert_eq!(w.iter().sum::<f32>(), 1.0);
    }

    #[test]
    fn test_paint_out_of_range_layer_ignored() {
        let mut terrain = FlatTerrain::new(0.0, UVec2::new(2, 2));
        terrain.paint(UVec2::ZERO, UVec2::new(2, 2), 40);
        assert_eq!(terrain.layer_at(0, 0), 0);
        assert_eq!(terrain.layer_count(), 1);
    }
}
