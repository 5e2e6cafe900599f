//! Noise-based procedural height field

use glam::{UVec2, Vec3};
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use super::sampler::HeightSampler;
use crate::math::Aabb;

/// Parameters controlling terrain generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainParams {
    pub seed: u32,
    pub scale: f32,        // Horizontal scale (larger = smoother)
    pub height_scale: f32, // Vertical scale (max height)
    pub octaves: u32,      // FBM octaves (detail levels)
    pub persistence: f32,  // FBM persistence (0.5 typical)
    pub lacunarity: f32,   // FBM lacunarity (2.0 typical)
    pub sea_level: f32,    // Below this the shore layer dominates
    pub snow_line: f32,    // Above this the snow layer dominates
    pub rock_slope: f32,   // Slope (degrees) where rock takes over
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: 12345,
            scale: 100.0,
            height_scale: 64.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            sea_level: 12.0,
            snow_line: 52.0,
            rock_slope: 40.0,
        }
    }
}

/// Blend layers produced by [`NoiseTerrain`], in channel order
pub mod layer {
    pub const SHORE: usize = 0;
    pub const GRASS: usize = 1;
    pub const ROCK: usize = 2;
    pub const SNOW: usize = 3;
    pub const COUNT: usize = 4;
}

/// Procedural terrain using fractal Brownian motion (FBM).
///
/// Blend weights are derived from height and slope so that the scanner sees
/// realistic single-layer and mixed regions.
pub struct NoiseTerrain {
    params: TerrainParams,
    noise: Fbm<Perlin>,
    bounds: Aabb,
    blend_resolution: UVec2,
}

impl NoiseTerrain {
    /// Create a terrain covering `bounds` with a blend map of `blend_resolution` texels
    pub fn new(params: TerrainParams, bounds: Aabb, blend_resolution: UVec2) -> Self {
        let noise = Fbm::<Perlin>::new(params.seed)
            .set_octaves(params.octaves as usize)
            .set_persistence(params.persistence as f64)
            .set_lacunarity(params.lacunarity as f64);

        Self {
            params,
            noise,
            bounds,
            blend_resolution: blend_resolution.max(UVec2::ONE),
        }
    }

    /// Get terrain parameters
    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Get terrain height at world position (x, z)
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let nx = (x / self.params.scale) as f64;
        let nz = (z / self.params.scale) as f64;

        // Noise is in [-1, 1], map to [0, height_scale] above the bounds floor
        let noise_value = self.noise.get([nx, nz]);
        let normalized = ((noise_value + 1.0) / 2.0).clamp(0.0, 1.0);
        self.bounds.min.y + (normalized * self.params.height_scale as f64) as f32
    }

    /// Surface normal from central differences
    pub fn normal_at(&self, x: f32, z: f32) -> Vec3 {
        let eps = (self.params.scale / 256.0).max(0.01);
        let dh_dx = (self.height_at(x + eps, z) - self.height_at(x - eps, z)) / (2.0 * eps);
        let dh_dz = (self.height_at(x, z + eps) - self.height_at(x, z - eps)) / (2.0 * eps);
        Vec3::new(-dh_dx, 1.0, -dh_dz).normalize()
    }

    /// Layer weights at a world position, normalized to sum to 1
    pub fn layer_weights_at(&self, x: f32, z: f32) -> [f32; layer::COUNT] {
        let height = self.height_at(x, z) - self.bounds.min.y;
        let slope = self.normal_at(x, z).dot(Vec3::Y).clamp(-1.0, 1.0).acos().to_degrees();

        let mut weights = [0.0f32; layer::COUNT];
        weights[layer::SHORE] = band(self.params.sea_level - height, 2.0);
        weights[layer::SNOW] = band(height - self.params.snow_line, 2.0);
        weights[layer::ROCK] = band(slope - self.params.rock_slope, 5.0);
        let rest: f32 = weights.iter().sum();
        weights[layer::GRASS] = (1.0 - rest).max(0.0);

        let total: f32 = weights.iter().sum();
        if total > 0.0 {
            for w in &mut weights {
                *w /= total;
            }
        }
        weights
    }
}

/// Ramp from 0 to 1 over `[-width, width]`, with exact zeros outside it
fn band(distance: f32, width: f32) -> f32 {
    if distance <= -width {
        0.0
    } else if distance >= width {
        1.0
    } else {
        (distance + width) / (2.0 * width)
    }
}

impl HeightSampler for NoiseTerrain {
    fn sample_height_normal(&self, x: f32, z: f32) -> (f32, Vec3) {
        (self.height_at(x, z), self.normal_at(x, z))
    }

    fn blend_resolution(&self) -> UVec2 {
        self.blend_resolution
    }

    fn layer_count(&self) -> u32 {
        layer::COUNT as u32
    }

    fn sample_blend_weights(&self, texel_x: u32, texel_z: u32, weights: &mut [f32]) {
        let size = self.bounds.size_xz();
        let res = self.blend_resolution.as_vec2();
        let x = self.bounds.min.x + (texel_x as f32 + 0.5) / res.x * size.x;
        let z = self.bounds.min.z + (texel_z as f32 + 0.5) / res.y * size.y;
        for (out, w) in weights.iter_mut().zip(self.layer_weights_at(x, z)) {
            *out = w;
        }
    }
}
