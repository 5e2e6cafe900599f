//! Contract between the mesher and the surface it meshes.

use crate::core::types::{UVec2, Vec3};

/// Source of surface samples.
///
/// Implementations must be deterministic for identical inputs within one run;
/// the scanner samples shared tile borders from both sides and relies on
/// getting the same answer.
pub trait HeightSampler {
    /// World-space surface height and unit normal at horizontal position (x, z).
    fn sample_height_normal(&self, x: f32, z: f32) -> (f32, Vec3);

    /// Resolution of the blend-weight map in texels (width along x, height along z).
    fn blend_resolution(&self) -> UVec2;

    /// Number of blend layers. The scanner tracks at most `LayerMask::CAPACITY`.
    fn layer_count(&self) -> u32;

    /// Write the weight of every layer at a texel into `weights`.
    ///
    /// `weights` holds one zeroed entry per tracked layer and may be shorter
    /// than `layer_count()`. Callers clamp coordinates into `blend_resolution()`.
    fn sample_blend_weights(&self, texel_x: u32, texel_z: u32, weights: &mut [f32]);
}
