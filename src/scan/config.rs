//! Mesh build configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::Result;
use crate::core::Error;
use crate::math::Aabb;

/// Finest lattice a tile may be sampled at (2^10 + 1 samples per side)
pub const MAX_SUBDIVISION: u32 = 10;

/// Largest supported slice depth (2^12 tiles per side)
pub const MAX_SLICE_DEPTH: u32 = 12;

/// Sampling settings for one level of detail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshLodSetting {
    /// Tile lattice is (2^subdivision + 1)² samples.
    pub subdivision: u32,
    /// Max normal deviation in degrees for collapsing flat lattice cells; 0 keeps every sample.
    pub slope_angle_error: f32,
}

impl Default for MeshLodSetting {
    fn default() -> Self {
        Self {
            subdivision: 3,
            slope_angle_error: 5.0,
        }
    }
}

/// Configuration for a whole terrain mesh build.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainMeshConfig {
    /// Grid has 2^slice_depth tiles per side.
    pub slice_depth: u32,
    /// LOD settings, finest first.
    pub lods: Vec<MeshLodSetting>,
    /// Triangles below this 2D area are dropped; derived from the finest lattice when unset.
    pub min_triangle_area: Option<f32>,
}

impl Default for TerrainMeshConfig {
    fn default() -> Self {
        Self {
            slice_depth: 2,
            lods: vec![MeshLodSetting::default()],
            min_triangle_area: None,
        }
    }
}

impl TerrainMeshConfig {
    /// Tiles per side
    pub fn grid_size(&self) -> u32 {
        1 << self.slice_depth
    }

    /// Check the configuration before any work is scheduled
    pub fn validate(&self) -> Result<()> {
        if self.lods.is_empty() {
            return Err(Error::Config("no LOD settings".into()));
        }
        if self.slice_depth > MAX_SLICE_DEPTH {
            return Err(Error::Config(format!(
                "slice depth {} exceeds {}", self.slice_depth, MAX_SLICE_DEPTH
            )));
        }
        for (i, lod) in self.lods.iter().enumerate() {
            if lod.subdivision > MAX_SUBDIVISION {
                return Err(Error::Config(format!(
                    "LOD {}: subdivision {} exceeds {}", i, lod.subdivision, MAX_SUBDIVISION
                )));
            }
            if !lod.slope_angle_error.is_finite() || lod.slope_angle_error < 0.0 {
                return Err(Error::Config(format!(
                    "LOD {}: slope angle error must be a non-negative number", i
                )));
            }
        }
        if let Some(area) = self.min_triangle_area {
            if !area.is_finite() || area < 0.0 {
                return Err(Error::Config("min triangle area must be a non-negative number".into()));
            }
        }
        Ok(())
    }

    /// Minimum triangle area for `bounds`.
    ///
    /// Unless overridden, an eighth of the squared edge of the finest lattice cell.
    pub fn min_triangle_area_for(&self, bounds: &Aabb) -> f32 {
        if let Some(area) = self.min_triangle_area {
            return area;
        }
        let max_sub = self.lods.iter().map(|l| l.subdivision).max().unwrap_or(1).max(1);
        let cells = self.grid_size() as f32 * (1u32 << max_sub) as f32;
        let size = bounds.size_xz();
        let edge = size.x.max(size.y) / cells;
        edge * edge / 8.0
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TerrainMeshConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
