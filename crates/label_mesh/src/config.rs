//! MeshingConfig - resolution levels, worker pool and export settings.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::Deserialize;

use crate::error::ConfigError;

/// Default multipliers of the base cube size, coarsest first.
pub const DEFAULT_LEVEL_SCALES: [f32; 6] = [32.0, 16.0, 8.0, 4.0, 2.0, 1.0];

/// Configuration for progressive mesh extraction.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeshingConfig {
  /// Base (finest) cube edge size per axis, in world units.
  pub cube_size: [f32; 3],

  /// Strictly descending multipliers of `cube_size`.
  /// The last entry is the final, highest-quality level.
  pub level_scales: Vec<f32>,

  /// Extraction worker threads. 0 lets rayon pick.
  pub worker_threads: usize,

  /// How many labels the show-largest binding selects.
  pub largest_count: usize,

  /// Target directory for key-triggered exports.
  pub export_dir: PathBuf,
}

impl Default for MeshingConfig {
  fn default() -> Self {
    Self {
      cube_size: [1.0; 3],
      level_scales: DEFAULT_LEVEL_SCALES.to_vec(),
      worker_threads: 0,
      largest_count: 10,
      export_dir: PathBuf::from("meshes"),
    }
  }
}

impl MeshingConfig {
  pub fn new() -> Self {
    Self::default()
  }

  /// Load configuration from a TOML file and validate it.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml_str(&content)
  }

  /// Parse configuration from TOML text and validate it.
  pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
    let config: MeshingConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.cube_size.iter().any(|c| !c.is_finite() || *c <= 0.0) {
      return Err(ConfigError::Invalid(format!(
        "cube_size must be positive, got {:?}",
        self.cube_size
      )));
    }
    if self.level_scales.is_empty() {
      return Err(ConfigError::Invalid("level_scales must not be empty".into()));
    }
    if self.level_scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
      return Err(ConfigError::Invalid(format!(
        "level_scales must be positive, got {:?}",
        self.level_scales
      )));
    }
    if self.level_scales.windows(2).any(|w| w[1] >= w[0]) {
      return Err(ConfigError::Invalid(format!(
        "level_scales must be strictly descending, got {:?}",
        self.level_scales
      )));
    }
    Ok(())
  }

  pub fn with_cube_size(mut self, cube_size: [f32; 3]) -> Self {
    self.cube_size = cube_size;
    self
  }

  pub fn with_level_scales(mut self, scales: Vec<f32>) -> Self {
    self.level_scales = scales;
    self
  }

  pub fn with_worker_threads(mut self, threads: usize) -> Self {
    self.worker_threads = threads;
    self
  }

  pub fn with_largest_count(mut self, k: usize) -> Self {
    self.largest_count = k;
    self
  }

  pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.export_dir = dir.into();
    self
  }

  /// Cube size for every level, coarsest first.
  pub fn level_cube_sizes(&self) -> Vec<Vec3> {
    let base = Vec3::from_array(self.cube_size);
    self.level_scales.iter().map(|&s| base * s).collect()
  }

  /// Cube size of the final level.
  pub fn finest_cube_size(&self) -> Vec3 {
    let scale = self.level_scales.last().copied().unwrap_or(1.0);
    Vec3::from_array(self.cube_size) * scale
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
