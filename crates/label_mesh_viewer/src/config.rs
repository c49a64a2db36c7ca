//! Viewer configuration: meshing settings plus the synthetic volume.

use anyhow::{Context, Result};
use label_mesh::volume::voxel_count;
use label_mesh::{MeshingConfig, MAX_VOXELS};
use serde::Deserialize;
use std::path::Path;

/// Root configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
	/// Extraction levels, worker threads, export directory.
	pub meshing: MeshingConfig,
	/// Volume and controller selection.
	pub viewer: ViewerSettings,
}

/// Which input controller drives the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
	/// Toggle, show-only entry, hide all, export.
	#[default]
	Mesh,
	/// Toggle, hide all, show all, show largest.
	Segment,
}

/// Synthetic label volume settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
	/// Voxel counts along x, y, z.
	pub dims: [u32; 3],
	/// World size of one voxel per axis.
	pub resolution: [f32; 3],
	/// World position of the volume's minimum corner.
	pub offset: [f32; 3],
	/// Number of labeled blobs (labels 1..=blobs).
	pub blobs: u32,
	/// Seed for blob placement.
	pub seed: u64,
	pub controller: ControllerKind,
}

impl Default for ViewerSettings {
	fn default() -> Self {
		Self {
			dims: [64, 64, 64],
			resolution: [1.0; 3],
			offset: [0.0; 3],
			blobs: 8,
			seed: 7,
			controller: ControllerKind::Mesh,
		}
	}
}

impl ViewerConfig {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config: {}", path.display()))?;
		Self::parse(&content).with_context(|| format!("Invalid config: {}", path.display()))
	}

	/// Parse and validate TOML text.
	pub fn parse(content: &str) -> Result<Self> {
		let config: ViewerConfig = toml::from_str(content).context("Failed to parse config TOML")?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		self.meshing.validate()?;
		let settings = &self.viewer;
		if settings.dims.iter().any(|&d| d == 0) {
			anyhow::bail!("viewer.dims must be non-zero, got {:?}", settings.dims);
		}
		if !matches!(voxel_count(settings.dims), Some(n) if n <= MAX_VOXELS) {
			anyhow::bail!("viewer.dims {:?} exceed {MAX_VOXELS} voxels", settings.dims);
		}
		if settings.resolution.iter().any(|r| !r.is_finite() || *r <= 0.0) {
			anyhow::bail!("viewer.resolution must be positive, got {:?}", settings.resolution);
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_when_empty() {
		let config = ViewerConfig::parse("").unwrap();
		assert_eq!(config.meshing, MeshingConfig::default());
		assert_eq!(config.viewer.dims, [64, 64, 64]);
		assert_eq!(config.viewer.controller, ControllerKind::Mesh);
	}

	#[test]
	fn test_tables() {
		let config = ViewerConfig::parse(
			r#"
			[meshing]
			cube_size = [2.0, 2.0, 4.0]
			level_scales = [4.0, 1.0]
			export_dir = "out"

			[viewer]
			dims = [32, 16, 8]
			blobs = 3
			controller = "segment"
			"#,
		)
		.unwrap();

		assert_eq!(config.meshing.level_scales, vec![4.0, 1.0]);
		assert_eq!(config.viewer.dims, [32, 16, 8]);
		assert_eq!(config.viewer.blobs, 3);
		assert_eq!(config.viewer.controller, ControllerKind::Segment);
	}

	#[test]
	fn test_rejects_bad_values() {
		assert!(ViewerConfig::parse("[viewer]\ndims = [0, 4, 4]").is_err());
		assert!(ViewerConfig::parse("[meshing]\nlevel_scales = [1.0, 2.0]").is_err());
		assert!(ViewerConfig::parse("[viewer]\ncontroller = \"paint\"").is_err());
		assert!(ViewerConfig::parse("[viewer]\ndims = [65536, 65536, 1]").is_err());
	}

	#[test]
	fn test_load_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("viewer.toml");
		std::fs::write(&path, "[viewer]\nblobs = 2\n").unwrap();

		assert_eq!(ViewerConfig::load(&path).unwrap().viewer.blobs, 2);
		assert!(ViewerConfig::load(&dir.path().join("missing.toml")).is_err());
	}
}
