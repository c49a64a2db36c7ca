//! Error types for label meshing.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Label;

/// Malformed label id entered by the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid label '{input}': {reason}")]
pub struct ParseLabelError {
  /// The rejected text, as entered.
  pub input: String,
  /// Why it was rejected.
  pub reason: &'static str,
}

/// Failure of a spawned executor task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
  /// The task body panicked; the payload message is kept when it was a string.
  #[error("task panicked: {0}")]
  Panicked(String),

  /// The task was dropped before producing a result.
  #[error("task dropped before completion")]
  Disconnected,
}

/// A single resolution level failed to produce a usable mesh.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
  /// Cube edge sizes must be finite and strictly positive.
  #[error("invalid cube size [{}, {}, {}]", .0[0], .0[1], .0[2])]
  InvalidCubeSize([f32; 3]),

  /// The sampling grid for this cube size exceeds the extractor's limit.
  #[error("sampling grid of {cells} cells exceeds limit of {limit}")]
  GridTooLarge { cells: u64, limit: u64 },

  /// The field's bounding box is empty or inverted.
  #[error("field bounding box is empty")]
  EmptyField,

  /// The extractor returned a triangle referencing a missing vertex.
  #[error("triangle index {index} out of range for {vertices} vertices")]
  IndexOutOfRange { index: u32, vertices: usize },

  /// The extraction task itself did not finish.
  #[error(transparent)]
  Task(#[from] TaskError),
}

/// Configuration loading or validation failure.
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("failed to read config file {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config TOML: {0}")]
  Toml(#[from] toml::de::Error),

  #[error("invalid config: {0}")]
  Invalid(String),
}

/// The main error type for label meshing operations.
#[derive(Error, Debug)]
pub enum MeshError {
  #[error(transparent)]
  Parse(#[from] ParseLabelError),

  #[error(transparent)]
  Extraction(#[from] ExtractionError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  /// Export sink could not be written for one label.
  #[error("failed to export label {label}: {source}")]
  Export {
    label: Label,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to build worker pool: {0}")]
  ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A specialized Result type for label meshing operations.
pub type Result<T> = std::result::Result<T, MeshError>;
