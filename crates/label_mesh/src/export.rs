//! Mesh export sinks.
//!
//! One record per triangle: the x y z of its three corners as nine
//! whitespace-separated numbers, no header.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec3;
use tracing::info;

use crate::error::MeshError;
use crate::types::{Label, Mesh};

/// Destination for exported meshes.
pub trait ExportSink {
  fn write_mesh(&mut self, label: Label, mesh: &Mesh) -> io::Result<()>;
}

/// Write the triangle records of `mesh` to `out`.
pub fn write_triangles(out: &mut impl Write, mesh: &Mesh) -> io::Result<()> {
  for [a, b, c] in mesh.triangles() {
    writeln!(
      out,
      "{} {} {} {} {} {} {} {} {}",
      a.x, a.y, a.z, b.x, b.y, b.z, c.x, c.y, c.z
    )?;
  }
  Ok(())
}

/// Writes `label_<id>.txt` files into a directory, creating it on demand.
#[derive(Clone, Debug)]
pub struct DirectorySink {
  dir: PathBuf,
}

impl DirectorySink {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// File that `label` is exported to.
  pub fn path_for(&self, label: Label) -> PathBuf {
    self.dir.join(format!("label_{}.txt", label.raw()))
  }
}

impl ExportSink for DirectorySink {
  fn write_mesh(&mut self, label: Label, mesh: &Mesh) -> io::Result<()> {
    fs::create_dir_all(&self.dir)?;
    let mut out = BufWriter::new(File::create(self.path_for(label))?);
    write_triangles(&mut out, mesh)?;
    out.flush()
  }
}

/// Keeps exported triangles in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
  pub meshes: Vec<(Label, Vec<[Vec3; 3]>)>,
}

impl MemorySink {
  pub fn new() -> Self {
    Self::default()
  }

  /// Triangles exported for `label`, if any were.
  pub fn triangles_of(&self, label: Label) -> Option<&[[Vec3; 3]]> {
    self.meshes
      .iter()
      .find(|(l, _)| *l == label)
      .map(|(_, tris)| tris.as_slice())
  }
}

impl ExportSink for MemorySink {
  fn write_mesh(&mut self, label: Label, mesh: &Mesh) -> io::Result<()> {
    self.meshes.push((label, mesh.triangles().collect()));
    Ok(())
  }
}

/// What an export wrote.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportReport {
  /// Exported labels with their triangle counts, ordered by label.
  pub exported: Vec<(Label, usize)>,
  /// Visible labels that had no mesh to export.
  pub skipped: Vec<Label>,
}

impl ExportReport {
  pub fn total_triangles(&self) -> usize {
    self.exported.iter().map(|(_, n)| n).sum()
  }

  pub fn triangles_of(&self, label: Label) -> Option<usize> {
    self.exported
      .iter()
      .find(|(l, _)| *l == label)
      .map(|(_, n)| *n)
  }
}

/// Write each mesh in order, stopping at the first failure.
///
/// Labels already written before a failure stay written.
pub(crate) fn write_all(
  sink: &mut dyn ExportSink,
  meshes: &[(Label, Option<Arc<Mesh>>)],
) -> Result<ExportReport, MeshError> {
  let mut report = ExportReport::default();
  for (label, mesh) in meshes {
    let Some(mesh) = mesh else {
      report.skipped.push(*label);
      continue;
    };
    sink.write_mesh(*label, mesh)
      .map_err(|source| MeshError::Export { label: *label, source })?;
    info!(label = %label, triangles = mesh.triangle_count(), "mesh exported");
    report.exported.push((*label, mesh.triangle_count()));
  }
  Ok(report)
}
