//! Core data types: labels, bounding boxes and triangle meshes.

use std::fmt;
use std::str::FromStr;

use glam::Vec3;

use crate::error::ParseLabelError;

/// Identifier of a region in a label volume.
///
/// `Label(0)` is reserved for background and is never extracted or shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(pub u64);

impl Label {
  /// The reserved "no region" label.
  pub const BACKGROUND: Label = Label(0);

  #[inline]
  pub fn is_background(self) -> bool {
    self.0 == 0
  }

  /// Get the raw ID value.
  #[inline]
  pub fn raw(self) -> u64 {
    self.0
  }
}

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<u64> for Label {
  fn from(id: u64) -> Self {
    Label(id)
  }
}

impl FromStr for Label {
  type Err = ParseLabelError;

  /// Accepts unsigned integers and integral decimals such as `7.0`.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let text = s.trim();
    let reject = |reason| ParseLabelError {
      input: s.to_string(),
      reason,
    };

    if text.is_empty() {
      return Err(reject("empty input"));
    }
    if let Ok(id) = text.parse::<u64>() {
      return Ok(Label(id));
    }

    let value: f64 = text.parse().map_err(|_| reject("not a number"))?;
    if !value.is_finite() || value < 0.0 {
      return Err(reject("must be a non-negative number"));
    }
    if value.fract() != 0.0 {
      return Err(reject("must be a whole number"));
    }
    if value > u64::MAX as f64 {
      return Err(reject("out of range"));
    }
    Ok(Label(value as u64))
  }
}

/// Axis-aligned bounding box, half-open: `min <= p < max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
  pub min: Vec3,
  pub max: Vec3,
}

impl Aabb {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: Vec3::splat(f32::INFINITY),
      max: Vec3::splat(f32::NEG_INFINITY),
    }
  }

  pub fn new(min: Vec3, max: Vec3) -> Self {
    Self { min, max }
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: Vec3) {
    self.min = self.min.min(point);
    self.max = self.max.max(point);
  }

  /// Check if AABB is valid (min <= max on all axes).
  pub fn is_valid(&self) -> bool {
    self.min.cmple(self.max).all()
  }

  #[inline]
  pub fn contains(&self, point: Vec3) -> bool {
    point.cmpge(self.min).all() && point.cmplt(self.max).all()
  }

  pub fn size(&self) -> Vec3 {
    if self.is_valid() {
      self.max - self.min
    } else {
      Vec3::ZERO
    }
  }
}

impl Default for Aabb {
  fn default() -> Self {
    Self::empty()
  }
}

/// Triangle mesh produced by surface extraction.
///
/// Vertex count is the quality measure used by the mesh cache.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
  /// Vertex positions in world coordinates.
  pub positions: Vec<Vec3>,

  /// Unit surface normals, parallel to `positions`.
  pub normals: Vec<Vec3>,

  /// Triangle indices (3 indices per triangle).
  pub indices: Vec<u32>,

  /// Bounding box encompassing all vertices.
  pub bounds: Aabb,
}

impl Mesh {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a mesh from positions and indices, computing bounds.
  /// Normals are left empty.
  pub fn from_triangles(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
    let mut bounds = Aabb::empty();
    for &p in &positions {
      bounds.encapsulate(p);
    }
    Self {
      positions,
      normals: Vec::new(),
      indices,
      bounds,
    }
  }

  /// Returns true if no geometry was generated.
  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  pub fn vertex_count(&self) -> usize {
    self.positions.len()
  }

  /// Number of triangles in the mesh.
  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  /// First index that does not name a vertex, if any.
  pub fn invalid_index(&self) -> Option<u32> {
    self.indices.iter().copied().find(|&i| i as usize >= self.positions.len())
  }

  /// Iterate triangles as their three corner positions.
  ///
  /// Triangles with an out-of-range index are skipped.
  pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
    let corner = |i: u32| self.positions.get(i as usize).copied();
    self.indices
      .chunks_exact(3)
      .filter_map(move |tri| Some([corner(tri[0])?, corner(tri[1])?, corner(tri[2])?]))
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
