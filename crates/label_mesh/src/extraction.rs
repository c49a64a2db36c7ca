//! Surface extraction: scalar fields in, triangle meshes out.
//!
//! The extraction algorithm is a seam. [`SurfaceNetsExtractor`] is the
//! default implementation, backed by `fast-surface-nets`; tests and embedders
//! can substitute their own [`SurfaceExtractor`].
//!
//! # Sampling
//!
//! ```text
//!   border   cells covering the bounding box    border
//!  ┌──────┬──────┬──────┬─ ... ─┬──────┬──────┐
//!  │  0   │  1   │  2   │       │  n   │ n+1  │   sample i at start + (i - ½)·cube
//!  └──────┴──────┴──────┴─ ... ─┴──────┴──────┘
//! ```
//!
//! `start` centres the n interior cells on the bounding box. The border
//! samples always lie outside the field, so every surface closes.

use fast_surface_nets::ndshape::{RuntimeShape, Shape};
use fast_surface_nets::{surface_nets, SurfaceNetsBuffer};
use glam::Vec3;

use crate::error::ExtractionError;
use crate::field::LabelFieldAdaptor;
use crate::types::{Aabb, Label, Mesh};
use crate::volume::LabelVolume;

/// Default cap on sampling grid size (64M samples, 256 MiB of f32).
pub const DEFAULT_SAMPLE_LIMIT: u64 = 1 << 26;

/// A scalar field over a bounded region of world space.
pub trait ScalarField: Sync {
  fn bounding_box(&self) -> Aabb;

  fn value_at(&self, point: Vec3) -> f32;
}

/// Acceptance predicate: a sample is inside the surface when its value is
/// strictly greater than the threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcceptAbove(pub f32);

impl AcceptAbove {
  #[inline]
  pub fn accepts(self, value: f32) -> bool {
    value > self.0
  }
}

/// Isosurface extraction algorithm.
///
/// Implementations must be deterministic for a fixed field and cube size and
/// safe to call from many threads at once.
pub trait SurfaceExtractor: Send + Sync {
  fn extract_surface(
    &self,
    field: &dyn ScalarField,
    accept: AcceptAbove,
    cube_size: Vec3,
  ) -> Result<Mesh, ExtractionError>;
}

/// Run one extraction of `label` at `cube_size`.
///
/// Cells are accepted where the label field is strictly greater than zero,
/// i.e. voxels holding `label`. Meshes with dangling indices are rejected.
pub fn extract<V: LabelVolume + ?Sized>(
  volume: &V,
  label: Label,
  cube_size: Vec3,
  extractor: &dyn SurfaceExtractor,
) -> Result<Mesh, ExtractionError> {
  validate_cube_size(cube_size)?;
  let adaptor = LabelFieldAdaptor::new(volume, label);
  let mesh = extractor.extract_surface(&adaptor, AcceptAbove(0.0), cube_size)?;
  match mesh.invalid_index() {
    Some(index) => Err(ExtractionError::IndexOutOfRange {
      index,
      vertices: mesh.vertex_count(),
    }),
    None => Ok(mesh),
  }
}

fn validate_cube_size(cube_size: Vec3) -> Result<(), ExtractionError> {
  if cube_size.is_finite() && cube_size.cmpgt(Vec3::ZERO).all() {
    Ok(())
  } else {
    Err(ExtractionError::InvalidCubeSize(cube_size.to_array()))
  }
}

/// Surface Nets extraction via the `fast-surface-nets` crate.
#[derive(Clone, Debug)]
pub struct SurfaceNetsExtractor {
  sample_limit: u64,
}

impl Default for SurfaceNetsExtractor {
  fn default() -> Self {
    Self {
      sample_limit: DEFAULT_SAMPLE_LIMIT,
    }
  }
}

impl SurfaceNetsExtractor {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_sample_limit(mut self, limit: u64) -> Self {
    self.sample_limit = limit;
    self
  }

  /// Sampling grid dimensions (including the border) for a box and cube size.
  ///
  /// Computed in `f64`/`u64` so tiny cubes saturate instead of wrapping.
  pub fn grid_dimensions(bounds: &Aabb, cube_size: Vec3) -> [u64; 3] {
    let size = bounds.size().as_dvec3();
    let cells = (size / cube_size.as_dvec3()).ceil().max(glam::DVec3::ONE);
    [cells.x, cells.y, cells.z].map(|c| (c as u64).saturating_add(2))
  }

  /// Grid dimensions checked against the sample limit.
  fn checked_grid(&self, bounds: &Aabb, cube_size: Vec3) -> Result<([u32; 3], u64), ExtractionError> {
    let dims = Self::grid_dimensions(bounds, cube_size);
    let cells = dims.iter().fold(1u64, |acc, &d| acc.saturating_mul(d));
    let too_large = ExtractionError::GridTooLarge {
      cells,
      limit: self.sample_limit,
    };
    if cells > self.sample_limit {
      return Err(too_large);
    }
    match dims.map(u32::try_from) {
      [Ok(x), Ok(y), Ok(z)] => Ok(([x, y, z], cells)),
      _ => Err(too_large),
    }
  }

  /// World position of grid sample 0.
  ///
  /// The interior cells are centred on the box, so a cube larger than the
  /// box still samples its middle.
  fn grid_origin(bounds: &Aabb, dims: [u32; 3], cube_size: Vec3) -> Vec3 {
    let cells = Vec3::new(dims[0] as f32, dims[1] as f32, dims[2] as f32) - 2.0;
    let overhang = cells * cube_size - bounds.size();
    bounds.min - overhang * 0.5 - cube_size * 0.5
  }
}

impl SurfaceExtractor for SurfaceNetsExtractor {
  fn extract_surface(
    &self,
    field: &dyn ScalarField,
    accept: AcceptAbove,
    cube_size: Vec3,
  ) -> Result<Mesh, ExtractionError> {
    validate_cube_size(cube_size)?;

    let bounds = field.bounding_box();
    if !bounds.is_valid() || bounds.size().cmple(Vec3::ZERO).any() {
      return Err(ExtractionError::EmptyField);
    }

    let (dims, cells) = self.checked_grid(&bounds, cube_size)?;

    let shape = RuntimeShape::<u32, 3>::new(dims);
    let origin = Self::grid_origin(&bounds, dims, cube_size);

    let mut sdf = vec![1.0f32; cells as usize];
    for z in 1..dims[2] - 1 {
      for y in 1..dims[1] - 1 {
        for x in 1..dims[0] - 1 {
          let point = origin + Vec3::new(x as f32, y as f32, z as f32) * cube_size;
          if accept.accepts(field.value_at(point)) {
            sdf[shape.linearize([x, y, z]) as usize] = -1.0;
          }
        }
      }
    }

    let mut buffer = SurfaceNetsBuffer::default();
    surface_nets(
      &sdf,
      &shape,
      [0; 3],
      [dims[0] - 1, dims[1] - 1, dims[2] - 1],
      &mut buffer,
    );

    Ok(mesh_from_buffer(buffer, origin, cube_size))
  }
}

/// Convert grid-space surface nets output to a world-space mesh.
fn mesh_from_buffer(buffer: SurfaceNetsBuffer, origin: Vec3, cube_size: Vec3) -> Mesh {
  let mut bounds = Aabb::empty();
  let positions: Vec<Vec3> = buffer
    .positions
    .iter()
    .map(|p| {
      let world = origin + Vec3::from_array(*p) * cube_size;
      bounds.encapsulate(world);
      world
    })
    .collect();

  // Grid-space normals are scaled per axis before normalizing.
  let normals = buffer
    .normals
    .iter()
    .map(|n| (Vec3::from_array(*n) / cube_size).normalize_or_zero())
    .collect();

  Mesh {
    positions,
    normals,
    indices: buffer.indices,
    bounds,
  }
}

#[cfg(test)]
#[path = "extraction_test.rs"]
mod extraction_test;
