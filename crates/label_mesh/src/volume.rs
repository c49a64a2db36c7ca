//! Label volumes: discrete 3D arrays of label ids with a world mapping.
//!
//! The volume is immutable for the lifetime of a viewing session and is
//! shared read-only by every extraction task.

use fast_surface_nets::ndshape::{RuntimeShape, Shape};
use glam::Vec3;

use crate::types::{Aabb, Label};

/// Read-only access to a discrete label volume.
pub trait LabelVolume: Send + Sync {
  /// Voxel counts along x, y and z.
  fn dimensions(&self) -> [u32; 3];

  /// World-space extent of the volume.
  fn bounding_box(&self) -> Aabb;

  /// Map a world-space point to the voxel containing it.
  ///
  /// Returns `None` for points outside the bounding box.
  fn discrete_coordinates_of(&self, point: Vec3) -> Option<[u32; 3]>;

  /// Label stored at a voxel. Out-of-range voxels read as background.
  fn label_at(&self, voxel: [u32; 3]) -> Label;

  /// Visit every voxel label in z-slice `z`.
  fn for_each_in_slice(&self, z: u32, f: &mut dyn FnMut(Label)) {
    let [dx, dy, dz] = self.dimensions();
    if z >= dz {
      return;
    }
    for y in 0..dy {
      for x in 0..dx {
        f(self.label_at([x, y, z]));
      }
    }
  }
}

/// Element types a dense volume can be built from.
pub trait LabelValue: Copy {
  fn to_label(self) -> Label;
}

macro_rules! impl_label_value_unsigned {
  ($($t:ty),*) => {
    $(
      impl LabelValue for $t {
        #[inline]
        fn to_label(self) -> Label {
          Label(self as u64)
        }
      }
    )*
  };
}

impl_label_value_unsigned!(u8, u16, u32, u64);

impl LabelValue for f32 {
  #[inline]
  fn to_label(self) -> Label {
    (self as f64).to_label()
  }
}

impl LabelValue for f64 {
  /// Only positive integral values below 2^64 name a label. Negative,
  /// fractional and non-finite values read as background, so `7.5` never
  /// aliases label 7.
  #[inline]
  fn to_label(self) -> Label {
    if self > 0.0 && self.fract() == 0.0 && self < u64::MAX as f64 {
      Label(self as u64)
    } else {
      Label::BACKGROUND
    }
  }
}

/// Largest voxel count a [`DenseLabelVolume`] can hold (linear indices are `u32`).
pub const MAX_VOXELS: u64 = u32::MAX as u64;

/// In-memory dense label volume with per-axis voxel resolution and offset.
#[derive(Clone, Debug)]
pub struct DenseLabelVolume {
  dims: [u32; 3],
  labels: Vec<Label>,
  /// World size of one voxel along each axis.
  resolution: Vec3,
  /// World position of the volume's minimum corner.
  offset: Vec3,
}

impl DenseLabelVolume {
  /// Create an all-background volume with unit resolution at the origin.
  ///
  /// # Panics
  /// When the voxel count exceeds [`MAX_VOXELS`]; see [`Self::try_new`].
  pub fn new(dims: [u32; 3]) -> Self {
    match Self::try_new(dims) {
      Some(volume) => volume,
      None => panic!("volume {dims:?} exceeds {MAX_VOXELS} voxels"),
    }
  }

  /// Like [`Self::new`], returning `None` above [`MAX_VOXELS`] voxels.
  pub fn try_new(dims: [u32; 3]) -> Option<Self> {
    let len = voxel_count(dims).filter(|&n| n <= MAX_VOXELS)?;
    Some(Self {
      dims,
      labels: vec![Label::BACKGROUND; len as usize],
      resolution: Vec3::ONE,
      offset: Vec3::ZERO,
    })
  }

  /// Build from raw values in x-fastest order.
  ///
  /// Returns `None` when `values.len()` does not match `dims` or the volume
  /// is too large.
  pub fn from_values<T: LabelValue>(dims: [u32; 3], values: &[T]) -> Option<Self> {
    let mut volume = Self::try_new(dims)?;
    if values.len() != volume.labels.len() {
      return None;
    }
    for (slot, value) in volume.labels.iter_mut().zip(values) {
      *slot = value.to_label();
    }
    Some(volume)
  }

  pub fn with_resolution(mut self, resolution: Vec3) -> Self {
    self.resolution = resolution;
    self
  }

  pub fn with_offset(mut self, offset: Vec3) -> Self {
    self.offset = offset;
    self
  }

  pub fn resolution(&self) -> Vec3 {
    self.resolution
  }

  pub fn offset(&self) -> Vec3 {
    self.offset
  }

  /// Set the label of one voxel. Out-of-range writes are ignored.
  pub fn set(&mut self, voxel: [u32; 3], label: Label) {
    if let Some(idx) = self.index(voxel) {
      self.labels[idx] = label;
    }
  }

  /// Fill every voxel whose centre satisfies `inside` with `label`.
  pub fn fill_where(&mut self, label: Label, inside: impl Fn(Vec3) -> bool) {
    let shape = self.shape();
    for i in 0..self.labels.len() as u32 {
      let voxel = shape.delinearize(i);
      let centre = self.offset
        + (Vec3::new(voxel[0] as f32, voxel[1] as f32, voxel[2] as f32) + 0.5) * self.resolution;
      if inside(centre) {
        self.labels[i as usize] = label;
      }
    }
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  #[inline]
  fn shape(&self) -> RuntimeShape<u32, 3> {
    RuntimeShape::<u32, 3>::new(self.dims)
  }

  #[inline]
  fn index(&self, [x, y, z]: [u32; 3]) -> Option<usize> {
    let [dx, dy, dz] = self.dims;
    if x < dx && y < dy && z < dz {
      Some(self.shape().linearize([x, y, z]) as usize)
    } else {
      None
    }
  }
}

/// Total voxels for `dims`, or `None` on `u64` overflow.
pub fn voxel_count([x, y, z]: [u32; 3]) -> Option<u64> {
  u64::from(x).checked_mul(u64::from(y))?.checked_mul(u64::from(z))
}

impl LabelVolume for DenseLabelVolume {
  fn dimensions(&self) -> [u32; 3] {
    self.dims
  }

  fn bounding_box(&self) -> Aabb {
    let extent = Vec3::new(self.dims[0] as f32, self.dims[1] as f32, self.dims[2] as f32) * self.resolution;
    Aabb::new(self.offset, self.offset + extent)
  }

  fn discrete_coordinates_of(&self, point: Vec3) -> Option<[u32; 3]> {
    if !self.bounding_box().contains(point) {
      return None;
    }
    let local = ((point - self.offset) / self.resolution).floor();
    let voxel = [local.x as u32, local.y as u32, local.z as u32];
    // Float rounding at the max face can land one past the end.
    self.index(voxel).map(|_| voxel)
  }

  #[inline]
  fn label_at(&self, voxel: [u32; 3]) -> Label {
    self.index(voxel)
      .map(|idx| self.labels[idx])
      .unwrap_or(Label::BACKGROUND)
  }

  fn for_each_in_slice(&self, z: u32, f: &mut dyn FnMut(Label)) {
    let [dx, dy, dz] = self.dims;
    if z >= dz {
      return;
    }
    let start = self.shape().linearize([0, 0, z]) as usize;
    let end = start + (dx * dy) as usize;
    for &label in &self.labels[start..end] {
      f(label);
    }
  }
}

#[cfg(test)]
#[path = "volume_test.rs"]
mod volume_test;
