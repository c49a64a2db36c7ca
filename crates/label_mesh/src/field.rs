//! Binary scalar field view of one label in a label volume.

use glam::Vec3;

use crate::extraction::ScalarField;
use crate::types::{Aabb, Label};
use crate::volume::LabelVolume;

/// Binarizes a label volume: `1` where the voxel holds `label`, `0` elsewhere
/// and everywhere outside the volume's bounding box.
pub struct LabelFieldAdaptor<'a, V: LabelVolume + ?Sized> {
  volume: &'a V,
  label: Label,
}

impl<'a, V: LabelVolume + ?Sized> LabelFieldAdaptor<'a, V> {
  pub fn new(volume: &'a V, label: Label) -> Self {
    Self { volume, label }
  }

  pub fn label(&self) -> Label {
    self.label
  }
}

impl<V: LabelVolume + ?Sized> ScalarField for LabelFieldAdaptor<'_, V> {
  fn bounding_box(&self) -> Aabb {
    self.volume.bounding_box()
  }

  #[inline]
  fn value_at(&self, point: Vec3) -> f32 {
    match self.volume.discrete_coordinates_of(point) {
      Some(voxel) if self.volume.label_at(voxel) == self.label => 1.0,
      _ => 0.0,
    }
  }
}
