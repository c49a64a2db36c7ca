//! Segment controller: toggle segments, whole-volume selections.

use std::sync::Arc;

use super::{Controller, Entry, InputEvent, Key, Outcome};
use crate::engine::MeshEngine;
use crate::volume::LabelVolume;

/// Keys:
/// - `I`: enter a label to toggle
/// - `C`: hide all
/// - `A`: show every label in the volume
/// - `L`: show the `largest_count` largest labels
pub struct SegmentController<V: LabelVolume + ?Sized + 'static> {
  engine: Arc<MeshEngine<V>>,
}

impl<V: LabelVolume + ?Sized + 'static> SegmentController<V> {
  pub fn new(engine: Arc<MeshEngine<V>>) -> Self {
    Self { engine }
  }

  pub fn engine(&self) -> &MeshEngine<V> {
    &self.engine
  }
}

impl<V: LabelVolume + ?Sized + 'static> Controller for SegmentController<V> {
  fn handle(&mut self, event: InputEvent) -> Outcome {
    match event {
      InputEvent::PointSelected(point) => super::pick(self.engine(), point),
      InputEvent::LabelEntered(text) => super::enter_label(self.engine(), &text, Entry::Toggle),
      InputEvent::KeyPressed { key, .. } => match key {
        Key::I => super::prompt(Entry::Toggle),
        Key::C => super::hide_all(self.engine()),
        Key::A => Outcome::Shown(self.engine.show_all()),
        Key::L => {
          let k = self.engine.config().largest_count;
          Outcome::Shown(self.engine.show_largest(k))
        }
        _ => Outcome::Ignored,
      },
    }
  }
}
