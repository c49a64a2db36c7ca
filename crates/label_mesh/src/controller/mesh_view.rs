//! Mesh view controller: browse individual label meshes.

use std::sync::Arc;

use tracing::error;

use super::{Controller, Entry, InputEvent, Key, Outcome};
use crate::engine::MeshEngine;
use crate::volume::LabelVolume;

/// Keys:
/// - `I`: enter a label to toggle
/// - `Shift+I`: enter a label to show alone
/// - `C`: hide all
/// - `E`: export visible meshes to the configured directory
pub struct MeshViewController<V: LabelVolume + ?Sized + 'static> {
  engine: Arc<MeshEngine<V>>,
  entry: Option<Entry>,
}

impl<V: LabelVolume + ?Sized + 'static> MeshViewController<V> {
  pub fn new(engine: Arc<MeshEngine<V>>) -> Self {
    Self { engine, entry: None }
  }

  pub fn engine(&self) -> &MeshEngine<V> {
    &self.engine
  }

  fn export(&self) -> Outcome {
    match self.engine.export_to_dir() {
      Ok(report) => Outcome::Exported(report),
      Err(err) => {
        error!(%err, "export failed");
        Outcome::Failed(err)
      }
    }
  }
}

impl<V: LabelVolume + ?Sized + 'static> Controller for MeshViewController<V> {
  fn handle(&mut self, event: InputEvent) -> Outcome {
    match event {
      InputEvent::PointSelected(point) => super::pick(self.engine(), point),
      InputEvent::LabelEntered(text) => {
        let entry = self.entry.take().unwrap_or_default();
        super::enter_label(self.engine(), &text, entry)
      }
      InputEvent::KeyPressed { key, modifiers } => match key {
        Key::I => {
          let entry = if modifiers.shift { Entry::ShowOnly } else { Entry::Toggle };
          self.entry = Some(entry);
          super::prompt(entry)
        }
        Key::C => super::hide_all(self.engine()),
        Key::E => self.export(),
        _ => Outcome::Ignored,
      },
    }
  }
}
