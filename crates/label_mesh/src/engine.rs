//! MeshEngine - the façade controllers drive.
//!
//! Owns the shared volume, the mesh store and the progressive scheduler.
//! Every visibility change runs as one store update, so a toggle that also
//! starts extraction is atomic with respect to export capture.

use std::sync::Arc;

use glam::Vec3;
use tracing::{debug, info, warn};

use crate::cache::{MeshSetSnapshot, MeshStore};
use crate::config::MeshingConfig;
use crate::error::Result;
use crate::export::{self, DirectorySink, ExportReport, ExportSink};
use crate::extraction::{SurfaceExtractor, SurfaceNetsExtractor};
use crate::presentation::{MeshSetListener, NullListener};
use crate::scheduler::{ProgressiveScheduler, RequestOutcome};
use crate::stats;
use crate::types::Label;
use crate::volume::LabelVolume;

// =============================================================================
// Toggle
// =============================================================================

/// What a toggle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
  /// Background label; nothing changed.
  Ignored,
  /// The label was visible and is now hidden.
  Hidden,
  /// The label was hidden and is now visible.
  Shown(RequestOutcome),
}

// =============================================================================
// MeshEngine<V>
// =============================================================================

/// Progressive mesh extraction and visibility for one label volume.
pub struct MeshEngine<V: LabelVolume + ?Sized + 'static> {
  volume: Arc<V>,
  store: Arc<MeshStore>,
  scheduler: ProgressiveScheduler<V>,
  config: MeshingConfig,
}

impl<V: LabelVolume + ?Sized + 'static> MeshEngine<V> {
  /// Engine with the surface nets extractor and no listener.
  pub fn new(volume: Arc<V>, config: MeshingConfig) -> Result<Self> {
    Self::with_parts(
      volume,
      config,
      Arc::new(SurfaceNetsExtractor::new()),
      Arc::new(NullListener),
    )
  }

  /// Engine with explicit collaborators.
  pub fn with_parts(
    volume: Arc<V>,
    config: MeshingConfig,
    extractor: Arc<dyn SurfaceExtractor>,
    listener: Arc<dyn MeshSetListener>,
  ) -> Result<Self> {
    let store = Arc::new(MeshStore::new(listener));
    let scheduler = ProgressiveScheduler::new(Arc::clone(&volume), extractor, Arc::clone(&store), &config)?;
    info!(
      dims = ?volume.dimensions(),
      levels = scheduler.levels().len(),
      "mesh engine ready"
    );
    Ok(Self {
      volume,
      store,
      scheduler,
      config,
    })
  }

  pub fn volume(&self) -> &V {
    &self.volume
  }

  pub fn store(&self) -> &MeshStore {
    &self.store
  }

  pub fn config(&self) -> &MeshingConfig {
    &self.config
  }

  // -------------------------------------------------------------------------
  // Selection
  // -------------------------------------------------------------------------

  /// Label of the voxel containing `point`, or `None` for background and
  /// points outside the volume.
  pub fn label_at_point(&self, point: Vec3) -> Option<Label> {
    let voxel = self.volume.discrete_coordinates_of(point)?;
    let label = self.volume.label_at(voxel);
    (!label.is_background()).then_some(label)
  }

  /// Resolve `point` to a label and toggle it.
  pub fn pick(&self, point: Vec3) -> Option<(Label, Toggle)> {
    let Some(label) = self.label_at_point(point) else {
      debug!(?point, "pick hit background");
      return None;
    };
    debug!(%label, ?point, "label selected");
    Some((label, self.toggle(label)))
  }

  /// Hide `label` if visible, otherwise show it and extract if uncached.
  pub fn toggle(&self, label: Label) -> Toggle {
    if label.is_background() {
      return Toggle::Ignored;
    }
    let toggle = self.store.update(|state| {
      if state.hide(label) {
        Toggle::Hidden
      } else {
        Toggle::Shown(self.scheduler.dispatch(state, label))
      }
    });
    match toggle {
      Toggle::Hidden => info!(%label, "label hidden"),
      Toggle::Shown(outcome) => info!(%label, ?outcome, "label shown"),
      Toggle::Ignored => {}
    }
    toggle
  }

  /// Show `label`; no-op beyond visibility if it is already cached.
  pub fn show(&self, label: Label) -> RequestOutcome {
    let outcome = self.scheduler.request_label(label);
    if outcome != RequestOutcome::Background {
      info!(%label, ?outcome, "label shown");
    }
    outcome
  }

  /// Hide everything else and show `label`, as one change.
  pub fn show_only(&self, label: Label) -> RequestOutcome {
    if label.is_background() {
      return RequestOutcome::Background;
    }
    let outcome = self.store.update(|state| {
      state.hide_all();
      self.scheduler.dispatch(state, label)
    });
    info!(%label, ?outcome, "showing single label");
    outcome
  }

  pub fn hide(&self, label: Label) -> bool {
    let hidden = self.store.hide(label);
    if hidden {
      info!(%label, "label hidden");
    }
    hidden
  }

  /// Hide every label. Returns how many were visible.
  pub fn hide_all(&self) -> usize {
    let count = self.store.hide_all();
    info!(count, "all labels hidden");
    count
  }

  // -------------------------------------------------------------------------
  // Whole-volume selections
  // -------------------------------------------------------------------------

  /// Show every non-background label present in the volume.
  pub fn show_all(&self) -> Vec<Label> {
    let labels = stats::distinct_labels(&*self.volume);
    self.show_many(&labels);
    info!(count = labels.len(), "showing all labels");
    labels
  }

  /// Show the `k` labels with the most voxels.
  pub fn show_largest(&self, k: usize) -> Vec<Label> {
    let counts = stats::label_voxel_counts(&*self.volume);
    let labels = stats::largest_labels(&counts, k);
    self.show_many(&labels);
    info!(k, shown = ?labels, "showing largest labels");
    labels
  }

  fn show_many(&self, labels: &[Label]) {
    self.store.update(|state| {
      for &label in labels {
        self.scheduler.dispatch(state, label);
      }
    });
  }

  // -------------------------------------------------------------------------
  // Export and lifecycle
  // -------------------------------------------------------------------------

  /// Export every visible mesh at the best quality already in flight.
  ///
  /// Captures the live set and the outstanding finest-level handles in one
  /// step, waits for those handles with no lock held, then writes the
  /// cached meshes. Labels shown after the capture are not exported.
  pub fn export_visible(&self, sink: &mut dyn ExportSink) -> Result<ExportReport> {
    let (labels, handles) = self.store.update(|state| state.capture_for_export());
    debug!(labels = labels.len(), pending = handles.len(), "export captured");

    for handle in handles {
      match handle.wait() {
        Ok(report) => {
          if let Err(err) = report.result {
            warn!(label = %report.label, %err, "finest level failed before export");
          }
        }
        Err(err) => warn!(%err, "finest level task lost before export"),
      }
    }

    let meshes = self.store.cached_meshes(&labels);
    export::write_all(sink, &meshes)
  }

  /// Export visible meshes into the configured directory.
  pub fn export_to_dir(&self) -> Result<ExportReport> {
    let mut sink = DirectorySink::new(self.config.export_dir.clone());
    let report = self.export_visible(&mut sink)?;
    info!(
      dir = %sink.dir().display(),
      exported = report.exported.len(),
      skipped = report.skipped.len(),
      "export finished"
    );
    Ok(report)
  }

  pub fn snapshot(&self) -> MeshSetSnapshot {
    self.store.snapshot()
  }

  pub fn live_labels(&self) -> Vec<Label> {
    self.store.live_labels()
  }

  /// Extraction levels spawned so far.
  pub fn extraction_count(&self) -> usize {
    self.scheduler.extractions_started()
  }

  /// Block until every spawned extraction has finished.
  pub fn drain(&self) {
    self.scheduler.drain();
  }

  /// Drain outstanding work and release the worker pool.
  pub fn shutdown(self) {
    let pending = self.scheduler.pending_tasks();
    if pending > 0 {
      info!(pending, "waiting for extractions before shutdown");
    }
    self.scheduler.drain();
  }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;
