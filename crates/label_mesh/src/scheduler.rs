//! Progressive scheduler: one extraction task per resolution level.
//!
//! ```text
//! request_label(L)
//!   │  (store lock)
//!   ├─ cached?   → show, done
//!   ├─ pending?  → show, finest level already in flight
//!   └─ otherwise → show, spawn levels coarse → fine
//!                    ┌───────────┬───────────┬─ ... ─┬───────────┐
//!                    │ cube ×32  │ cube ×16  │       │ cube ×1   │ ← pending handle
//!                    └─────┬─────┴─────┬─────┴─ ... ─┴─────┬─────┘
//!                          ▼           ▼                   ▼
//!                     MeshStore::merge (any order, monotonic quality)
//! ```
//!
//! Levels are independent; coarse meshes become visible as soon as they are
//! merged. A failed level contributes nothing and is not retried.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glam::Vec3;
use tracing::{debug, warn};
use web_time::Instant;

use crate::cache::{MergeOutcome, MeshStore, StoreState};
use crate::config::MeshingConfig;
use crate::error::{ExtractionError, MeshError, TaskError};
use crate::extraction::{extract, SurfaceExtractor};
use crate::threading::{panic_message, TaskExecutor, TaskHandle, TaskId};
use crate::types::Label;
use crate::volume::LabelVolume;

/// What a request did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
  /// Label 0; nothing shown, nothing extracted.
  Background,
  /// A cached mesh was shown without extraction.
  Cached,
  /// Shown; a previous request's finest level is still running.
  InFlight,
  /// Shown; this many extraction levels were spawned.
  Started { levels: usize },
}

impl RequestOutcome {
  pub fn started_extraction(self) -> bool {
    matches!(self, RequestOutcome::Started { .. })
  }
}

/// Completion record of one extraction level.
#[derive(Clone, Debug)]
pub struct LevelReport {
  pub label: Label,
  /// Index into the level sequence, 0 = coarsest.
  pub level: usize,
  pub cube_size: Vec3,
  pub result: Result<MergeOutcome, ExtractionError>,
  /// Extraction time in microseconds.
  pub extract_us: u64,
}

/// Everything a level task needs, shared with the scheduler.
struct LevelTask<V: LabelVolume + ?Sized> {
  volume: Arc<V>,
  extractor: Arc<dyn SurfaceExtractor>,
  store: Arc<MeshStore>,
  label: Label,
  level: usize,
  cube_size: Vec3,
  finest: bool,
}

/// Spawns the descending sequence of extraction levels for a label.
pub struct ProgressiveScheduler<V: LabelVolume + ?Sized + 'static> {
  volume: Arc<V>,
  extractor: Arc<dyn SurfaceExtractor>,
  store: Arc<MeshStore>,
  executor: TaskExecutor,
  levels: Vec<Vec3>,
  started: Arc<AtomicUsize>,
}

impl<V: LabelVolume + ?Sized + 'static> ProgressiveScheduler<V> {
  /// Build a scheduler with its own worker pool.
  pub fn new(
    volume: Arc<V>,
    extractor: Arc<dyn SurfaceExtractor>,
    store: Arc<MeshStore>,
    config: &MeshingConfig,
  ) -> Result<Self, MeshError> {
    config.validate()?;
    let executor = TaskExecutor::new(config.worker_threads)?;
    Ok(Self {
      volume,
      extractor,
      store,
      executor,
      levels: config.level_cube_sizes(),
      started: Arc::new(AtomicUsize::new(0)),
    })
  }

  /// Cube sizes of every level, coarsest first.
  pub fn levels(&self) -> &[Vec3] {
    &self.levels
  }

  /// Show `label`, extracting it if nothing is cached.
  pub fn request_label(&self, label: Label) -> RequestOutcome {
    self.store.update(|state| self.dispatch(state, label))
  }

  /// Request under an already-held store lock.
  ///
  /// Spawning happens inside the critical section so the finest handle is
  /// registered before its task can try to clear it.
  pub(crate) fn dispatch(&self, state: &mut StoreState, label: Label) -> RequestOutcome {
    if label.is_background() {
      return RequestOutcome::Background;
    }

    state.show(label);
    if state.has_mesh(label) {
      return RequestOutcome::Cached;
    }
    if state.has_pending(label) {
      return RequestOutcome::InFlight;
    }

    let finest = self.levels.len() - 1;
    for (level, &cube_size) in self.levels.iter().enumerate() {
      let handle = self.spawn_level(label, level, cube_size, level == finest);
      if level == finest {
        state.insert_pending(label, handle);
      }
    }
    debug!(%label, levels = self.levels.len(), "extraction started");

    RequestOutcome::Started {
      levels: self.levels.len(),
    }
  }

  fn spawn_level(&self, label: Label, level: usize, cube_size: Vec3, finest: bool) -> TaskHandle<LevelReport> {
    let task = LevelTask {
      volume: Arc::clone(&self.volume),
      extractor: Arc::clone(&self.extractor),
      store: Arc::clone(&self.store),
      label,
      level,
      cube_size,
      finest,
    };
    self.started.fetch_add(1, Ordering::Relaxed);
    self.executor.spawn_with_id(move |id| run_level(task, id))
  }

  /// Block until every spawned level has finished.
  pub fn drain(&self) {
    self.executor.wait_idle();
  }

  /// Levels queued or running.
  pub fn pending_tasks(&self) -> usize {
    self.executor.pending_count()
  }

  /// Total extraction levels spawned since construction.
  pub fn extractions_started(&self) -> usize {
    self.started.load(Ordering::Relaxed)
  }
}

/// Extract one level and merge it (called on worker thread).
fn run_level<V: LabelVolume + ?Sized>(task: LevelTask<V>, id: TaskId) -> LevelReport {
  let LevelTask {
    volume,
    extractor,
    store,
    label,
    level,
    cube_size,
    finest,
  } = task;

  let _span = tracing::info_span!("extract_level", %label, level, finest).entered();

  let start = Instant::now();
  let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
    extract(&*volume, label, cube_size, &*extractor)
  }))
  .unwrap_or_else(|payload| {
    Err(ExtractionError::Task(TaskError::Panicked(panic_message(&*payload))))
  });
  let extract_us = start.elapsed().as_micros() as u64;

  let result = store.update(|state| {
    let merged = extracted.map(|mesh| state.merge(label, mesh));
    if finest {
      state.complete_pending(label, id);
    }
    merged
  });

  match &result {
    Ok(outcome) => debug!(%label, level, extract_us, ?outcome, "level merged"),
    Err(err) => warn!(%label, level, ?cube_size, %err, "extraction level failed"),
  }

  LevelReport {
    label,
    level,
    cube_size,
    result,
    extract_us,
  }
}
