use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{self as channel, Receiver};

use super::*;
use crate::error::{ExtractionError, MeshError};
use crate::export::MemorySink;
use crate::extraction::{extract, AcceptAbove, ScalarField};
use crate::presentation::ChannelListener;
use crate::types::Mesh;
use crate::volume::DenseLabelVolume;

const BLOB_A: Label = Label(1);
const BLOB_B: Label = Label(2);
const BLOB_C: Label = Label(3);

/// 24³ volume with two separated spheres and background elsewhere.
fn two_blobs() -> Arc<DenseLabelVolume> {
  let mut volume = DenseLabelVolume::new([24, 24, 24]);
  volume.fill_where(BLOB_A, |p| p.distance(Vec3::new(7.0, 7.0, 7.0)) < 4.5);
  volume.fill_where(BLOB_B, |p| p.distance(Vec3::new(16.0, 16.0, 16.0)) < 5.5);
  Arc::new(volume)
}

/// [`two_blobs`] plus a small third sphere clear of both.
fn three_blobs() -> Arc<DenseLabelVolume> {
  let mut volume = Arc::unwrap_or_clone(two_blobs());
  volume.fill_where(BLOB_C, |p| p.distance(Vec3::new(17.0, 6.0, 6.0)) < 3.5);
  Arc::new(volume)
}

fn test_config() -> MeshingConfig {
  MeshingConfig::new()
    .with_level_scales(vec![4.0, 2.0, 1.0])
    .with_worker_threads(2)
}

/// Surface nets plus an invocation counter.
#[derive(Default)]
struct CountingExtractor {
  inner: SurfaceNetsExtractor,
  calls: AtomicUsize,
}

impl SurfaceExtractor for CountingExtractor {
  fn extract_surface(
    &self,
    field: &dyn ScalarField,
    accept: AcceptAbove,
    cube_size: Vec3,
  ) -> std::result::Result<Mesh, ExtractionError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.inner.extract_surface(field, accept, cube_size)
  }
}

/// Blocks finest-level extractions on a gate once armed.
struct GatedExtractor {
  inner: SurfaceNetsExtractor,
  finest: Vec3,
  armed: AtomicBool,
  gate: Receiver<()>,
}

impl SurfaceExtractor for GatedExtractor {
  fn extract_surface(
    &self,
    field: &dyn ScalarField,
    accept: AcceptAbove,
    cube_size: Vec3,
  ) -> std::result::Result<Mesh, ExtractionError> {
    if cube_size == self.finest && self.armed.load(Ordering::SeqCst) {
      let _ = self.gate.recv();
    }
    self.inner.extract_surface(field, accept, cube_size)
  }
}

/// Fails the coarsest level and panics on the middle one.
struct FlakyExtractor {
  inner: SurfaceNetsExtractor,
}

impl SurfaceExtractor for FlakyExtractor {
  fn extract_surface(
    &self,
    field: &dyn ScalarField,
    accept: AcceptAbove,
    cube_size: Vec3,
  ) -> std::result::Result<Mesh, ExtractionError> {
    if cube_size.x >= 4.0 {
      return Err(ExtractionError::EmptyField);
    }
    if cube_size.x >= 2.0 {
      panic!("extractor blew up");
    }
    self.inner.extract_surface(field, accept, cube_size)
  }
}

fn engine_with(extractor: Arc<dyn SurfaceExtractor>) -> MeshEngine<DenseLabelVolume> {
  MeshEngine::with_parts(two_blobs(), test_config(), extractor, Arc::new(NullListener)).unwrap()
}

fn finest_triangles(label: Label) -> usize {
  extract(&*two_blobs(), label, Vec3::ONE, &SurfaceNetsExtractor::new())
    .unwrap()
    .triangle_count()
}

// =============================================================================
// Selection
// =============================================================================

#[test]
fn test_pick_background_does_nothing() {
  let engine = MeshEngine::new(two_blobs(), test_config()).unwrap();

  assert_eq!(engine.pick(Vec3::new(0.5, 23.5, 0.5)), None);
  assert_eq!(engine.pick(Vec3::new(-5.0, 1.0, 1.0)), None);
  assert_eq!(engine.toggle(Label::BACKGROUND), Toggle::Ignored);

  assert!(engine.live_labels().is_empty());
  assert_eq!(engine.extraction_count(), 0);
}

#[test]
fn test_pick_resolves_label_and_toggles() {
  let engine = MeshEngine::new(two_blobs(), test_config()).unwrap();

  let (label, toggle) = engine.pick(Vec3::new(7.2, 6.9, 7.0)).unwrap();
  assert_eq!(label, BLOB_A);
  assert_eq!(toggle, Toggle::Shown(RequestOutcome::Started { levels: 3 }));
  assert_eq!(engine.live_labels(), vec![BLOB_A]);

  engine.drain();
}

#[test]
fn test_double_toggle_restores_membership() {
  let engine = MeshEngine::new(two_blobs(), test_config()).unwrap();

  assert!(matches!(engine.toggle(BLOB_B), Toggle::Shown(_)));
  assert_eq!(engine.toggle(BLOB_B), Toggle::Hidden);
  assert!(!engine.store().is_visible(BLOB_B));

  engine.drain();
}

#[test]
fn test_cache_survives_hide_without_reextraction() {
  let extractor = Arc::new(CountingExtractor::default());
  let engine = engine_with(extractor.clone());

  engine.toggle(BLOB_A);
  engine.drain();
  assert_eq!(extractor.calls.load(Ordering::SeqCst), 3);

  assert_eq!(engine.toggle(BLOB_A), Toggle::Hidden);
  assert_eq!(engine.toggle(BLOB_A), Toggle::Shown(RequestOutcome::Cached));
  engine.drain();

  assert_eq!(extractor.calls.load(Ordering::SeqCst), 3);
  let snapshot = engine.snapshot();
  assert_eq!(snapshot.labels().collect::<Vec<_>>(), vec![BLOB_A]);
  assert_eq!(snapshot.total_triangles(), finest_triangles(BLOB_A));
}

#[test]
fn test_hidden_label_still_cached_on_completion() {
  let engine = MeshEngine::new(two_blobs(), test_config()).unwrap();

  engine.toggle(BLOB_B);
  engine.toggle(BLOB_B);
  engine.drain();

  assert!(engine.live_labels().is_empty());
  assert!(engine.store().cached_vertex_count(BLOB_B).is_some_and(|n| n > 0));
}

#[test]
fn test_concurrent_toggles_on_distinct_labels() {
  let mut volume = DenseLabelVolume::new([32, 8, 8]);
  for i in 0..8u32 {
    let x0 = (i * 4) as f32;
    volume.fill_where(Label(u64::from(i) + 1), |p| p.x > x0 && p.x < x0 + 3.0 && p.y < 4.0);
  }
  let engine = MeshEngine::new(Arc::new(volume), test_config()).unwrap();

  std::thread::scope(|s| {
    for i in 1..=8u64 {
      let engine = &engine;
      s.spawn(move || engine.toggle(Label(i)));
    }
  });

  assert_eq!(engine.live_labels().len(), 8);
  engine.drain();
  assert_eq!(engine.snapshot().meshes.len(), 8);
}

#[test]
fn test_show_only_replaces_live_set() {
  let engine = MeshEngine::new(two_blobs(), test_config()).unwrap();

  engine.show(BLOB_A);
  assert!(engine.show_only(BLOB_B).started_extraction());
  assert_eq!(engine.live_labels(), vec![BLOB_B]);

  assert_eq!(engine.show_only(Label::BACKGROUND), RequestOutcome::Background);
  assert_eq!(engine.live_labels(), vec![BLOB_B]);

  engine.drain();
}

#[test]
fn test_show_is_idempotent_while_in_flight() {
  let extractor = Arc::new(CountingExtractor::default());
  let engine = engine_with(extractor.clone());

  engine.show(BLOB_A);
  let again = engine.show(BLOB_A);
  assert!(matches!(again, RequestOutcome::InFlight | RequestOutcome::Cached));

  engine.drain();
  assert_eq!(extractor.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_show_all_and_largest() {
  let engine = MeshEngine::new(two_blobs(), test_config()).unwrap();

  assert_eq!(engine.show_largest(1), vec![BLOB_B]);
  assert_eq!(engine.live_labels(), vec![BLOB_B]);

  assert_eq!(engine.hide_all(), 1);
  assert_eq!(engine.show_all(), vec![BLOB_A, BLOB_B]);
  assert_eq!(engine.live_labels(), vec![BLOB_A, BLOB_B]);

  engine.drain();
}

// =============================================================================
// Failure isolation
// =============================================================================

#[test]
fn test_failed_levels_do_not_affect_others() {
  let engine = engine_with(Arc::new(FlakyExtractor {
    inner: SurfaceNetsExtractor::new(),
  }));

  engine.toggle(BLOB_A);
  engine.drain();

  let snapshot = engine.snapshot();
  assert_eq!(snapshot.meshes.len(), 1);
  assert_eq!(snapshot.total_triangles(), finest_triangles(BLOB_A));
  assert!(engine.store().pending_labels().is_empty());
}

// =============================================================================
// Notification
// =============================================================================

#[test]
fn test_notifications_track_generation() {
  let (listener, changes) = ChannelListener::new();
  let engine = MeshEngine::with_parts(
    two_blobs(),
    test_config(),
    Arc::new(SurfaceNetsExtractor::new()),
    Arc::new(listener),
  )
  .unwrap();

  engine.toggle(BLOB_A);
  engine.drain();

  // Workers notify after unlocking, so arrival order may interleave.
  let mut generations: Vec<u64> = changes.try_iter().map(|c| c.generation).collect();
  let received = generations.len();
  generations.sort_unstable();
  generations.dedup();

  assert!(received > 0);
  assert_eq!(generations.len(), received, "each generation is announced once");
  assert_eq!(generations.last().copied(), Some(engine.store().generation()));
}

// =============================================================================
// Export
// =============================================================================

#[test]
fn test_export_waits_for_pending_finest_level() {
  let (release, gate) = channel::bounded(0);
  let extractor = Arc::new(GatedExtractor {
    inner: SurfaceNetsExtractor::new(),
    finest: Vec3::ONE,
    armed: AtomicBool::new(false),
    gate,
  });
  let engine = engine_with(extractor.clone());

  // A finishes completely; B's finest level stays blocked.
  engine.toggle(BLOB_A);
  engine.drain();
  extractor.armed.store(true, Ordering::SeqCst);
  engine.toggle(BLOB_B);
  assert_eq!(engine.store().pending_labels(), vec![BLOB_B]);

  let (done_tx, done_rx) = channel::bounded(1);
  std::thread::scope(|s| {
    s.spawn(|| {
      let mut sink = MemorySink::new();
      let report = engine.export_visible(&mut sink);
      let _ = done_tx.send(report);
    });

    assert!(
      done_rx.recv_timeout(Duration::from_millis(150)).is_err(),
      "export returned before the finest level finished"
    );
    release.send(()).unwrap();

    let report = done_rx.recv().unwrap().unwrap();
    assert_eq!(report.triangles_of(BLOB_A), Some(finest_triangles(BLOB_A)));
    assert_eq!(report.triangles_of(BLOB_B), Some(finest_triangles(BLOB_B)));
    assert!(report.skipped.is_empty());
  });

  assert!(engine.store().pending_labels().is_empty());
}

#[test]
fn test_export_ignores_labels_shown_after_capture() {
  let (release, gate) = channel::bounded(0);
  let extractor = Arc::new(GatedExtractor {
    inner: SurfaceNetsExtractor::new(),
    finest: Vec3::ONE,
    armed: AtomicBool::new(true),
    gate,
  });
  let engine = MeshEngine::with_parts(
    three_blobs(),
    test_config(),
    extractor.clone(),
    Arc::new(NullListener),
  )
  .unwrap();

  engine.toggle(BLOB_B);
  assert_eq!(engine.store().pending_labels(), vec![BLOB_B]);

  let (done_tx, done_rx) = channel::bounded(1);
  std::thread::scope(|s| {
    s.spawn(|| {
      let mut sink = MemorySink::new();
      let report = engine.export_visible(&mut sink);
      let _ = done_tx.send(report);
    });

    // Capture takes the pending handle out of the store.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !engine.store().pending_labels().is_empty() {
      assert!(std::time::Instant::now() < deadline, "export never captured");
      std::thread::sleep(Duration::from_millis(1));
    }

    assert!(matches!(engine.toggle(BLOB_C), Toggle::Shown(_)));
    assert_eq!(engine.store().pending_labels(), vec![BLOB_C]);

    // One release for B's finest level, one for C's.
    release.send(()).unwrap();
    release.send(()).unwrap();

    let report = done_rx.recv().unwrap().unwrap();
    assert_eq!(report.triangles_of(BLOB_B), Some(finest_triangles(BLOB_B)));
    assert_eq!(report.triangles_of(BLOB_C), None);
    assert!(!report.skipped.contains(&BLOB_C));
    assert_eq!(report.exported.len(), 1);
  });

  engine.drain();
  assert_eq!(engine.live_labels(), vec![BLOB_B, BLOB_C]);
}

#[test]
fn test_export_excludes_hidden_labels() {
  let engine = MeshEngine::new(two_blobs(), test_config()).unwrap();
  engine.show(BLOB_A);
  engine.show(BLOB_B);
  engine.drain();
  engine.hide(BLOB_A);

  let mut sink = MemorySink::new();
  let report = engine.export_visible(&mut sink).unwrap();

  assert_eq!(report.exported.len(), 1);
  assert!(sink.triangles_of(BLOB_A).is_none());
  assert_eq!(sink.triangles_of(BLOB_B).map(<[_]>::len), Some(finest_triangles(BLOB_B)));
}

#[test]
fn test_export_to_dir_writes_label_files() {
  let dir = tempfile::tempdir().unwrap();
  let config = test_config().with_export_dir(dir.path());
  let engine = MeshEngine::new(two_blobs(), config).unwrap();

  engine.show(BLOB_A);
  let report = engine.export_to_dir().unwrap();

  let text = std::fs::read_to_string(dir.path().join("label_1.txt")).unwrap();
  assert_eq!(text.lines().count(), report.total_triangles());
  assert!(text
    .lines()
    .all(|line| line.split_whitespace().filter_map(|n| n.parse::<f32>().ok()).count() == 9));
}

#[test]
fn test_invalid_config_is_rejected() {
  let config = MeshingConfig::new().with_level_scales(vec![1.0, 2.0]);
  let result = MeshEngine::new(two_blobs(), config);
  assert!(matches!(result, Err(MeshError::Config(_))));
}

#[test]
fn test_shutdown_drains() {
  let extractor = Arc::new(CountingExtractor::default());
  let engine = engine_with(extractor.clone());

  engine.show(BLOB_A);
  engine.show(BLOB_B);
  engine.shutdown();

  assert_eq!(extractor.calls.load(Ordering::SeqCst), 6);
}
