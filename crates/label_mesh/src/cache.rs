//! MeshStore - the mesh cache and live set behind one lock.
//!
//! ```text
//!              ┌──────────────── Mutex<StoreState> ────────────────┐
//!  merge() ───►│ cache:   Label → Arc<Mesh>   (best mesh so far)   │
//!  show()  ───►│ live:    {Label}             (sent to rendering)  │──► snapshot()
//!  hide()  ───►│ pending: Label → finest-level TaskHandle          │
//!              │ generation                                        │
//!              └───────────────────────────────────────────────────┘
//!                       │ generation bumped
//!                       ▼ (after unlock)
//!                MeshSetListener::mesh_set_changed
//! ```
//!
//! The cache only ever grows: entries are kept for the process lifetime and
//! are bounded by the number of distinct labels ever shown.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::presentation::{MeshSetChanged, MeshSetListener};
use crate::scheduler::LevelReport;
use crate::threading::{TaskHandle, TaskId};
use crate::types::{Label, Mesh};

/// Result of offering a mesh to the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
  /// First mesh for this label.
  Inserted { vertices: usize },
  /// Replaced a mesh with fewer vertices.
  Replaced { vertices: usize, previous: usize },
  /// Not better than the cached mesh; dropped.
  Discarded { vertices: usize, cached: usize },
}

impl MergeOutcome {
  pub fn is_accepted(self) -> bool {
    !matches!(self, MergeOutcome::Discarded { .. })
  }
}

/// Consistent view of the displayed meshes.
#[derive(Clone, Debug, Default)]
pub struct MeshSetSnapshot {
  pub generation: u64,
  /// Live labels with their current best mesh, ordered by label.
  pub meshes: Vec<(Label, Arc<Mesh>)>,
  /// Live labels that have no mesh yet.
  pub waiting: Vec<Label>,
}

impl MeshSetSnapshot {
  pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
    self.meshes.iter().map(|(label, _)| *label)
  }

  pub fn total_triangles(&self) -> usize {
    self.meshes.iter().map(|(_, mesh)| mesh.triangle_count()).sum()
  }
}

/// State guarded by the store lock.
#[derive(Default)]
pub(crate) struct StoreState {
  cache: HashMap<Label, Arc<Mesh>>,
  live: BTreeSet<Label>,
  pending: HashMap<Label, TaskHandle<LevelReport>>,
  generation: u64,
}

impl StoreState {
  fn bump(&mut self) {
    self.generation += 1;
  }

  /// Keep `mesh` if it is the first for `label` or has strictly more
  /// vertices than the cached one.
  pub(crate) fn merge(&mut self, label: Label, mesh: Mesh) -> MergeOutcome {
    let vertices = mesh.vertex_count();
    let outcome = match self.cache.get(&label) {
      None => MergeOutcome::Inserted { vertices },
      Some(cached) if vertices > cached.vertex_count() => MergeOutcome::Replaced {
        vertices,
        previous: cached.vertex_count(),
      },
      Some(cached) => {
        return MergeOutcome::Discarded {
          vertices,
          cached: cached.vertex_count(),
        }
      }
    };

    self.cache.insert(label, Arc::new(mesh));
    if self.live.contains(&label) {
      self.bump();
    }
    outcome
  }

  /// Add `label` to the live set. Returns false if it was already there.
  pub(crate) fn show(&mut self, label: Label) -> bool {
    let added = self.live.insert(label);
    if added {
      self.bump();
    }
    added
  }

  /// Remove `label` from the live set; its cache entry stays.
  pub(crate) fn hide(&mut self, label: Label) -> bool {
    let removed = self.live.remove(&label);
    if removed {
      self.bump();
    }
    removed
  }

  pub(crate) fn hide_all(&mut self) -> usize {
    let count = self.live.len();
    if count > 0 {
      self.live.clear();
      self.bump();
    }
    count
  }

  pub(crate) fn is_visible(&self, label: Label) -> bool {
    self.live.contains(&label)
  }

  pub(crate) fn has_mesh(&self, label: Label) -> bool {
    self.cache.contains_key(&label)
  }

  pub(crate) fn has_pending(&self, label: Label) -> bool {
    self.pending.contains_key(&label)
  }

  pub(crate) fn insert_pending(&mut self, label: Label, handle: TaskHandle<LevelReport>) {
    self.pending.insert(label, handle);
  }

  /// Drop the pending entry for `label` if it still belongs to task `id`.
  pub(crate) fn complete_pending(&mut self, label: Label, id: TaskId) -> bool {
    if self.pending.get(&label).is_some_and(|h| h.id() == id) {
      self.pending.remove(&label);
      true
    } else {
      false
    }
  }

  /// Capture the live set and every pending handle, clearing the pending set.
  pub(crate) fn capture_for_export(&mut self) -> (Vec<Label>, Vec<TaskHandle<LevelReport>>) {
    let live = self.live.iter().copied().collect();
    let handles = self.pending.drain().map(|(_, handle)| handle).collect();
    (live, handles)
  }

  fn snapshot(&self) -> MeshSetSnapshot {
    let mut snapshot = MeshSetSnapshot {
      generation: self.generation,
      ..Default::default()
    };
    for &label in &self.live {
      match self.cache.get(&label) {
        Some(mesh) => snapshot.meshes.push((label, Arc::clone(mesh))),
        None => snapshot.waiting.push(label),
      }
    }
    snapshot
  }
}

/// Thread-safe mesh cache and live set.
pub struct MeshStore {
  state: Mutex<StoreState>,
  listener: Arc<dyn MeshSetListener>,
}

impl MeshStore {
  pub fn new(listener: Arc<dyn MeshSetListener>) -> Self {
    Self {
      state: Mutex::new(StoreState::default()),
      listener,
    }
  }

  fn lock(&self) -> MutexGuard<'_, StoreState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Run `f` under the lock, then notify once if the generation moved.
  pub(crate) fn update<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
    let (result, changed) = {
      let mut state = self.lock();
      let before = state.generation;
      let result = f(&mut state);
      let after = state.generation;
      (result, (after != before).then_some(after))
    };
    if let Some(generation) = changed {
      self.listener.mesh_set_changed(MeshSetChanged { generation });
    }
    result
  }

  /// Offer a mesh for `label` under the monotonic-quality policy.
  pub fn merge(&self, label: Label, mesh: Mesh) -> MergeOutcome {
    self.update(|state| state.merge(label, mesh))
  }

  /// Hide `label`. Returns false if it was not visible.
  pub fn hide(&self, label: Label) -> bool {
    self.update(|state| state.hide(label))
  }

  /// Hide every label, notifying once. Returns how many were hidden.
  pub fn hide_all(&self) -> usize {
    self.update(StoreState::hide_all)
  }

  pub fn snapshot(&self) -> MeshSetSnapshot {
    self.lock().snapshot()
  }

  pub fn is_visible(&self, label: Label) -> bool {
    self.lock().is_visible(label)
  }

  pub fn live_labels(&self) -> Vec<Label> {
    self.lock().live.iter().copied().collect()
  }

  pub fn cached_mesh(&self, label: Label) -> Option<Arc<Mesh>> {
    self.lock().cache.get(&label).cloned()
  }

  pub fn cached_vertex_count(&self, label: Label) -> Option<usize> {
    self.lock().cache.get(&label).map(|mesh| mesh.vertex_count())
  }

  /// Current best mesh for each of `labels`, in the given order.
  pub fn cached_meshes(&self, labels: &[Label]) -> Vec<(Label, Option<Arc<Mesh>>)> {
    let state = self.lock();
    labels
      .iter()
      .map(|&label| (label, state.cache.get(&label).cloned()))
      .collect()
  }

  pub fn cached_count(&self) -> usize {
    self.lock().cache.len()
  }

  /// Labels whose finest-level extraction is still outstanding.
  pub fn pending_labels(&self) -> Vec<Label> {
    let mut labels: Vec<Label> = self.lock().pending.keys().copied().collect();
    labels.sort_unstable();
    labels
  }

  pub fn generation(&self) -> u64 {
    self.lock().generation
  }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod cache_test;
