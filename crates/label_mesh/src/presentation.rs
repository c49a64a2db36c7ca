//! MeshSetListener - change notification for rendering collaborators.
//!
//! Notifications are level-triggered: a listener learns only that the set of
//! displayed meshes changed and re-reads [`MeshStore::snapshot`] to see what
//! changed. Callbacks may arrive on worker threads and are never invoked
//! while the store lock is held.
//!
//! [`MeshStore::snapshot`]: crate::cache::MeshStore::snapshot

use crossbeam_channel::{self as channel, Receiver, Sender};

/// Emitted whenever the displayed mesh set changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshSetChanged {
  /// Store generation after the change. Unique per change; delivery order
  /// across worker threads is not guaranteed.
  pub generation: u64,
}

/// Callback interface for rendering bridges.
///
/// Must be thread-safe as callbacks may be invoked from worker threads.
pub trait MeshSetListener: Send + Sync {
  fn mesh_set_changed(&self, change: MeshSetChanged);
}

/// No-op implementation for testing and headless operation.
pub struct NullListener;

impl MeshSetListener for NullListener {
  fn mesh_set_changed(&self, _change: MeshSetChanged) {
    // No-op
  }
}

/// Forwards notifications into a channel for consumers that poll.
pub struct ChannelListener {
  sender: Sender<MeshSetChanged>,
}

impl ChannelListener {
  /// Create a listener and the receiving end of its channel.
  pub fn new() -> (Self, Receiver<MeshSetChanged>) {
    let (sender, receiver) = channel::unbounded();
    (Self { sender }, receiver)
  }
}

impl MeshSetListener for ChannelListener {
  fn mesh_set_changed(&self, change: MeshSetChanged) {
    // Ignore send error (receiver dropped = nobody is rendering)
    let _ = self.sender.send(change);
  }
}

impl<F> MeshSetListener for F
where
  F: Fn(MeshSetChanged) + Send + Sync,
{
  fn mesh_set_changed(&self, change: MeshSetChanged) {
    self(change)
  }
}
