//! Managed extraction worker pool.
//!
//! Every spawned task returns a [`TaskHandle`] that can be polled or waited
//! on. Dropping a handle detaches the task; it still runs to completion.
//!
//! # Usage
//!
//! ```ignore
//! let executor = TaskExecutor::new(4)?;
//!
//! // Queue work (non-blocking)
//! let handle = executor.spawn(move || expensive_computation());
//!
//! // Poll without blocking...
//! if let Some(result) = handle.try_poll() { /* ... */ }
//!
//! // ...or block until done
//! let result = handle.wait()?;
//!
//! // Drain everything before shutdown
//! executor.wait_idle();
//! ```

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{self as channel, Receiver, TryRecvError};

use crate::error::TaskError;

/// Unique identifier for a spawned task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
  fn next() -> Self {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    Self(COUNTER.fetch_add(1, Ordering::Relaxed))
  }
}

/// Handle to a task's eventual result.
#[derive(Debug)]
pub struct TaskHandle<T> {
  id: TaskId,
  receiver: Receiver<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
  pub fn id(&self) -> TaskId {
    self.id
  }

  /// Block until the task finishes.
  pub fn wait(self) -> Result<T, TaskError> {
    self.receiver.recv().unwrap_or(Err(TaskError::Disconnected))
  }

  /// Poll for the result (non-blocking).
  ///
  /// Returns `None` while the task is still running. The result can be
  /// taken only once.
  pub fn try_poll(&self) -> Option<Result<T, TaskError>> {
    match self.receiver.try_recv() {
      Ok(result) => Some(result),
      Err(TryRecvError::Empty) => None,
      Err(TryRecvError::Disconnected) => Some(Err(TaskError::Disconnected)),
    }
  }

  /// True once a result is waiting to be taken.
  pub fn is_finished(&self) -> bool {
    !self.receiver.is_empty()
  }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
  payload
    .downcast_ref::<&str>()
    .map(|s| s.to_string())
    .or_else(|| payload.downcast_ref::<String>().cloned())
    .unwrap_or_else(|| "unknown panic".to_string())
}

/// Set of running task ids plus a condvar signalled when it empties.
#[derive(Default)]
struct InFlight {
  ids: Mutex<HashSet<TaskId>>,
  idle: Condvar,
}

impl InFlight {
  fn lock(&self) -> MutexGuard<'_, HashSet<TaskId>> {
    self.ids.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn finish(&self, id: TaskId) {
    let mut ids = self.lock();
    ids.remove(&id);
    if ids.is_empty() {
      self.idle.notify_all();
    }
  }
}

/// Task executor on a dedicated rayon thread pool.
#[derive(Clone)]
pub struct TaskExecutor {
  pool: Arc<rayon::ThreadPool>,
  in_flight: Arc<InFlight>,
}

impl TaskExecutor {
  /// Create an executor with `num_threads` workers (0 lets rayon decide).
  pub fn new(num_threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(num_threads)
      .thread_name(|i| format!("label-mesh-{i}"))
      .build()?;
    Ok(Self {
      pool: Arc::new(pool),
      in_flight: Arc::new(InFlight::default()),
    })
  }

  /// Spawn a task on the pool (non-blocking).
  ///
  /// A panic inside `work` is caught and reported as
  /// [`TaskError::Panicked`] through the handle.
  pub fn spawn<F, T>(&self, work: F) -> TaskHandle<T>
  where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
  {
    self.spawn_with_id(move |_| work())
  }

  /// Like [`spawn`](Self::spawn), but the task receives its own id.
  pub fn spawn_with_id<F, T>(&self, work: F) -> TaskHandle<T>
  where
    F: FnOnce(TaskId) -> T + Send + 'static,
    T: Send + 'static,
  {
    let id = TaskId::next();
    let (sender, receiver) = channel::bounded(1);

    self.in_flight.lock().insert(id);

    let in_flight = Arc::clone(&self.in_flight);
    self.pool.spawn(move || {
      let result = panic::catch_unwind(AssertUnwindSafe(|| work(id)))
        .map_err(|payload| TaskError::Panicked(panic_message(&*payload)));
      // Ignore send error (handle dropped = detached)
      let _ = sender.send(result);
      in_flight.finish(id);
    });

    TaskHandle { id, receiver }
  }

  /// Block until every spawned task has finished.
  ///
  /// Must not be called from one of the pool's own tasks.
  pub fn wait_idle(&self) {
    let mut ids = self.in_flight.lock();
    while !ids.is_empty() {
      ids = self
        .in_flight
        .idle
        .wait(ids)
        .unwrap_or_else(PoisonError::into_inner);
    }
  }

  /// Number of tasks queued or running.
  pub fn pending_count(&self) -> usize {
    self.in_flight.lock().len()
  }

  /// Number of worker threads in the pool.
  pub fn num_threads(&self) -> usize {
    self.pool.current_num_threads()
  }
}
