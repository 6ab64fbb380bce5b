//! The workflow-engine contract consumed by the bridge.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

/// A blocking callback run on a task owned by the workflow engine.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// What the bridge needs from the surrounding workflow engine.
pub trait WorkflowContext: Send + Sync {
  /// Run `task` on its own task, distinct from the caller's.
  ///
  /// The task may block for as long as the module runs.
  fn spawn(&self, name: &str, task: Task);

  /// Cancelled when the surrounding invocation ends early, for example on a
  /// workflow timeout. Spawned tasks are abandoned, not interrupted.
  fn cancellation(&self) -> CancellationToken;
}

/// [`WorkflowContext`] backed by a tokio runtime.
///
/// A timer armed by [`with_timeout`](Self::with_timeout) stops once the
/// last clone of the context is dropped.
#[derive(Clone)]
pub struct LocalContext {
  handle: Handle,
  cancel: CancellationToken,
  timer: Option<Arc<DropGuard>>,
}

impl LocalContext {
  pub fn new(handle: Handle) -> Self {
    Self {
      handle,
      cancel: CancellationToken::new(),
      timer: None,
    }
  }

  /// Create a context on the current tokio runtime.
  ///
  /// # Panics
  ///
  /// Panics when called outside a tokio runtime.
  pub fn current() -> Self {
    Self::new(Handle::current())
  }

  /// Use `cancel` as the invocation's cancellation token.
  pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
    self.cancel = cancel;
    self
  }

  /// Cancel the invocation once `timeout` elapses.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    let cancel = self.cancel.clone();
    let stop = CancellationToken::new();
    let stopped = stop.clone();
    self.handle.spawn(async move {
      tokio::select! {
        _ = tokio::time::sleep(timeout) => {
          debug!(?timeout, "invocation timed out");
          cancel.cancel();
        }
        _ = cancel.cancelled() => {}
        _ = stopped.cancelled() => {}
      }
    });
    self.timer = Some(Arc::new(stop.drop_guard()));
    self
  }

  pub fn cancel(&self) {
    self.cancel.cancel();
  }
}

impl WorkflowContext for LocalContext {
  fn spawn(&self, name: &str, task: Task) {
    debug!(task = name, "spawning task");
    // Detached; the join handle is never awaited
    drop(self.handle.spawn_blocking(task));
  }

  fn cancellation(&self) -> CancellationToken {
    self.cancel.clone()
  }
}
