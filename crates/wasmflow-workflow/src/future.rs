//! Single-resolution future.

use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

use crate::context::WorkflowContext;

/// Why [`SingleFuture::get`] returned without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FutureError {
  #[error("future cancelled")]
  Cancelled,

  #[error("settable dropped without a value")]
  Abandoned,
}

/// Create a future and the handle that resolves it.
pub fn new_future<T>() -> (SingleFuture<T>, Settable<T>) {
  let (tx, rx) = oneshot::channel();
  (
    SingleFuture { rx },
    Settable {
      tx: Mutex::new(Some(tx)),
    },
  )
}

/// Write side of a [`SingleFuture`]. Only the first `set` takes effect.
pub struct Settable<T> {
  tx: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> Settable<T> {
  /// Resolve the future. Returns `false` if it was already resolved.
  pub fn set(&self, value: T) -> bool {
    let tx = self
      .tx
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .take();
    match tx {
      Some(tx) => {
        // A dropped waiter still counts as resolved
        let _ = tx.send(value);
        true
      }
      None => false,
    }
  }

  pub fn is_set(&self) -> bool {
    self
      .tx
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .is_none()
  }
}

/// Read side of a single-resolution future.
pub struct SingleFuture<T> {
  rx: oneshot::Receiver<T>,
}

impl<T> SingleFuture<T> {
  /// Suspend until resolved or until `ctx` is cancelled.
  ///
  /// A value that is already available wins over cancellation.
  pub async fn get<C: WorkflowContext + ?Sized>(self, ctx: &C) -> Result<T, FutureError> {
    let cancel = ctx.cancellation();
    tokio::select! {
      biased;
      value = self.rx => value.map_err(|_| FutureError::Abandoned),
      _ = cancel.cancelled() => Err(FutureError::Cancelled),
    }
  }
}
