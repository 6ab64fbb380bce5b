//! Run controller: reconciles a run-once module execution with the
//! workflow engine's single-resolution future.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};
use wasmflow_host::{CompletionSink, HostError};
use wasmflow_payload::{
  ApplicationError, Payload, RunInfo, decode_completion_value, decode_failure, encode_info,
};

use crate::context::WorkflowContext;
use crate::error::{InternalError, WorkflowError};
use crate::future::{FutureError, Settable, SingleFuture, new_future};

type RunResult = Result<Vec<Payload>, WorkflowError>;

/// Completion state for a single run.
///
/// The first of [`complete`](Self::complete),
/// [`complete_with_failure`](Self::complete_with_failure) and
/// [`complete_with_error`](Self::complete_with_error) resolves the run; every
/// later call is silently ignored.
pub struct RunController {
  info: RunInfo,
  info_bytes: Vec<u8>,
  settable: Settable<RunResult>,
  future: Mutex<Option<SingleFuture<RunResult>>>,
  completed: AtomicBool,
}

impl RunController {
  /// Create a controller, serializing `info` once.
  pub fn new(info: RunInfo) -> Result<Self, WorkflowError> {
    let info_bytes = encode_info(&info)?;
    let (future, settable) = new_future();
    Ok(Self {
      info,
      info_bytes,
      settable,
      future: Mutex::new(Some(future)),
      completed: AtomicBool::new(false),
    })
  }

  pub fn info(&self) -> &RunInfo {
    &self.info
  }

  /// The serialized run info handed to the module.
  pub fn info_bytes(&self) -> &[u8] {
    &self.info_bytes
  }

  pub fn is_completed(&self) -> bool {
    self.completed.load(Ordering::Acquire)
  }

  /// Claim the single resolution. Returns `false` if already claimed.
  fn claim(&self, kind: &'static str) -> bool {
    let claimed = !self.completed.swap(true, Ordering::AcqRel);
    if !claimed {
      debug!(kind, "ignoring completion of already completed run");
    }
    claimed
  }

  fn resolve(&self, result: RunResult) {
    match &result {
      Ok(payloads) => info!(payloads = payloads.len(), "run completed"),
      Err(e) => info!(error = %e, "run completed with error"),
    }
    self.settable.set(result);
  }

  /// Resolve with the bytes a module passed to `complete`.
  pub fn complete(&self, bytes: &[u8]) {
    if !self.claim("value") {
      return;
    }
    let result = decode_completion_value(bytes)
      .map_err(|e| WorkflowError::Internal(InternalError::CompletionDecode(e)));
    self.resolve(result);
  }

  /// Resolve with the bytes a module passed to `complete_with_failure`.
  pub fn complete_with_failure(&self, bytes: &[u8]) {
    if !self.claim("failure") {
      return;
    }
    let error = match decode_failure(bytes) {
      Ok(failure) => WorkflowError::Application(ApplicationError::from(failure)),
      Err(e) => WorkflowError::Internal(InternalError::FailureDecode(e)),
    };
    self.resolve(Err(error));
  }

  /// Resolve with an internal error.
  pub fn complete_with_error(&self, error: InternalError) {
    if !self.claim("error") {
      return;
    }
    self.resolve(Err(WorkflowError::Internal(error)));
  }

  /// Suspend until the run is resolved and return its outcome.
  pub async fn wait<C: WorkflowContext + ?Sized>(&self, ctx: &C) -> RunResult {
    let future = self
      .future
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .take()
      .ok_or(InternalError::AlreadyAwaited)?;

    match future.get(ctx).await {
      Ok(result) => result,
      Err(FutureError::Cancelled) => Err(WorkflowError::Cancelled),
      Err(FutureError::Abandoned) => Err(InternalError::Abandoned.into()),
    }
  }
}

impl CompletionSink for RunController {
  fn info(&self) -> &[u8] {
    &self.info_bytes
  }

  fn complete(&self, bytes: &[u8]) {
    RunController::complete(self, bytes);
  }

  fn complete_with_failure(&self, bytes: &[u8]) {
    RunController::complete_with_failure(self, bytes);
  }

  fn complete_with_error(&self, error: HostError) {
    RunController::complete_with_error(self, InternalError::Host(error));
  }
}

#[cfg(test)]
mod tests {
  use wasmflow_payload::{Failure, encode_completion_value, encode_failure};

  use super::*;
  use crate::context::LocalContext;

  #[derive(Debug, Clone, Copy)]
  enum Signal {
    Value,
    Failure,
    Error,
  }

  fn send(controller: &RunController, signal: Signal) {
    match signal {
      Signal::Value => {
        let bytes = encode_completion_value(&[Payload::new(b"v".to_vec())]).unwrap();
        controller.complete(&bytes);
      }
      Signal::Failure => {
        let bytes = encode_failure(&Failure::new("f", "T")).unwrap();
        controller.complete_with_failure(&bytes);
      }
      Signal::Error => controller.complete_with_error(InternalError::NoCompletion),
    }
  }

  fn assert_outcome(result: RunResult, signal: Signal) {
    match (signal, result) {
      (Signal::Value, Ok(payloads)) => assert_eq!(payloads, vec![Payload::new(b"v".to_vec())]),
      (Signal::Failure, Err(WorkflowError::Application(e))) => assert_eq!(e.message(), "f"),
      (Signal::Error, Err(WorkflowError::Internal(InternalError::NoCompletion))) => {}
      (signal, result) => panic!("unexpected outcome {result:?} for first signal {signal:?}"),
    }
  }

  #[tokio::test]
  async fn test_only_first_completion_counts() {
    let signals = [Signal::Value, Signal::Failure, Signal::Error];
    let orders: Vec<Vec<Signal>> = vec![
      vec![signals[0], signals[1], signals[2]],
      vec![signals[0], signals[2], signals[1]],
      vec![signals[1], signals[0], signals[2]],
      vec![signals[1], signals[2], signals[0]],
      vec![signals[2], signals[0], signals[1]],
      vec![signals[2], signals[1], signals[0]],
      vec![signals[0], signals[0], signals[0]],
      vec![signals[1], signals[1]],
    ];

    for order in orders {
      let controller = RunController::new(RunInfo::default()).unwrap();
      for signal in &order {
        send(&controller, *signal);
      }
      assert!(controller.is_completed());

      let ctx = LocalContext::current();
      assert_outcome(controller.wait(&ctx).await, order[0]);
    }
  }

  #[tokio::test]
  async fn test_empty_completion_is_empty_value() {
    let controller = RunController::new(RunInfo::default()).unwrap();
    controller.complete(b"");

    let ctx = LocalContext::current();
    assert_eq!(controller.wait(&ctx).await.unwrap(), Vec::<Payload>::new());
  }

  #[tokio::test]
  async fn test_malformed_completion_is_internal() {
    let controller = RunController::new(RunInfo::default()).unwrap();
    controller.complete(b"not json");
    // The decode failure already resolved the run
    send(&controller, Signal::Value);

    let ctx = LocalContext::current();
    let err = controller.wait(&ctx).await.unwrap_err();
    assert!(matches!(
      err,
      WorkflowError::Internal(InternalError::CompletionDecode(_))
    ));
    assert!(err.to_string().starts_with("failed unmarshalling completed payloads"));
  }

  #[tokio::test]
  async fn test_malformed_failure_is_internal() {
    let controller = RunController::new(RunInfo::default()).unwrap();
    controller.complete_with_failure(b"[1,2]");

    let ctx = LocalContext::current();
    let err = controller.wait(&ctx).await.unwrap_err();
    assert!(matches!(
      err,
      WorkflowError::Internal(InternalError::FailureDecode(_))
    ));
    assert!(err.as_application().is_none());
  }

  #[tokio::test]
  async fn test_non_retryable_failure() {
    let controller = RunController::new(RunInfo::default()).unwrap();
    controller.complete_with_failure(br#"{"message":"boom","type":"Custom","non_retryable":true}"#);

    let ctx = LocalContext::current();
    let err = controller.wait(&ctx).await.unwrap_err();
    let app = err.as_application().expect("should be an application error");
    assert_eq!(app.message(), "boom");
    assert_eq!(app.error_type(), "Custom");
    assert!(!err.is_retryable());
  }

  #[tokio::test]
  async fn test_host_error_through_sink() {
    let controller = RunController::new(RunInfo::default()).unwrap();
    let sink: &dyn CompletionSink = &controller;
    sink.complete_with_error(HostError::InvalidLength {
      expected: 2,
      actual: 1,
    });
    sink.complete(b"[]");

    let ctx = LocalContext::current();
    let err = controller.wait(&ctx).await.unwrap_err();
    assert!(matches!(
      err,
      WorkflowError::Internal(InternalError::Host(HostError::InvalidLength { .. }))
    ));
    assert!(err.is_retryable());
  }

  #[tokio::test]
  async fn test_info_serialized_once() {
    let info = RunInfo::new(vec![Payload::new(b"42".to_vec())]);
    let controller = RunController::new(info.clone()).unwrap();

    assert_eq!(controller.info(), &info);
    assert_eq!(controller.info_bytes(), br#"{"params":[{"data":"NDI="}]}"#);
    assert_eq!(
      CompletionSink::info(&controller),
      controller.info_bytes()
    );
  }

  #[tokio::test]
  async fn test_wait_twice() {
    let controller = RunController::new(RunInfo::default()).unwrap();
    controller.complete(b"[]");

    let ctx = LocalContext::current();
    assert!(controller.wait(&ctx).await.is_ok());
    assert!(matches!(
      controller.wait(&ctx).await,
      Err(WorkflowError::Internal(InternalError::AlreadyAwaited))
    ));
  }

  #[tokio::test]
  async fn test_wait_cancelled() {
    let controller = RunController::new(RunInfo::default()).unwrap();
    let ctx = LocalContext::current();
    ctx.cancel();

    assert!(matches!(
      controller.wait(&ctx).await,
      Err(WorkflowError::Cancelled)
    ));
  }
}
