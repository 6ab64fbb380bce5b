//! Workflow error types.

use std::path::PathBuf;

use thiserror::Error;
use wasmflow_host::HostError;
use wasmflow_payload::{ApplicationError, PayloadError};

/// Unexpected failures of a run, as opposed to failures the module declared.
#[derive(Debug, Error)]
pub enum InternalError {
  /// The module violated the host-call protocol or trapped.
  #[error(transparent)]
  Host(#[from] HostError),

  /// Bytes passed to `complete` were not a payload sequence.
  #[error("failed unmarshalling completed payloads: {0}")]
  CompletionDecode(#[source] PayloadError),

  /// Bytes passed to `complete_with_failure` were not a failure.
  #[error("failed unmarshalling failure: {0}")]
  FailureDecode(#[source] PayloadError),

  /// The entry point returned without calling a completion function.
  #[error("entry point returned without completing")]
  NoCompletion,

  /// The run was dropped before anything resolved it.
  #[error("run abandoned before completion")]
  Abandoned,

  /// `wait` was called a second time on the same run.
  #[error("run result already awaited")]
  AlreadyAwaited,
}

/// Errors surfaced to the workflow engine.
#[derive(Debug, Error)]
pub enum WorkflowError {
  /// No module source was configured.
  #[error("no module source configured")]
  ModuleNotConfigured,

  /// More than one module source was configured.
  #[error("conflicting module sources: {}", sources.join(", "))]
  ModuleSourceConflict { sources: Vec<&'static str> },

  /// The module was expected as a binary first parameter but was not there.
  #[error("expected module as the first parameter")]
  ModuleNotInFirstParam,

  /// The configured module file could not be read.
  #[error("failed reading {}: {source}", path.display())]
  ModuleRead {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The configured inline module was not valid base64.
  #[error("invalid inline module: {0}")]
  InvalidInlineModule(#[source] base64::DecodeError),

  /// Decoding or binding the module failed before the run started.
  #[error(transparent)]
  Host(#[from] HostError),

  /// Run info could not be serialized.
  #[error("failed creating run: {0}")]
  Payload(#[from] PayloadError),

  /// The module reported a failure through `complete_with_failure`.
  #[error(transparent)]
  Application(#[from] ApplicationError),

  /// The run ended unexpectedly.
  #[error(transparent)]
  Internal(#[from] InternalError),

  /// The surrounding invocation was cancelled before the run resolved.
  #[error("workflow cancelled")]
  Cancelled,
}

impl WorkflowError {
  /// Whether the workflow engine may retry the invocation.
  ///
  /// Module-declared failures carry their own flag. Configuration problems
  /// and cancellation are never retryable; other internal errors are.
  pub fn is_retryable(&self) -> bool {
    match self {
      WorkflowError::Application(e) => e.is_retryable(),
      WorkflowError::Internal(_) => true,
      _ => false,
    }
  }

  /// The module-declared failure, if this is one.
  pub fn as_application(&self) -> Option<&ApplicationError> {
    match self {
      WorkflowError::Application(e) => Some(e),
      _ => None,
    }
  }
}
