//! Structured failures reported by a module and their host-side error form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PayloadError;
use crate::payload::Payload;
use crate::serde_bytes;

/// A failure description as a module reports it through
/// `complete_with_failure`.
///
/// `cause` links to the originating failure; the chain must be acyclic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
  #[serde(
    default,
    deserialize_with = "serde_bytes::nullable",
    skip_serializing_if = "String::is_empty"
  )]
  pub message: String,

  #[serde(
    rename = "type",
    default,
    deserialize_with = "serde_bytes::nullable",
    skip_serializing_if = "String::is_empty"
  )]
  pub failure_type: String,

  #[serde(
    default,
    deserialize_with = "serde_bytes::nullable",
    skip_serializing_if = "is_false"
  )]
  pub non_retryable: bool,

  #[serde(
    default,
    deserialize_with = "serde_bytes::nullable",
    skip_serializing_if = "Vec::is_empty"
  )]
  pub details: Vec<Payload>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cause: Option<Box<Failure>>,
}

fn is_false(b: &bool) -> bool {
  !b
}

impl Failure {
  pub fn new(message: impl Into<String>, failure_type: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      failure_type: failure_type.into(),
      ..Default::default()
    }
  }

  pub fn non_retryable(mut self) -> Self {
    self.non_retryable = true;
    self
  }

  pub fn with_details(mut self, details: Vec<Payload>) -> Self {
    self.details = details;
    self
  }

  pub fn with_cause(mut self, cause: Failure) -> Self {
    self.cause = Some(Box::new(cause));
    self
  }
}

/// Serialize a failure the way a module hands it to `complete_with_failure`.
pub fn encode_failure(failure: &Failure) -> Result<Vec<u8>, PayloadError> {
  serde_json::to_vec(failure).map_err(|e| PayloadError::encode("failure", e))
}

/// Decode the bytes a module passed to `complete_with_failure`.
pub fn decode_failure(bytes: &[u8]) -> Result<Failure, PayloadError> {
  serde_json::from_slice(bytes).map_err(|e| PayloadError::decode("failure", e))
}

/// Application-level error surfaced to the workflow engine.
///
/// Only module-declared failures become an `ApplicationError`; whether the
/// engine retries is driven by [`ApplicationError::is_retryable`]. The cause
/// chain is exposed through [`std::error::Error::source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationError {
  message: String,
  error_type: String,
  non_retryable: bool,
  details: Option<Vec<Payload>>,
  cause: Option<Box<ApplicationError>>,
}

impl ApplicationError {
  /// Create a retryable application error.
  pub fn new(message: impl Into<String>, error_type: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      error_type: error_type.into(),
      non_retryable: false,
      details: None,
      cause: None,
    }
  }

  /// Create an application error the engine must not retry.
  pub fn new_non_retryable(message: impl Into<String>, error_type: impl Into<String>) -> Self {
    Self {
      non_retryable: true,
      ..Self::new(message, error_type)
    }
  }

  pub fn with_cause(mut self, cause: ApplicationError) -> Self {
    self.cause = Some(Box::new(cause));
    self
  }

  /// Attach details. An empty list attaches nothing.
  pub fn with_details(mut self, details: Vec<Payload>) -> Self {
    self.details = if details.is_empty() {
      None
    } else {
      Some(details)
    };
    self
  }

  pub fn message(&self) -> &str {
    &self.message
  }

  pub fn error_type(&self) -> &str {
    &self.error_type
  }

  pub fn is_retryable(&self) -> bool {
    !self.non_retryable
  }

  /// Attached details, if any were given.
  pub fn details(&self) -> Option<&[Payload]> {
    self.details.as_deref()
  }

  pub fn cause(&self) -> Option<&ApplicationError> {
    self.cause.as_deref()
  }

  /// Iterate this error followed by each cause in turn.
  pub fn chain(&self) -> impl Iterator<Item = &ApplicationError> {
    std::iter::successors(Some(self), |e| e.cause())
  }
}

impl fmt::Display for ApplicationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.error_type.is_empty() {
      write!(f, "{}", self.message)
    } else {
      write!(f, "{} (type: {})", self.message, self.error_type)
    }
  }
}

impl std::error::Error for ApplicationError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    self
      .cause
      .as_deref()
      .map(|c| c as &(dyn std::error::Error + 'static))
  }
}

impl From<Failure> for ApplicationError {
  fn from(failure: Failure) -> Self {
    let base = if failure.non_retryable {
      ApplicationError::new_non_retryable(failure.message, failure.failure_type)
    } else {
      ApplicationError::new(failure.message, failure.failure_type)
    };
    let base = base.with_details(failure.details);
    match failure.cause {
      Some(cause) => base.with_cause((*cause).into()),
      None => base,
    }
  }
}
