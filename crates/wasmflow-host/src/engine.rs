//! Capability set isolating wasmflow from a specific bytecode engine.

use std::sync::Arc;

use crate::abi::HostFunctions;
use crate::error::HostError;

/// Decodes module bytes into a validated [`Module`].
pub trait Engine: Send + Sync {
  /// Validate and compile `bytes`. Never executes module code.
  fn decode(&self, bytes: &[u8]) -> Result<Arc<dyn Module>, HostError>;
}

/// A decoded module, immutable and instantiable any number of times.
pub trait Module: Send + Sync {
  /// Bind `host` under the host namespace and create an instance.
  ///
  /// Fails with [`HostError::Instantiation`] when imports do not resolve and
  /// with [`HostError::MissingExport`] when the entry export is absent.
  fn instantiate(&self, host: HostFunctions) -> Result<Box<dyn Instance>, HostError>;
}

/// An instance with its own private memory, run at most once.
pub trait Instance: Send {
  /// Invoke the entry export, blocking until it returns or traps.
  fn run(self: Box<Self>) -> Result<(), HostError>;
}
