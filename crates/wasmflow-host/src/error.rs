use thiserror::Error;

/// Errors raised while decoding, binding or running a module, or while
/// servicing one of its host calls.
#[derive(Debug, Error)]
pub enum HostError {
  /// Bytecode failed validation.
  #[error("failed decoding module: {message}")]
  Decode { message: String },

  /// Module imports did not resolve, or the store could not be set up.
  #[error("instantiation failed: {message}")]
  Instantiation { message: String },

  /// The designated entry export is absent or has the wrong signature.
  #[error("missing '{name}' function")]
  MissingExport { name: String },

  /// A host call addressed bytes outside the instance's memory.
  #[error("memory access out of bounds: offset {offset}, count {count}, memory size {size}")]
  MemoryAccess { offset: u32, count: u64, size: usize },

  /// `get_info` was called with a buffer of the wrong length.
  #[error("invalid info length: expected {expected}, got {actual}")]
  InvalidLength { expected: usize, actual: u32 },

  /// A host call was dispatched with the wrong number of arguments.
  #[error("host call '{name}' expects {expected} arguments, got {actual}")]
  InvalidCall {
    name: &'static str,
    expected: usize,
    actual: usize,
  },

  /// The module trapped or otherwise faulted during execution.
  #[error("failed running instance: {message}")]
  Runtime { message: String },
}

impl HostError {
  pub fn decode(message: impl Into<String>) -> Self {
    Self::Decode {
      message: message.into(),
    }
  }

  pub fn instantiation(message: impl Into<String>) -> Self {
    Self::Instantiation {
      message: message.into(),
    }
  }

  pub fn runtime(message: impl Into<String>) -> Self {
    Self::Runtime {
      message: message.into(),
    }
  }
}
