//! The host-call ABI exposed to modules.
//!
//! All integers are `u32` and every byte range is an `(offset, count)` pair
//! into the calling instance's own memory.

use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use crate::error::HostError;
use crate::memory::GuestMemory;

/// Import module name the host functions are bound under.
pub const HOST_NAMESPACE: &str = "env";

/// Export invoked to run a module.
pub const ENTRY_EXPORT: &str = "run";

/// Receives the outcome of host calls for a single run.
///
/// Implementations must accept any number of completion calls and honor only
/// the first one.
pub trait CompletionSink: Send + Sync {
  /// Serialized run info handed out through `get_info`.
  fn info(&self) -> &[u8];

  /// Bytes passed to `complete`.
  fn complete(&self, bytes: &[u8]);

  /// Bytes passed to `complete_with_failure`.
  fn complete_with_failure(&self, bytes: &[u8]);

  /// A protocol violation or fault on the host side of the boundary.
  fn complete_with_error(&self, error: HostError);
}

/// The fixed set of functions a module may import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCall {
  /// `get_info_len() -> u32`
  GetInfoLen,
  /// `get_info(offset, count)`
  GetInfo,
  /// `write_log(level, offset, count)`
  WriteLog,
  /// `complete(offset, count)`
  Complete,
  /// `complete_with_failure(offset, count)`
  CompleteWithFailure,
}

impl HostCall {
  pub const ALL: [HostCall; 5] = [
    HostCall::GetInfoLen,
    HostCall::GetInfo,
    HostCall::WriteLog,
    HostCall::Complete,
    HostCall::CompleteWithFailure,
  ];

  pub fn name(self) -> &'static str {
    match self {
      HostCall::GetInfoLen => "get_info_len",
      HostCall::GetInfo => "get_info",
      HostCall::WriteLog => "write_log",
      HostCall::Complete => "complete",
      HostCall::CompleteWithFailure => "complete_with_failure",
    }
  }

  pub fn from_name(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|call| call.name() == name)
  }

  /// Number of `u32` parameters.
  pub fn arity(self) -> usize {
    match self {
      HostCall::GetInfoLen => 0,
      HostCall::WriteLog => 3,
      HostCall::GetInfo | HostCall::Complete | HostCall::CompleteWithFailure => 2,
    }
  }

  /// Whether the call returns a `u32`.
  pub fn returns_value(self) -> bool {
    matches!(self, HostCall::GetInfoLen)
  }
}

/// Log severity passed to `write_log`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
  Error = 1,
  Warn = 2,
  Info = 3,
  Debug = 4,
  Trace = 5,
}

impl LogLevel {
  pub fn from_raw(level: u32) -> Option<Self> {
    match level {
      1 => Some(LogLevel::Error),
      2 => Some(LogLevel::Warn),
      3 => Some(LogLevel::Info),
      4 => Some(LogLevel::Debug),
      5 => Some(LogLevel::Trace),
      _ => None,
    }
  }
}

/// Host-call handlers bound to one run.
///
/// Every handler reports problems to the [`CompletionSink`] instead of
/// returning them: a misbehaving module ends its own run, never the host.
#[derive(Clone)]
pub struct HostFunctions {
  sink: Arc<dyn CompletionSink>,
}

impl HostFunctions {
  pub fn new(sink: Arc<dyn CompletionSink>) -> Self {
    Self { sink }
  }

  pub fn get_info_len(&self) -> u32 {
    u32::try_from(self.sink.info().len()).unwrap_or(u32::MAX)
  }

  pub fn get_info(&self, memory: &mut dyn GuestMemory, offset: u32, count: u32) {
    let info = self.sink.info();
    if count as usize != info.len() {
      self.sink.complete_with_error(HostError::InvalidLength {
        expected: info.len(),
        actual: count,
      });
      return;
    }
    if let Err(e) = memory.write(offset, info) {
      self.sink.complete_with_error(e);
    }
  }

  pub fn write_log(&self, memory: &dyn GuestMemory, level: u32, offset: u32, count: u32) {
    let Some(level) = LogLevel::from_raw(level) else {
      return;
    };
    let bytes = match memory.read(offset, count) {
      Ok(bytes) => bytes,
      Err(e) => {
        self.sink.complete_with_error(e);
        return;
      }
    };
    let message = String::from_utf8_lossy(bytes);
    match level {
      LogLevel::Error => error!(target: "wasmflow::guest", "{message}"),
      LogLevel::Warn => warn!(target: "wasmflow::guest", "{message}"),
      LogLevel::Info => info!(target: "wasmflow::guest", "{message}"),
      LogLevel::Debug => debug!(target: "wasmflow::guest", "{message}"),
      LogLevel::Trace => trace!(target: "wasmflow::guest", "{message}"),
    }
  }

  pub fn complete(&self, memory: &dyn GuestMemory, offset: u32, count: u32) {
    match memory.read(offset, count) {
      Ok(bytes) => self.sink.complete(bytes),
      Err(e) => self.sink.complete_with_error(e),
    }
  }

  pub fn complete_with_failure(&self, memory: &dyn GuestMemory, offset: u32, count: u32) {
    match memory.read(offset, count) {
      Ok(bytes) => self.sink.complete_with_failure(bytes),
      Err(e) => self.sink.complete_with_error(e),
    }
  }

  /// Invoke `call` with raw arguments, as a module would.
  ///
  /// Returns the call's result for [`HostCall::GetInfoLen`] and `None` for
  /// the others. Only a wrong argument count is reported as an error.
  pub fn dispatch(
    &self,
    call: HostCall,
    memory: &mut dyn GuestMemory,
    args: &[u32],
  ) -> Result<Option<u32>, HostError> {
    if args.len() != call.arity() {
      return Err(HostError::InvalidCall {
        name: call.name(),
        expected: call.arity(),
        actual: args.len(),
      });
    }
    match call {
      HostCall::GetInfoLen => return Ok(Some(self.get_info_len())),
      HostCall::GetInfo => self.get_info(memory, args[0], args[1]),
      HostCall::WriteLog => self.write_log(memory, args[0], args[1], args[2]),
      HostCall::Complete => self.complete(memory, args[0], args[1]),
      HostCall::CompleteWithFailure => self.complete_with_failure(memory, args[0], args[1]),
    }
    Ok(None)
  }
}
