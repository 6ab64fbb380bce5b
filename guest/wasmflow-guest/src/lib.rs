//! Guest-side bindings for the wasmflow host ABI.
//!
//! A module exports `run` and, during that call, reads its [`Info`], logs
//! and finally resolves the run with [`complete`] or [`fail`]. Only the
//! first resolution counts.

pub use wasmflow_payload::{Failure, Payload};

mod sys {
  #[link(wasm_import_module = "env")]
  unsafe extern "C" {
    pub fn get_info_len() -> u32;
    pub fn get_info(offset: u32, count: u32);
    pub fn write_log(level: u32, offset: u32, count: u32);
    pub fn complete(offset: u32, count: u32);
    pub fn complete_with_failure(offset: u32, count: u32);
  }
}

/// Parameters of the current run.
#[derive(Debug, Clone, Default)]
pub struct Info {
  pub params: Vec<Payload>,
}

impl Info {
  /// Fetch and decode the run info from the host.
  pub fn load() -> Result<Self, serde_json::Error> {
    // SAFETY: host imports only touch the buffer range passed to them
    let len = unsafe { sys::get_info_len() };
    let mut buf = vec![0u8; len as usize];
    unsafe { sys::get_info(buf.as_mut_ptr() as u32, len) };
    let info: wasmflow_payload::RunInfo = serde_json::from_slice(&buf)?;
    Ok(Self {
      params: info.params,
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum LogLevel {
  Error = 1,
  Warn = 2,
  Info = 3,
  Debug = 4,
  Trace = 5,
}

pub fn write_log(level: LogLevel, message: &str) {
  unsafe { sys::write_log(level as u32, message.as_ptr() as u32, message.len() as u32) };
}

/// Resolve the run with `payloads`.
pub fn complete(payloads: Vec<Payload>) {
  match wasmflow_payload::encode_completion_value(&payloads) {
    Ok(bytes) => unsafe { sys::complete(bytes.as_ptr() as u32, bytes.len() as u32) },
    Err(e) => fail(Failure::new(e.to_string(), "EncodeError").non_retryable()),
  }
}

/// Resolve the run with an application failure.
pub fn fail(failure: Failure) {
  let bytes = match wasmflow_payload::encode_failure(&failure) {
    Ok(bytes) => bytes,
    // A bare message always encodes
    Err(_) => format!(r#"{{"message":{:?}}}"#, failure.message).into_bytes(),
  };
  unsafe { sys::complete_with_failure(bytes.as_ptr() as u32, bytes.len() as u32) };
}
