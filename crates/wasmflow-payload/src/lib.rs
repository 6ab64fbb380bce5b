//! Wasmflow Payload
//!
//! This crate contains the data exchanged between the workflow host and a
//! sandboxed module: positional [`Payload`]s, the [`RunInfo`] handed to the
//! module at start, and the structured [`Failure`] a module may report.
//!
//! Everything crosses the module boundary as JSON with byte fields encoded as
//! standard base64. [`ApplicationError`] is the host-side form of a
//! [`Failure`], carrying the retryable flag and the cause chain.

mod error;
mod failure;
mod payload;
mod serde_bytes;

pub use error::PayloadError;
pub use failure::{ApplicationError, Failure, decode_failure, encode_failure};
pub use payload::{
  ENCODING_BINARY, ENCODING_JSON, METADATA_ENCODING, Payload, RunInfo, decode_completion_value,
  encode_completion_value, encode_info,
};
