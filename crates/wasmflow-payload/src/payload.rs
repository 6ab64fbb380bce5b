//! Positional payloads and the run info handed to a module.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PayloadError;
use crate::serde_bytes;

/// Metadata key naming how `data` is encoded.
pub const METADATA_ENCODING: &str = "encoding";

/// Encoding tag for raw, unconverted bytes.
pub const ENCODING_BINARY: &str = "binary/plain";

/// Encoding tag for JSON data.
pub const ENCODING_JSON: &str = "json/plain";

/// A single positional value: metadata plus opaque bytes.
///
/// `data` is always written on the wire (possibly empty), `metadata` only
/// when non-empty. Metadata is kept ordered so encoding is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
  #[serde(
    default,
    with = "serde_bytes::bytes_map",
    skip_serializing_if = "BTreeMap::is_empty"
  )]
  pub metadata: BTreeMap<String, Vec<u8>>,

  #[serde(default, with = "serde_bytes::bytes")]
  pub data: Vec<u8>,
}

impl Payload {
  /// Create a payload with no metadata.
  pub fn new(data: impl Into<Vec<u8>>) -> Self {
    Self {
      metadata: BTreeMap::new(),
      data: data.into(),
    }
  }

  /// Create a payload tagged as raw binary.
  pub fn binary(data: impl Into<Vec<u8>>) -> Self {
    Self::new(data).with_encoding(ENCODING_BINARY)
  }

  /// Serialize `value` as JSON into a payload tagged `json/plain`.
  pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, PayloadError> {
    let data = serde_json::to_vec(value).map_err(|e| PayloadError::encode("json payload", e))?;
    Ok(Self::new(data).with_encoding(ENCODING_JSON))
  }

  /// Set the encoding metadata tag.
  pub fn with_encoding(mut self, encoding: &str) -> Self {
    self
      .metadata
      .insert(METADATA_ENCODING.to_string(), encoding.as_bytes().to_vec());
    self
  }

  /// The encoding tag, if present and valid UTF-8.
  pub fn encoding(&self) -> Option<&str> {
    self
      .metadata
      .get(METADATA_ENCODING)
      .and_then(|v| std::str::from_utf8(v).ok())
  }

  /// Whether this payload is tagged as raw binary.
  pub fn is_binary(&self) -> bool {
    self.encoding() == Some(ENCODING_BINARY)
  }

  /// Parse `data` as JSON.
  pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
    serde_json::from_slice(&self.data).map_err(|e| PayloadError::decode("json payload", e))
  }
}

/// Input to a single module run: the workflow's positional parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
  #[serde(
    default,
    deserialize_with = "serde_bytes::nullable",
    skip_serializing_if = "Vec::is_empty"
  )]
  pub params: Vec<Payload>,
}

impl RunInfo {
  pub fn new(params: Vec<Payload>) -> Self {
    Self { params }
  }
}

/// Serialize run info into the bytes exposed through `get_info`.
pub fn encode_info(info: &RunInfo) -> Result<Vec<u8>, PayloadError> {
  serde_json::to_vec(info).map_err(|e| PayloadError::encode("run info", e))
}

/// Serialize a completion value the way a module hands it to `complete`.
pub fn encode_completion_value(payloads: &[Payload]) -> Result<Vec<u8>, PayloadError> {
  serde_json::to_vec(payloads).map_err(|e| PayloadError::encode("completion value", e))
}

/// Decode the bytes a module passed to `complete`.
///
/// Empty input is an empty result, not an error.
pub fn decode_completion_value(bytes: &[u8]) -> Result<Vec<Payload>, PayloadError> {
  if bytes.is_empty() {
    return Ok(Vec::new());
  }
  let payloads: Option<Vec<Payload>> =
    serde_json::from_slice(bytes).map_err(|e| PayloadError::decode("completion value", e))?;
  Ok(payloads.unwrap_or_default())
}
