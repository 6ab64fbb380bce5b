use thiserror::Error;

/// Errors produced while encoding or decoding boundary data.
#[derive(Debug, Error)]
pub enum PayloadError {
  /// A value could not be serialized.
  #[error("failed encoding {what}: {source}")]
  Encode {
    what: &'static str,
    #[source]
    source: serde_json::Error,
  },

  /// Bytes did not parse as the expected record.
  #[error("failed decoding {what}: {source}")]
  Decode {
    what: &'static str,
    #[source]
    source: serde_json::Error,
  },
}

impl PayloadError {
  pub(crate) fn encode(what: &'static str, source: serde_json::Error) -> Self {
    Self::Encode { what, source }
  }

  pub(crate) fn decode(what: &'static str, source: serde_json::Error) -> Self {
    Self::Decode { what, source }
  }
}
