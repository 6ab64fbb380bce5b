//! Serde helpers for byte fields carried as base64 strings.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Treat an explicit `null` the same as a missing field.
pub(crate) fn nullable<'de, D, T>(d: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de> + Default,
{
  Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

pub(crate) mod bytes {
  use super::*;

  pub(crate) fn serialize<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&STANDARD.encode(v))
  }

  pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
    match Option::<String>::deserialize(d)? {
      Some(encoded) => STANDARD.decode(encoded.as_bytes()).map_err(D::Error::custom),
      None => Ok(Vec::new()),
    }
  }
}

pub(crate) mod bytes_map {
  use super::*;

  pub(crate) fn serialize<S: Serializer>(
    v: &BTreeMap<String, Vec<u8>>,
    s: S,
  ) -> Result<S::Ok, S::Error> {
    let encoded: BTreeMap<&str, String> = v
      .iter()
      .map(|(k, v)| (k.as_str(), STANDARD.encode(v)))
      .collect();
    encoded.serialize(s)
  }

  pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
    d: D,
  ) -> Result<BTreeMap<String, Vec<u8>>, D::Error> {
    let encoded: Option<BTreeMap<String, String>> = Option::deserialize(d)?;
    encoded
      .unwrap_or_default()
      .into_iter()
      .map(|(k, v)| {
        STANDARD
          .decode(v.as_bytes())
          .map(|v| (k, v))
          .map_err(D::Error::custom)
      })
      .collect()
  }
}
