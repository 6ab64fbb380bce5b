//! Workflow configuration.

use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use wasmflow_host::{Engine, EngineConfig};

use crate::error::WorkflowError;

/// Where a workflow's module bytecode comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
  /// Bytecode held in memory.
  Bytes(Vec<u8>),
  /// Bytecode read from a file when the workflow is created.
  File(PathBuf),
  /// Bytecode passed per invocation as the first parameter, tagged
  /// `binary/plain`. That parameter is not handed to the module.
  FirstParam,
}

/// Validated configuration for a [`WasmWorkflow`](crate::WasmWorkflow).
#[derive(Clone, Default)]
pub struct WorkflowConfig {
  /// Required.
  pub source: Option<ModuleSource>,
  /// Engine to decode and run modules with. Defaults to wasmtime.
  pub engine: Option<Arc<dyn Engine>>,
  /// Settings for the default engine. Ignored when `engine` is set.
  pub engine_config: EngineConfig,
}

impl WorkflowConfig {
  pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
    Self::with_source(ModuleSource::Bytes(bytes.into()))
  }

  pub fn from_file(path: impl Into<PathBuf>) -> Self {
    Self::with_source(ModuleSource::File(path.into()))
  }

  pub fn from_first_param() -> Self {
    Self::with_source(ModuleSource::FirstParam)
  }

  fn with_source(source: ModuleSource) -> Self {
    Self {
      source: Some(source),
      ..Default::default()
    }
  }

  /// Decode and run modules with `engine` instead of the default.
  pub fn with_engine(mut self, engine: Arc<dyn Engine>) -> Self {
    self.engine = Some(engine);
    self
  }

  pub fn with_engine_config(mut self, engine_config: EngineConfig) -> Self {
    self.engine_config = engine_config;
    self
  }
}

/// Flat, deserializable workflow settings.
///
/// Exactly one of `module_path`, `module_base64` and
/// `module_from_first_param` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
  pub module_path: Option<PathBuf>,
  pub module_base64: Option<String>,
  pub module_from_first_param: bool,
  pub fuel: Option<u64>,
  pub max_memory_bytes: Option<usize>,
}

impl TryFrom<WorkflowSettings> for WorkflowConfig {
  type Error = WorkflowError;

  fn try_from(settings: WorkflowSettings) -> Result<Self, Self::Error> {
    let sources: Vec<&'static str> = [
      ("module_path", settings.module_path.is_some()),
      ("module_base64", settings.module_base64.is_some()),
      ("module_from_first_param", settings.module_from_first_param),
    ]
    .into_iter()
    .filter_map(|(name, set)| set.then_some(name))
    .collect();
    if sources.len() > 1 {
      return Err(WorkflowError::ModuleSourceConflict { sources });
    }

    let source = if let Some(path) = settings.module_path {
      ModuleSource::File(path)
    } else if let Some(encoded) = settings.module_base64 {
      let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(WorkflowError::InvalidInlineModule)?;
      ModuleSource::Bytes(bytes)
    } else if settings.module_from_first_param {
      ModuleSource::FirstParam
    } else {
      return Err(WorkflowError::ModuleNotConfigured);
    };

    Ok(WorkflowConfig {
      source: Some(source),
      engine: None,
      engine_config: EngineConfig {
        fuel: settings.fuel,
        max_memory_bytes: settings.max_memory_bytes,
      },
    })
  }
}
