//! Module-backed workflow.

use std::sync::Arc;

use tracing::{Span, error, info, instrument};
use wasmflow_host::{Engine, HostFunctions, Module, create_engine};
use wasmflow_payload::{Payload, RunInfo};

use crate::config::{ModuleSource, WorkflowConfig};
use crate::context::WorkflowContext;
use crate::error::{InternalError, WorkflowError};
use crate::run::RunController;

/// A workflow whose body is a sandboxed module.
///
/// Static module sources are decoded once, when the workflow is created;
/// a module taken from the first parameter is decoded per invocation.
pub struct WasmWorkflow {
  engine: Arc<dyn Engine>,
  /// `None` when the module comes from the first parameter.
  module: Option<Arc<dyn Module>>,
}

impl WasmWorkflow {
  pub fn new(config: WorkflowConfig) -> Result<Self, WorkflowError> {
    let source = config.source.ok_or(WorkflowError::ModuleNotConfigured)?;

    let engine: Arc<dyn Engine> = match config.engine {
      Some(engine) => engine,
      None => Arc::new(create_engine(config.engine_config)?),
    };

    let module = match source {
      ModuleSource::Bytes(bytes) => Some(engine.decode(&bytes)?),
      ModuleSource::File(path) => {
        let bytes =
          std::fs::read(&path).map_err(|source| WorkflowError::ModuleRead { path, source })?;
        Some(engine.decode(&bytes)?)
      }
      ModuleSource::FirstParam => None,
    };

    Ok(Self { engine, module })
  }

  /// Run the module once with `params` and return its completion value.
  #[instrument(
    name = "wasm_workflow",
    skip_all,
    fields(run_id = %uuid::Uuid::new_v4(), params = params.len())
  )]
  pub async fn execute<C: WorkflowContext + ?Sized>(
    &self,
    ctx: &C,
    params: Vec<Payload>,
  ) -> Result<Vec<Payload>, WorkflowError> {
    info!("workflow started");

    let result = self.execute_inner(ctx, params).await;

    match &result {
      Ok(payloads) => info!(payloads = payloads.len(), "workflow completed"),
      Err(e) => error!(error = %e, retryable = e.is_retryable(), "workflow failed"),
    }

    result
  }

  async fn execute_inner<C: WorkflowContext + ?Sized>(
    &self,
    ctx: &C,
    mut params: Vec<Payload>,
  ) -> Result<Vec<Payload>, WorkflowError> {
    let module = match &self.module {
      Some(module) => module.clone(),
      None => {
        if !params.first().is_some_and(Payload::is_binary) {
          return Err(WorkflowError::ModuleNotInFirstParam);
        }
        let first = params.remove(0);
        self.engine.decode(&first.data)?
      }
    };

    let controller = Arc::new(RunController::new(RunInfo::new(params))?);
    let instance = module.instantiate(HostFunctions::new(controller.clone()))?;

    let run = controller.clone();
    let span = Span::current();
    ctx.spawn(
      "wasm_run",
      Box::new(move || {
        let _entered = span.enter();
        let error = match instance.run() {
          Ok(()) => InternalError::NoCompletion,
          Err(e) => InternalError::Host(e),
        };
        // Inert when the module already completed
        run.complete_with_error(error);
      }),
    );

    controller.wait(ctx).await
  }
}
