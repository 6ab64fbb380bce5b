//! Wasmtime implementation of the engine capability set.

use std::sync::Arc;

use wasmtime::{
  Caller, Config, Linker, Store, StoreLimits, StoreLimitsBuilder, Trap, TypedFunc,
};

use crate::abi::{ENTRY_EXPORT, HOST_NAMESPACE, HostCall, HostFunctions};
use crate::engine::{Engine, Instance, Module};
use crate::error::HostError;
use crate::memory::GuestMemory;

/// Configuration for the wasmtime engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
  /// Fuel given to every instance. Enables fuel metering when set.
  pub fuel: Option<u64>,
  /// Upper bound on an instance's linear memory, in bytes.
  pub max_memory_bytes: Option<usize>,
}

/// Create the default engine.
pub fn create_engine(config: EngineConfig) -> Result<WasmtimeEngine, HostError> {
  WasmtimeEngine::new(config)
}

/// Store data for one instance.
struct HostState {
  host: HostFunctions,
  limits: StoreLimits,
}

/// [`Engine`] backed by wasmtime.
///
/// The linker is built once with every [`HostCall`] and shared by all
/// modules decoded through this engine.
pub struct WasmtimeEngine {
  engine: wasmtime::Engine,
  linker: Arc<Linker<HostState>>,
  config: EngineConfig,
}

impl WasmtimeEngine {
  pub fn new(config: EngineConfig) -> Result<Self, HostError> {
    let mut wasmtime_config = Config::new();
    wasmtime_config.consume_fuel(config.fuel.is_some());

    let engine = wasmtime::Engine::new(&wasmtime_config)
      .map_err(|e| HostError::instantiation(format!("failed to create wasmtime engine: {e}")))?;

    let mut linker = Linker::new(&engine);
    register_host_functions(&mut linker)?;

    Ok(Self {
      engine,
      linker: Arc::new(linker),
      config,
    })
  }
}

impl Engine for WasmtimeEngine {
  fn decode(&self, bytes: &[u8]) -> Result<Arc<dyn Module>, HostError> {
    let module =
      wasmtime::Module::new(&self.engine, bytes).map_err(|e| HostError::decode(e.to_string()))?;
    Ok(Arc::new(WasmtimeModule {
      engine: self.engine.clone(),
      module,
      linker: self.linker.clone(),
      config: self.config.clone(),
    }))
  }
}

struct WasmtimeModule {
  engine: wasmtime::Engine,
  module: wasmtime::Module,
  linker: Arc<Linker<HostState>>,
  config: EngineConfig,
}

impl Module for WasmtimeModule {
  fn instantiate(&self, host: HostFunctions) -> Result<Box<dyn Instance>, HostError> {
    let mut limits = StoreLimitsBuilder::new();
    if let Some(bytes) = self.config.max_memory_bytes {
      limits = limits.memory_size(bytes);
    }
    let state = HostState {
      host,
      limits: limits.build(),
    };

    let mut store = Store::new(&self.engine, state);
    store.limiter(|state| &mut state.limits);
    if let Some(fuel) = self.config.fuel {
      store
        .set_fuel(fuel)
        .map_err(|e| HostError::instantiation(e.to_string()))?;
    }

    let instance = self
      .linker
      .instantiate(&mut store, &self.module)
      .map_err(|e| HostError::instantiation(e.to_string()))?;

    let run = instance
      .get_typed_func::<(), ()>(&mut store, ENTRY_EXPORT)
      .map_err(|_| HostError::MissingExport {
        name: ENTRY_EXPORT.to_string(),
      })?;

    Ok(Box::new(WasmtimeInstance { store, run }))
  }
}

struct WasmtimeInstance {
  store: Store<HostState>,
  run: TypedFunc<(), ()>,
}

impl Instance for WasmtimeInstance {
  fn run(mut self: Box<Self>) -> Result<(), HostError> {
    self
      .run
      .call(&mut self.store, ())
      .map_err(|e| match e.downcast_ref::<Trap>() {
        Some(Trap::OutOfFuel) => HostError::runtime("out of fuel"),
        Some(trap) => HostError::runtime(format!("{trap}: {e}")),
        None => HostError::runtime(e.to_string()),
      })
  }
}

/// The calling instance's exported `memory`, seen through [`GuestMemory`].
///
/// A module without an exported memory looks like an empty one, so every
/// non-empty access fails the bounds check.
struct CallerMemory<'a, 'b> {
  caller: &'a mut Caller<'b, HostState>,
  memory: Option<wasmtime::Memory>,
}

impl<'a, 'b> CallerMemory<'a, 'b> {
  fn new(caller: &'a mut Caller<'b, HostState>) -> Self {
    let memory = caller.get_export("memory").and_then(|e| e.into_memory());
    Self { caller, memory }
  }
}

impl GuestMemory for CallerMemory<'_, '_> {
  fn data(&self) -> &[u8] {
    match &self.memory {
      Some(memory) => memory.data(&*self.caller),
      None => &[],
    }
  }

  fn data_mut(&mut self) -> &mut [u8] {
    match &self.memory {
      Some(memory) => memory.data_mut(&mut *self.caller),
      None => &mut [],
    }
  }
}

fn register_host_functions(linker: &mut Linker<HostState>) -> Result<(), HostError> {
  for call in HostCall::ALL {
    let name = call.name();
    let result = match call {
      HostCall::GetInfoLen => linker.func_wrap(
        HOST_NAMESPACE,
        name,
        |caller: Caller<'_, HostState>| -> u32 { caller.data().host.get_info_len() },
      ),
      HostCall::GetInfo => linker.func_wrap(
        HOST_NAMESPACE,
        name,
        |mut caller: Caller<'_, HostState>, offset: u32, count: u32| {
          let host = caller.data().host.clone();
          host.get_info(&mut CallerMemory::new(&mut caller), offset, count);
        },
      ),
      HostCall::WriteLog => linker.func_wrap(
        HOST_NAMESPACE,
        name,
        |mut caller: Caller<'_, HostState>, level: u32, offset: u32, count: u32| {
          let host = caller.data().host.clone();
          host.write_log(&CallerMemory::new(&mut caller), level, offset, count);
        },
      ),
      HostCall::Complete => linker.func_wrap(
        HOST_NAMESPACE,
        name,
        |mut caller: Caller<'_, HostState>, offset: u32, count: u32| {
          let host = caller.data().host.clone();
          host.complete(&CallerMemory::new(&mut caller), offset, count);
        },
      ),
      HostCall::CompleteWithFailure => linker.func_wrap(
        HOST_NAMESPACE,
        name,
        |mut caller: Caller<'_, HostState>, offset: u32, count: u32| {
          let host = caller.data().host.clone();
          host.complete_with_failure(&CallerMemory::new(&mut caller), offset, count);
        },
      ),
    };
    result.map_err(|e| HostError::instantiation(format!("failed binding '{name}': {e}")))?;
  }
  Ok(())
}
