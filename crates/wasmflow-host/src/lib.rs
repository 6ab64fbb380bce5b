//! Wasmflow Host
//!
//! This crate hosts sandboxed WebAssembly modules for wasmflow. It defines
//! the [`Engine`] / [`Module`] / [`Instance`] capability set that isolates the
//! rest of the system from a particular bytecode engine, the default wasmtime
//! implementation, and the host-call ABI a module uses to read its input and
//! report its completion.
//!
//! The ABI is an explicit table ([`HostCall::ALL`]) of functions bound under
//! the [`HOST_NAMESPACE`] import module. Handlers live on [`HostFunctions`]
//! and work against any [`GuestMemory`], so they can be driven without a
//! real engine.

mod abi;
mod engine;
mod error;
mod memory;
mod wasmtime_engine;

pub use abi::{CompletionSink, ENTRY_EXPORT, HOST_NAMESPACE, HostCall, HostFunctions, LogLevel};
pub use engine::{Engine, Instance, Module};
pub use error::HostError;
pub use memory::{GuestMemory, SliceMemory};
pub use wasmtime_engine::{EngineConfig, WasmtimeEngine, create_engine};
