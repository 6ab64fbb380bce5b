//! Wasmflow Workflow
//!
//! This crate bridges a sandboxed module's run into a workflow engine's
//! single-resolution future model.
//!
//! A [`WasmWorkflow`] is built from a validated [`WorkflowConfig`] naming
//! exactly one [`ModuleSource`]. Each call to [`WasmWorkflow::execute`]
//! creates a [`RunController`], instantiates the module with host functions
//! bound to that controller, runs the module's entry point on a task owned
//! by the [`WorkflowContext`], and waits for the first completion signal.
//!
//! The workflow engine itself is external; [`LocalContext`] is a tokio-backed
//! implementation of the contract for running standalone.

mod config;
mod context;
mod error;
mod future;
mod run;
mod workflow;

pub use config::{ModuleSource, WorkflowConfig, WorkflowSettings};
pub use context::{LocalContext, Task, WorkflowContext};
pub use error::{InternalError, WorkflowError};
pub use future::{FutureError, Settable, SingleFuture, new_future};
pub use run::RunController;
pub use workflow::WasmWorkflow;
