//! End-to-end tests for WasmWorkflow using inline WAT modules.

use std::io::Write;
use std::time::Duration;

use wasmflow_host::HostError;
use wasmflow_payload::{Payload, RunInfo, encode_info};
use wasmflow_workflow::{
  InternalError, LocalContext, WasmWorkflow, WorkflowConfig, WorkflowError,
};

/// Completes with `[{"data":"NDI="}]`, a single payload holding `42`.
const COMPLETE_42: &str = r#"
  (module
    (import "env" "complete" (func $complete (param i32 i32)))
    (memory (export "memory") 1)
    (data (i32.const 0) "[{\"data\":\"NDI=\"}]")
    (func (export "run")
      (call $complete (i32.const 0) (i32.const 17))))
"#;

async fn execute(wat: &str, params: Vec<Payload>) -> Result<Vec<Payload>, WorkflowError> {
  let workflow = WasmWorkflow::new(WorkflowConfig::from_bytes(wat)).expect("workflow should build");
  workflow.execute(&LocalContext::current(), params).await
}

#[tokio::test]
async fn test_complete_with_value() {
  let result = execute(COMPLETE_42, Vec::new()).await.unwrap();
  assert_eq!(result, vec![Payload::new(b"42".to_vec())]);
}

#[tokio::test]
async fn test_complete_with_empty_value() {
  let wat = r#"
    (module
      (import "env" "complete" (func $complete (param i32 i32)))
      (memory (export "memory") 1)
      (func (export "run")
        (call $complete (i32.const 0) (i32.const 0))))
  "#;
  assert!(execute(wat, Vec::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_explicit_failure() {
  let wat = r#"
    (module
      (import "env" "complete_with_failure" (func $fail (param i32 i32)))
      (memory (export "memory") 1)
      (data (i32.const 0) "{\"message\":\"boom\",\"type\":\"Custom\",\"non_retryable\":true}")
      (func (export "run")
        (call $fail (i32.const 0) (i32.const 55))))
  "#;

  let err = execute(wat, Vec::new()).await.unwrap_err();

  let app = err.as_application().expect("should be an application error");
  assert_eq!(app.message(), "boom");
  assert_eq!(app.error_type(), "Custom");
  assert!(!app.is_retryable());
  assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_no_completion() {
  let wat = r#"(module (memory (export "memory") 1) (func (export "run")))"#;

  let err = execute(wat, Vec::new()).await.unwrap_err();

  assert!(matches!(
    err,
    WorkflowError::Internal(InternalError::NoCompletion)
  ));
  assert_eq!(err.to_string(), "entry point returned without completing");
}

#[tokio::test]
async fn test_trap_after_completion_keeps_value() {
  let wat = r#"
    (module
      (import "env" "complete" (func $complete (param i32 i32)))
      (memory (export "memory") 1)
      (data (i32.const 0) "[]")
      (func (export "run")
        (call $complete (i32.const 0) (i32.const 2))
        unreachable))
  "#;
  assert!(execute(wat, Vec::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_trap_without_completion() {
  let wat = r#"(module (func (export "run") unreachable))"#;

  let err = execute(wat, Vec::new()).await.unwrap_err();

  assert!(matches!(
    err,
    WorkflowError::Internal(InternalError::Host(HostError::Runtime { .. }))
  ));
}

#[tokio::test]
async fn test_second_completion_ignored() {
  let wat = r#"
    (module
      (import "env" "complete" (func $complete (param i32 i32)))
      (import "env" "complete_with_failure" (func $fail (param i32 i32)))
      (memory (export "memory") 1)
      (data (i32.const 0) "[{\"data\":\"NDI=\"}]")
      (data (i32.const 64) "{\"message\":\"late\"}")
      (func (export "run")
        (call $complete (i32.const 0) (i32.const 17))
        (call $fail (i32.const 64) (i32.const 18))
        (call $complete (i32.const 0) (i32.const 2))))
  "#;
  let result = execute(wat, Vec::new()).await.unwrap();
  assert_eq!(result, vec![Payload::new(b"42".to_vec())]);
}

#[tokio::test]
async fn test_wrong_info_length_wins_over_later_completion() {
  let wat = r#"
    (module
      (import "env" "get_info_len" (func $get_info_len (result i32)))
      (import "env" "get_info" (func $get_info (param i32 i32)))
      (import "env" "complete" (func $complete (param i32 i32)))
      (memory (export "memory") 1)
      (data (i32.const 0) "[]")
      (func (export "run")
        (call $get_info
          (i32.const 1024)
          (i32.add (call $get_info_len) (i32.const 1)))
        (call $complete (i32.const 0) (i32.const 2))))
  "#;

  let err = execute(wat, vec![Payload::new(b"x".to_vec())]).await.unwrap_err();

  assert!(matches!(
    err,
    WorkflowError::Internal(InternalError::Host(HostError::InvalidLength { .. }))
  ));
}

#[tokio::test]
async fn test_out_of_bounds_completion() {
  let wat = r#"
    (module
      (import "env" "complete" (func $complete (param i32 i32)))
      (memory (export "memory") 1)
      (func (export "run")
        (call $complete (i32.const 65535) (i32.const 2))))
  "#;

  let err = execute(wat, Vec::new()).await.unwrap_err();

  assert!(matches!(
    err,
    WorkflowError::Internal(InternalError::Host(HostError::MemoryAccess { .. }))
  ));
}

#[tokio::test]
async fn test_malformed_completion_value() {
  let wat = r#"
    (module
      (import "env" "complete" (func $complete (param i32 i32)))
      (memory (export "memory") 1)
      (data (i32.const 0) "{oops")
      (func (export "run")
        (call $complete (i32.const 0) (i32.const 5))))
  "#;

  let err = execute(wat, Vec::new()).await.unwrap_err();

  assert!(matches!(
    err,
    WorkflowError::Internal(InternalError::CompletionDecode(_))
  ));
}

/// Reads exactly as many info bytes as `{"params":[{"data":"NDI="}]}` has,
/// so it only completes when the module parameter was stripped.
const EXPECT_SINGLE_42_PARAM: &str = r#"
  (module
    (import "env" "get_info" (func $get_info (param i32 i32)))
    (import "env" "complete" (func $complete (param i32 i32)))
    (memory (export "memory") 1)
    (data (i32.const 0) "[]")
    (func (export "run")
      (call $get_info (i32.const 1024) (i32.const 28))
      (call $complete (i32.const 0) (i32.const 2))))
"#;

#[tokio::test]
async fn test_module_from_first_param() {
  let expected_info = encode_info(&RunInfo::new(vec![Payload::new(b"42".to_vec())])).unwrap();
  assert_eq!(expected_info.len(), 28);

  let workflow = WasmWorkflow::new(WorkflowConfig::from_first_param()).unwrap();
  let params = vec![
    Payload::binary(EXPECT_SINGLE_42_PARAM),
    Payload::new(b"42".to_vec()),
  ];

  let result = workflow
    .execute(&LocalContext::current(), params)
    .await
    .unwrap();
  assert!(result.is_empty());
}

#[tokio::test]
async fn test_first_param_not_binary() {
  let workflow = WasmWorkflow::new(WorkflowConfig::from_first_param()).unwrap();
  let ctx = LocalContext::current();

  let err = workflow
    .execute(&ctx, vec![Payload::json("hello").unwrap()])
    .await
    .unwrap_err();
  assert!(matches!(err, WorkflowError::ModuleNotInFirstParam));

  let err = workflow.execute(&ctx, Vec::new()).await.unwrap_err();
  assert!(matches!(err, WorkflowError::ModuleNotInFirstParam));
}

#[tokio::test]
async fn test_first_param_malformed_module() {
  let workflow = WasmWorkflow::new(WorkflowConfig::from_first_param()).unwrap();

  let err = workflow
    .execute(
      &LocalContext::current(),
      vec![Payload::binary(b"\0asm\x01\0\0\0junk".to_vec())],
    )
    .await
    .unwrap_err();
  assert!(matches!(err, WorkflowError::Host(HostError::Decode { .. })));
}

#[tokio::test]
async fn test_module_from_file() {
  let mut file = tempfile::NamedTempFile::new().unwrap();
  file.write_all(COMPLETE_42.as_bytes()).unwrap();

  let workflow = WasmWorkflow::new(WorkflowConfig::from_file(file.path())).unwrap();
  let result = workflow
    .execute(&LocalContext::current(), Vec::new())
    .await
    .unwrap();
  assert_eq!(result, vec![Payload::new(b"42".to_vec())]);
}

#[tokio::test]
async fn test_missing_module_file() {
  let dir = tempfile::tempdir().unwrap();
  let err = WasmWorkflow::new(WorkflowConfig::from_file(dir.path().join("missing.wasm")))
    .err()
    .unwrap();
  assert!(matches!(err, WorkflowError::ModuleRead { .. }));
}

#[tokio::test]
async fn test_static_module_errors_surface_at_construction() {
  let err = WasmWorkflow::new(WorkflowConfig::from_bytes(b"\0asm\x01\0\0\0junk".to_vec()))
    .err()
    .unwrap();
  assert!(matches!(err, WorkflowError::Host(HostError::Decode { .. })));

  let err = WasmWorkflow::new(WorkflowConfig::default()).err().unwrap();
  assert!(matches!(err, WorkflowError::ModuleNotConfigured));
}

#[tokio::test]
async fn test_instantiation_errors_surface_before_run() {
  let workflow =
    WasmWorkflow::new(WorkflowConfig::from_bytes(r#"(module (func (export "main")))"#)).unwrap();

  let err = workflow
    .execute(&LocalContext::current(), Vec::new())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    WorkflowError::Host(HostError::MissingExport { .. })
  ));
}

#[tokio::test]
async fn test_workflow_reused_across_invocations() {
  let workflow = WasmWorkflow::new(WorkflowConfig::from_bytes(COMPLETE_42)).unwrap();
  let ctx = LocalContext::current();

  for _ in 0..3 {
    let result = workflow.execute(&ctx, Vec::new()).await.unwrap();
    assert_eq!(result, vec![Payload::new(b"42".to_vec())]);
  }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_timeout_cancels_invocation() {
  let config = WorkflowConfig::from_bytes(r#"(module (func (export "run") (loop $l (br $l))))"#)
    .with_engine_config(wasmflow_host::EngineConfig {
      fuel: Some(500_000_000),
      ..Default::default()
    });
  let workflow = WasmWorkflow::new(config).unwrap();
  let ctx = LocalContext::current().with_timeout(Duration::from_millis(1));

  // The loop is bounded by fuel, so the abandoned task still ends
  let err = workflow.execute(&ctx, Vec::new()).await.unwrap_err();
  assert!(matches!(err, WorkflowError::Cancelled));
  assert!(!err.is_retryable());
}
