use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wasmflow_payload::{ENCODING_JSON, Payload};
use wasmflow_workflow::{LocalContext, WasmWorkflow, WorkflowConfig, WorkflowSettings};

/// Wasmflow - run WebAssembly modules as workflow bodies
#[derive(Parser)]
#[command(name = "wasmflow")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a module once and print its completion value
  Run {
    /// Path to the module (binary or text format)
    module: PathBuf,

    /// Workflow parameter as JSON; repeat for more parameters
    #[arg(long = "param", value_name = "JSON")]
    params: Vec<String>,

    /// Pass the module bytes as the first parameter instead of loading it up front
    #[arg(long)]
    binary_first: bool,

    /// Cancel the run after this many milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Fuel budget for the module
    #[arg(long)]
    fuel: Option<u64>,
  },
}

struct RunArgs {
  module: PathBuf,
  params: Vec<String>,
  binary_first: bool,
  timeout_ms: Option<u64>,
  fuel: Option<u64>,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(std::io::stderr)
    .init();

  match cli.command {
    Some(Commands::Run {
      module,
      params,
      binary_first,
      timeout_ms,
      fuel,
    }) => {
      run_module(RunArgs {
        module,
        params,
        binary_first,
        timeout_ms,
        fuel,
      })?;
    }
    None => {
      println!("wasmflow - use --help to see available commands");
    }
  }

  Ok(())
}

fn run_module(args: RunArgs) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  let result = rt.block_on(async { run_module_async(args).await });
  // A timed-out module is abandoned and may still be running
  rt.shutdown_background();
  result
}

async fn run_module_async(args: RunArgs) -> Result<()> {
  let mut params = args
    .params
    .iter()
    .map(|raw| {
      let value: serde_json::Value =
        serde_json::from_str(raw).with_context(|| format!("failed to parse param: {raw}"))?;
      Payload::json(&value).context("failed to encode param")
    })
    .collect::<Result<Vec<_>>>()?;

  let mut settings = WorkflowSettings {
    fuel: args.fuel,
    ..Default::default()
  };
  if args.binary_first {
    let bytes = tokio::fs::read(&args.module)
      .await
      .with_context(|| format!("failed to read module: {}", args.module.display()))?;
    params.insert(0, Payload::binary(bytes));
    settings.module_from_first_param = true;
  } else {
    settings.module_path = Some(args.module.clone());
  }

  let config = WorkflowConfig::try_from(settings).context("invalid workflow settings")?;
  let workflow = WasmWorkflow::new(config)
    .with_context(|| format!("failed to load module: {}", args.module.display()))?;

  let mut ctx = LocalContext::current();
  if let Some(ms) = args.timeout_ms {
    ctx = ctx.with_timeout(Duration::from_millis(ms));
  }

  let outputs = workflow
    .execute(&ctx, params)
    .await
    .context("module run failed")?;

  let rendered = outputs
    .iter()
    .map(render_payload)
    .collect::<Vec<_>>();
  println!("{}", serde_json::to_string_pretty(&rendered)?);

  Ok(())
}

/// JSON payloads print as their value, everything else as base64.
fn render_payload(payload: &Payload) -> serde_json::Value {
  if payload.encoding() == Some(ENCODING_JSON)
    && let Ok(value) = payload.decode_json::<serde_json::Value>()
  {
    return value;
  }
  serde_json::Value::String(STANDARD.encode(&payload.data))
}
