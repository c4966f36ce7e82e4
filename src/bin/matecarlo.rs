//! Command-line entry point for the Monte Carlo timing sweep.
//!
//! Runs the sequential and parallel estimators over a plan of sample counts
//! and prints the estimate and wall-clock time of every run.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use matecarlo::benchmark::{BenchmarkConfig, DEFAULT_ID, OutputFormat, run_benchmark};
use matecarlo::core::{ComputeBackend, IntegrationError};
use matecarlo::engines::monte_carlo::{PartitionPolicy, ThreadPoolBackend};
use matecarlo::math::FastRngKind;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendChoice {
    /// wgpu compute shader
    Gpu,
    /// rayon thread pool
    Threads,
}

/// Monte Carlo integration of (x - a)(x - b)(x - c), sequential vs parallel
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Identifier whose characters 6..=8 are the roots a, b, c
    #[arg(long, default_value = DEFAULT_ID)]
    id: String,

    /// Parallel backend (defaults to gpu when built with the `gpu` feature)
    #[arg(long, value_enum)]
    backend: Option<BackendChoice>,

    /// WGSL kernel file replacing the built-in kernel
    #[arg(long, value_name = "PATH")]
    kernel: Option<PathBuf>,

    /// Parallel worker count (defaults to the backend's capacity)
    #[arg(long)]
    workers: Option<usize>,

    /// Base RNG seed (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// CPU random generator
    #[arg(long, default_value_t = FastRngKind::default())]
    rng: FastRngKind,

    /// How the budget is split across workers
    #[arg(long, default_value_t = PartitionPolicy::default())]
    partition: PartitionPolicy,

    /// Wall-clock limit per run in milliseconds
    #[arg(long, value_name = "MS")]
    deadline_ms: Option<u64>,

    /// Sample counts to run both estimators on, replacing the historical plan
    #[arg(long, value_delimiter = ',', value_name = "N,N,...")]
    sizes: Vec<u64>,

    /// Emit one JSON report per line instead of text
    #[arg(long)]
    json: bool,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let backend = open_backend(&args).context("failed to initialize compute backend")?;

    let mut config = BenchmarkConfig {
        id: args.id.clone(),
        seed: args.seed,
        rng_kind: args.rng,
        partition: args.partition,
        workers: args.workers,
        deadline: args.deadline_ms.map(Duration::from_millis),
        output: if args.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        },
        ..BenchmarkConfig::default()
    };
    if !args.sizes.is_empty() {
        config.plan = BenchmarkConfig::plan_for_sizes(&args.sizes);
    }

    let stdout = io::stdout();
    run_benchmark(&config, backend.as_ref(), &mut stdout.lock())
        .with_context(|| format!("benchmark for id `{}` failed", config.id))?;

    Ok(())
}

fn open_backend(args: &Args) -> Result<Box<dyn ComputeBackend>, IntegrationError> {
    let choice = args.backend.unwrap_or(if cfg!(feature = "gpu") {
        BackendChoice::Gpu
    } else {
        BackendChoice::Threads
    });
    tracing::info!(backend = ?choice, "opening backend");

    match choice {
        BackendChoice::Threads => {
            if args.kernel.is_some() {
                tracing::warn!("--kernel is ignored by the thread-pool backend");
            }
            let backend = ThreadPoolBackend::discover()?;
            Ok(Box::new(backend))
        }
        BackendChoice::Gpu => open_gpu(args),
    }
}

#[cfg(feature = "gpu")]
fn open_gpu(args: &Args) -> Result<Box<dyn ComputeBackend>, IntegrationError> {
    use matecarlo::engines::gpu::{GpuBackend, KernelSource};

    let kernel = match &args.kernel {
        Some(path) => KernelSource::from_file(path)?,
        None => KernelSource::builtin(),
    };
    let mut backend = GpuBackend::discover(&kernel)?;
    if let Some(workers) = args.workers {
        backend = backend.with_workers(workers)?;
    }
    Ok(Box::new(backend))
}

#[cfg(not(feature = "gpu"))]
fn open_gpu(_args: &Args) -> Result<Box<dyn ComputeBackend>, IntegrationError> {
    Err(IntegrationError::BackendUnavailable(
        "built without the `gpu` feature; use --backend threads".to_string(),
    ))
}

fn setup_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}
