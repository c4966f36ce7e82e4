//! Timed sweep of sequential and parallel runs over one problem.
//!
//! The default [`BenchmarkConfig`] reproduces the historical sweep: identifier
//! `231RDB026`, sequential runs at 10^7, 10^8 and 10^9 points interleaved with
//! parallel runs from 10^3 to 10^9 points.

use std::io::Write;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::core::{ComputeBackend, Estimate, IntegrationError};
use crate::engines::monte_carlo::{MonteCarloIntegrator, PartitionPolicy};
use crate::math::CubicIntegral;
use crate::math::fast_rng::{FastRngKind, entropy_seed};

pub const DEFAULT_ID: &str = "231RDB026";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    Sequential,
    Parallel,
}

impl std::fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Sequential => "Sequential",
            Self::Parallel => "Parallel",
        })
    }
}

/// One entry of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedRun {
    pub estimator: EstimatorKind,
    pub samples: u64,
}

impl PlannedRun {
    pub fn sequential(samples: u64) -> Self {
        Self {
            estimator: EstimatorKind::Sequential,
            samples,
        }
    }

    pub fn parallel(samples: u64) -> Self {
        Self {
            estimator: EstimatorKind::Parallel,
            samples,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable timing lines.
    #[default]
    Text,
    /// One JSON [`RunReport`] per line.
    Json,
}

#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Identifier whose digits 6..=8 are the cubic's roots.
    pub id: String,
    pub plan: Vec<PlannedRun>,
    /// `None` draws a fresh seed per sweep.
    pub seed: Option<u64>,
    pub rng_kind: FastRngKind,
    pub partition: PartitionPolicy,
    pub workers: Option<usize>,
    pub deadline: Option<Duration>,
    pub output: OutputFormat,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_ID.to_string(),
            plan: Self::historical_plan(),
            seed: None,
            rng_kind: FastRngKind::default(),
            partition: PartitionPolicy::default(),
            workers: None,
            deadline: None,
            output: OutputFormat::default(),
        }
    }
}

impl BenchmarkConfig {
    pub fn historical_plan() -> Vec<PlannedRun> {
        vec![
            PlannedRun::sequential(10_000_000),
            PlannedRun::parallel(1_000),
            PlannedRun::parallel(10_000),
            PlannedRun::parallel(100_000),
            PlannedRun::parallel(1_000_000),
            PlannedRun::parallel(10_000_000),
            PlannedRun::parallel(100_000_000),
            PlannedRun::sequential(100_000_000),
            PlannedRun::parallel(1_000_000_000),
            PlannedRun::sequential(1_000_000_000),
        ]
    }

    /// Sequential then parallel run for each size.
    pub fn plan_for_sizes(sizes: &[u64]) -> Vec<PlannedRun> {
        sizes
            .iter()
            .flat_map(|&n| [PlannedRun::sequential(n), PlannedRun::parallel(n)])
            .collect()
    }

    pub fn with_plan(mut self, plan: Vec<PlannedRun>) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }
}

/// Outcome of one timed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub estimator: EstimatorKind,
    pub backend: String,
    pub samples: u64,
    pub elapsed_ms: u128,
    pub estimate: Estimate,
}

/// `1234567` -> `"1,234,567"`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Runs the configured sweep, writing one block per run to `out`.
///
/// The first failing run aborts the sweep.
pub fn run_benchmark<B, W>(
    config: &BenchmarkConfig,
    backend: &B,
    out: &mut W,
) -> Result<Vec<RunReport>, IntegrationError>
where
    B: ComputeBackend + ?Sized,
    W: Write,
{
    let problem = CubicIntegral::from_id(&config.id)?;
    let seed = config.seed.unwrap_or_else(entropy_seed);
    info!(id = %config.id, seed, runs = config.plan.len(), "starting sweep");

    let mut integrator = MonteCarloIntegrator::new(1, seed)
        .with_rng_kind(config.rng_kind)
        .with_partition(config.partition);
    integrator.workers = config.workers;
    integrator.deadline = config.deadline;

    if config.output == OutputFormat::Text {
        let (c, d) = (&problem.cubic, &problem.domain);
        writeln!(out, "a: {}, b: {}, c: {}", c.a, c.b, c.c)?;
        writeln!(
            out,
            "x_min: {}, x_max: {}, y_min: {}, y_max: {}",
            d.xmin, d.xmax, d.ymin, d.ymax
        )?;
        writeln!(
            out,
            "Device: {}, {} workers",
            backend.name(),
            config.workers.unwrap_or_else(|| backend.compute_units())
        )?;
    }

    let mut reports = Vec::with_capacity(config.plan.len());
    for run in &config.plan {
        let run_integrator = integrator.clone().with_num_samples(run.samples);
        let start = Instant::now();
        let estimate = match run.estimator {
            EstimatorKind::Sequential => run_integrator.integrate_sequential(&problem)?,
            EstimatorKind::Parallel => run_integrator.integrate_parallel(&problem, backend)?,
        };
        let elapsed = start.elapsed();

        let report = RunReport {
            estimator: run.estimator,
            backend: match run.estimator {
                EstimatorKind::Sequential => "cpu".to_string(),
                EstimatorKind::Parallel => backend.name().to_string(),
            },
            samples: run.samples,
            elapsed_ms: elapsed.as_millis(),
            estimate,
        };
        info!(
            estimator = %report.estimator,
            samples = report.samples,
            value = report.estimate.value,
            elapsed_ms = report.elapsed_ms as u64,
            "run finished"
        );

        match config.output {
            OutputFormat::Text => {
                writeln!(
                    out,
                    "\n{} estimator with {} points:",
                    report.estimator,
                    group_thousands(report.samples)
                )?;
                writeln!(out, "Definite integral = {:.5}", report.estimate.value)?;
                writeln!(out, "Elapsed time = {}ms", report.elapsed_ms)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut *out, &report).map_err(std::io::Error::from)?;
                writeln!(out)?;
            }
        }
        reports.push(report);
    }

    out.flush()?;
    Ok(reports)
}
