//! Core traits, common result types and the library-wide error enum.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::math::{CubicIntegral, FastRngKind};

pub mod diagnostics;
pub mod types;

pub use diagnostics::{DiagKey, Diagnostics};
pub use types::*;

/// Parallel execution backend for the sampling kernel.
///
/// A backend is discovered once (device lookup and kernel build happen in its
/// constructor), dispatched any number of times and releases its resources on
/// drop.
pub trait ComputeBackend {
    /// Human-readable device or pool name.
    fn name(&self) -> &str;

    /// Number of independent workers a single dispatch runs.
    fn compute_units(&self) -> usize;

    /// Runs one worker per entry of `job.shares` and reads back one tally per
    /// worker, in worker order.
    fn dispatch(&self, job: &KernelJob<'_>) -> Result<Vec<Tally>, IntegrationError>;
}

/// Read-only parameter block shared by every worker of a dispatch.
#[derive(Debug, Clone, Copy)]
pub struct KernelJob<'a> {
    /// Integrand and bounding rectangle.
    pub problem: &'a CubicIntegral,
    /// Sample count per worker.
    pub shares: &'a [u64],
    /// Base seed; each worker derives its own stream from it.
    pub seed: u64,
    /// Generator for CPU workers. Device kernels carry their own.
    pub rng_kind: FastRngKind,
    /// Optional wall-clock limit for the whole dispatch.
    pub deadline: Option<Deadline>,
}

/// Monte Carlo estimate of a definite integral.
#[derive(Debug, Clone, Serialize)]
pub struct Estimate {
    /// Estimated signed area.
    pub value: f64,
    /// Standard error of `value`.
    pub stderr: f64,
    /// Sample budget the caller asked for.
    pub samples_requested: u64,
    /// Samples actually drawn across all workers.
    pub samples_drawn: u64,
    /// Net signed count over all workers.
    pub signed_count: i64,
    /// Engine-specific scalar diagnostics.
    pub diagnostics: Diagnostics,
}

impl Estimate {
    /// Builds an estimate as `signed / divisor * area`.
    ///
    /// `divisor` is the requested budget. The standard error uses the number
    /// of samples actually drawn.
    pub fn from_tally(tally: Tally, divisor: u64, samples_drawn: u64, area: f64) -> Self {
        let value = tally.signed as f64 / divisor as f64 * area;
        let stderr = if samples_drawn > 1 {
            let n = samples_drawn as f64;
            let mean = tally.signed as f64 / n;
            let second_moment = tally.hits as f64 / n;
            area * ((second_moment - mean * mean).max(0.0) / n).sqrt()
        } else {
            0.0
        };

        let mut diagnostics = Diagnostics::new();
        diagnostics.insert(DiagKey::NumSamples, divisor as f64);
        diagnostics.insert(DiagKey::SamplesDrawn, samples_drawn as f64);
        diagnostics.insert(DiagKey::SignedCount, tally.signed as f64);
        diagnostics.insert(DiagKey::Hits, tally.hits as f64);
        diagnostics.insert(DiagKey::DomainArea, area);

        Self {
            value,
            stderr,
            samples_requested: divisor,
            samples_drawn,
            signed_count: tally.signed,
            diagnostics,
        }
    }
}

/// Errors surfaced by estimators and compute backends.
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    /// Caller-supplied value out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// No parallel-compute platform or device could be acquired.
    #[error("compute backend unavailable: {0}")]
    BackendUnavailable(String),
    /// Kernel source failed to compile or validate.
    #[error("kernel build failed:\n{log}")]
    KernelBuildFailure { log: String },
    /// Kernel source file could not be read.
    #[error("failed to read kernel source {}: {source}", path.display())]
    KernelIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Device submission or result readback failed.
    #[error("dispatch failed: {0}")]
    Dispatch(String),
    /// The run did not finish within its wall-clock limit.
    #[error("deadline of {limit:?} exceeded")]
    DeadlineExceeded { limit: Duration },
    /// Benchmark report could not be written.
    #[error("failed to write report: {0}")]
    Report(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn estimate_scales_signed_fraction_by_area() {
        let tally = Tally { signed: -25, hits: 75 };
        let estimate = Estimate::from_tally(tally, 100, 100, 448.0);
        assert_relative_eq!(estimate.value, -112.0, epsilon = 1e-12);
        assert_eq!(estimate.diagnostics.get("hits"), Some(75.0));
    }

    #[test]
    fn estimate_stderr_uses_drawn_samples() {
        let tally = Tally { signed: 0, hits: 8 };
        let estimate = Estimate::from_tally(tally, 10, 8, 1.0);
        // every drawn sample hit, half positive and half negative
        assert_relative_eq!(estimate.stderr, (1.0_f64 / 8.0).sqrt(), epsilon = 1e-12);
        assert_eq!(estimate.samples_requested, 10);
        assert_eq!(estimate.samples_drawn, 8);
    }

    #[test]
    fn build_failure_message_carries_log() {
        let err = IntegrationError::KernelBuildFailure {
            log: "error: unknown identifier `foo`".to_string(),
        };
        assert!(err.to_string().contains("unknown identifier"));
    }
}
