use std::time::Duration;

use tracing::{debug, warn};

use crate::core::{ComputeBackend, DiagKey, Deadline, Estimate, IntegrationError, KernelJob};
use crate::engines::monte_carlo::partition::{PartitionPolicy, split_samples};
use crate::engines::monte_carlo::sequential::sample_tally;
use crate::math::CubicIntegral;
use crate::math::fast_rng::{FastRng, FastRngKind};

/// Configured Monte Carlo integrator.
///
/// One value drives both the sequential reference run and dispatches to any
/// [`ComputeBackend`], so both estimators see the same budget, seed and limits.
#[derive(Debug, Clone)]
pub struct MonteCarloIntegrator {
    /// Requested sample budget.
    pub num_samples: u64,
    /// Base RNG seed.
    pub seed: u64,
    /// Generator used by the sequential run and by CPU workers.
    pub rng_kind: FastRngKind,
    /// Worker split policy for parallel runs.
    pub partition: PartitionPolicy,
    /// Worker count override; `None` asks the backend.
    pub workers: Option<usize>,
    /// Wall-clock limit per run.
    pub deadline: Option<Duration>,
}

impl MonteCarloIntegrator {
    /// Creates an integrator with the default generator and exact partitioning.
    pub fn new(num_samples: u64, seed: u64) -> Self {
        Self {
            num_samples,
            seed,
            rng_kind: FastRngKind::default(),
            partition: PartitionPolicy::default(),
            workers: None,
            deadline: None,
        }
    }

    pub fn with_rng_kind(mut self, rng_kind: FastRngKind) -> Self {
        self.rng_kind = rng_kind;
        self
    }

    pub fn with_partition(mut self, partition: PartitionPolicy) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Same configuration with a different budget.
    pub fn with_num_samples(mut self, num_samples: u64) -> Self {
        self.num_samples = num_samples;
        self
    }

    fn validate(&self) -> Result<(), IntegrationError> {
        if self.num_samples == 0 {
            return Err(IntegrationError::InvalidArgument(
                "num_samples must be > 0".to_string(),
            ));
        }
        if self.workers == Some(0) {
            return Err(IntegrationError::InvalidArgument(
                "workers must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Single-threaded run on the calling thread.
    pub fn integrate_sequential(
        &self,
        problem: &CubicIntegral,
    ) -> Result<Estimate, IntegrationError> {
        self.validate()?;
        let deadline = self.deadline.map(Deadline::after);
        let mut rng = FastRng::from_seed(self.rng_kind, self.seed);
        let tally = sample_tally(problem, self.num_samples, &mut rng, deadline.as_ref())?;

        let mut estimate =
            Estimate::from_tally(tally, self.num_samples, self.num_samples, problem.area());
        estimate.diagnostics.insert(DiagKey::NumWorkers, 1.0);
        Ok(estimate)
    }

    /// Splits the budget over the backend's workers and sums their tallies.
    pub fn integrate_parallel<B>(
        &self,
        problem: &CubicIntegral,
        backend: &B,
    ) -> Result<Estimate, IntegrationError>
    where
        B: ComputeBackend + ?Sized,
    {
        self.validate()?;
        let workers = self.workers.unwrap_or_else(|| backend.compute_units()).max(1);
        let shares = split_samples(self.num_samples, workers, self.partition);
        let drawn: u64 = shares.iter().sum();
        if drawn != self.num_samples {
            warn!(
                requested = self.num_samples,
                drawn,
                workers,
                "partition does not draw the requested budget"
            );
        }
        debug!(
            backend = backend.name(),
            workers,
            share = shares[0],
            policy = %self.partition,
            "dispatching"
        );

        let job = KernelJob {
            problem,
            shares: &shares,
            seed: self.seed,
            rng_kind: self.rng_kind,
            deadline: self.deadline.map(Deadline::after),
        };
        let tallies = backend.dispatch(&job)?;
        if tallies.len() != shares.len() {
            return Err(IntegrationError::Dispatch(format!(
                "backend returned {} tallies for {} workers",
                tallies.len(),
                shares.len()
            )));
        }

        let total = tallies.into_iter().sum();
        let mut estimate = Estimate::from_tally(total, self.num_samples, drawn, problem.area());
        estimate.diagnostics.insert(DiagKey::NumWorkers, workers as f64);
        estimate.diagnostics.insert(DiagKey::WorkerShare, shares[0] as f64);
        Ok(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::monte_carlo::ThreadPoolBackend;

    fn problem() -> CubicIntegral {
        CubicIntegral::from_id("231RDB026").unwrap()
    }

    #[test]
    fn sequential_run_is_within_two_percent_of_analytic() {
        let problem = problem();
        let estimate = MonteCarloIntegrator::new(2_000_000, 42)
            .integrate_sequential(&problem)
            .expect("sequential run succeeds");
        let exact = problem.analytic_value();
        let rel_err = ((estimate.value - exact) / exact).abs();
        assert!(
            rel_err <= 0.02,
            "MC/analytic relative error too high: mc={} exact={} rel_err={}",
            estimate.value,
            exact,
            rel_err
        );
    }

    #[test]
    fn truncated_partition_keeps_historical_divisor() {
        let backend = ThreadPoolBackend::new(2).unwrap();
        let estimate = MonteCarloIntegrator::new(10, 1)
            .with_workers(4)
            .with_partition(PartitionPolicy::Truncate)
            .integrate_parallel(&problem(), &backend)
            .unwrap();
        assert_eq!(estimate.samples_requested, 10);
        assert_eq!(estimate.samples_drawn, 8);
        assert_eq!(estimate.diagnostics.get("worker_share"), Some(2.0));
    }

    #[test]
    fn exact_partition_draws_full_budget() {
        let backend = ThreadPoolBackend::new(2).unwrap();
        let estimate = MonteCarloIntegrator::new(10, 1)
            .with_workers(4)
            .integrate_parallel(&problem(), &backend)
            .unwrap();
        assert_eq!(estimate.samples_drawn, 10);
        assert_eq!(estimate.diagnostics.get("num_workers"), Some(4.0));
    }

    #[test]
    fn zero_workers_rejected() {
        let backend = ThreadPoolBackend::new(1).unwrap();
        let err = MonteCarloIntegrator::new(10, 1)
            .with_workers(0)
            .integrate_parallel(&problem(), &backend)
            .unwrap_err();
        assert!(matches!(err, IntegrationError::InvalidArgument(_)));
    }

    #[test]
    fn zero_samples_rejected_by_both_estimators() {
        let backend = ThreadPoolBackend::new(1).unwrap();
        let integrator = MonteCarloIntegrator::new(0, 1);
        assert!(integrator.integrate_sequential(&problem()).is_err());
        assert!(integrator.integrate_parallel(&problem(), &backend).is_err());
    }
}
