//! Rayon thread-pool backend for the parallel estimator.
//!
//! Each worker seeds its own generator from the dispatch seed and its index,
//! runs the sequential sampler over its share and writes one [`Tally`]. The
//! pool is owned by the backend and joined on drop.

use rayon::prelude::*;
use tracing::debug;

use crate::core::{ComputeBackend, IntegrationError, KernelJob, Tally};
use crate::engines::monte_carlo::sequential::sample_tally;
use crate::math::fast_rng::{FastRng, stream_seed};

/// CPU backend running one rayon task per worker.
#[derive(Debug)]
pub struct ThreadPoolBackend {
    pool: rayon::ThreadPool,
    name: String,
}

impl ThreadPoolBackend {
    /// Builds a dedicated pool; `num_threads == 0` uses one thread per core.
    pub fn new(num_threads: usize) -> Result<Self, IntegrationError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("matecarlo-worker-{i}"))
            .build()
            .map_err(|e| IntegrationError::BackendUnavailable(format!("thread pool: {e}")))?;
        let name = format!("rayon thread pool ({} threads)", pool.current_num_threads());
        debug!(threads = pool.current_num_threads(), "thread pool ready");

        Ok(Self { pool, name })
    }

    /// Pool sized to the available cores.
    pub fn discover() -> Result<Self, IntegrationError> {
        Self::new(0)
    }
}

impl ComputeBackend for ThreadPoolBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_units(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn dispatch(&self, job: &KernelJob<'_>) -> Result<Vec<Tally>, IntegrationError> {
        self.pool.install(|| {
            job.shares
                .par_iter()
                .enumerate()
                .map(|(worker, &share)| {
                    let mut rng = FastRng::from_seed(job.rng_kind, stream_seed(job.seed, worker));
                    sample_tally(job.problem, share, &mut rng, job.deadline.as_ref())
                })
                .collect()
        })
    }
}
