//! Monte Carlo integration engines.

pub mod mc_engine;
pub mod mc_parallel;
pub mod partition;
pub mod sequential;

pub use mc_engine::MonteCarloIntegrator;
pub use mc_parallel::ThreadPoolBackend;
pub use partition::{PartitionPolicy, split_samples};
pub use sequential::{mc_integral_sequential, sample_tally};

use crate::core::{ComputeBackend, Estimate, IntegrationError};
use crate::math::CubicIntegral;

/// Parallel estimate over `backend` with exact partitioning and its native
/// worker count.
pub fn mc_integral_parallel<B: ComputeBackend + ?Sized>(
    problem: &CubicIntegral,
    n_samples: u64,
    backend: &B,
    seed: u64,
) -> Result<Estimate, IntegrationError> {
    MonteCarloIntegrator::new(n_samples, seed).integrate_parallel(problem, backend)
}
