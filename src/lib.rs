//! Matecarlo estimates the definite integral of a cubic `(x - a)(x - b)(x - c)`
//! by hit-or-miss Monte Carlo sampling, once on a single CPU thread and once
//! split across a parallel compute backend, and times both.
//!
//! The integrand is bounded by a rectangle derived from its roots. Every
//! sample is a uniform point in that rectangle; points between the axis and
//! the curve count +1 above the axis and -1 below it, and the estimate is the
//! net count over the budget times the rectangle's area.
//!
//! References:
//! - Glasserman (2004), Ch. 1 for hit-or-miss estimators and their variance.
//! - Blackman and Vigna (2018) for xoshiro256++.
//! - O'Neill (2014) for the PCG family.
//!
//! Numerical considerations:
//! - The estimator is unbiased with standard error `O(1 / sqrt(N))`; each
//!   [`core::Estimate`] carries its own.
//! - Parallel runs seed each worker from the base seed and worker index, so
//!   a fixed seed reproduces the same estimate on the same backend and worker
//!   count.
//! - The GPU kernel keeps 32-bit counters per worker; shares above
//!   `i32::MAX` are rejected rather than wrapped.
//!
//! # Feature Flags
//! - `gpu`: enables the `wgpu` compute-shader backend
//!   ([`engines::gpu::GpuBackend`]).
//!
//! # Quick Start
//! Estimate one integral sequentially:
//! ```rust
//! use matecarlo::engines::monte_carlo::MonteCarloIntegrator;
//! use matecarlo::math::CubicIntegral;
//!
//! let problem = CubicIntegral::from_id("231RDB026").unwrap();
//! let estimate = MonteCarloIntegrator::new(200_000, 7)
//!     .integrate_sequential(&problem)
//!     .unwrap();
//! assert!((estimate.value - problem.analytic_value()).abs() < 5.0 * estimate.stderr + 1.0);
//! ```
//!
//! Spread the same budget over a thread pool:
//! ```rust
//! use matecarlo::engines::monte_carlo::{MonteCarloIntegrator, ThreadPoolBackend};
//! use matecarlo::math::CubicIntegral;
//!
//! let problem = CubicIntegral::from_roots(0, 2, 6).unwrap();
//! let backend = ThreadPoolBackend::new(4).unwrap();
//! let estimate = MonteCarloIntegrator::new(200_000, 7)
//!     .integrate_parallel(&problem, &backend)
//!     .unwrap();
//! assert_eq!(estimate.samples_drawn, 200_000);
//! ```

pub mod benchmark;
pub mod core;
pub mod engines;
pub mod math;

/// Common imports for ergonomic usage.
pub mod prelude {
    pub use crate::benchmark::{BenchmarkConfig, OutputFormat, PlannedRun, run_benchmark};
    pub use crate::core::*;
    pub use crate::engines::monte_carlo::{
        MonteCarloIntegrator, PartitionPolicy, ThreadPoolBackend, mc_integral_parallel,
        mc_integral_sequential,
    };
    pub use crate::math::{CubicIntegral, FastRngKind};
}
