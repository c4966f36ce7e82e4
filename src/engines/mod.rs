//! Estimator implementations and compute backends.

pub mod gpu;
pub mod monte_carlo;
