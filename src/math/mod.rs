//! Integrands, quadrature references and random sources.

pub mod cubic;
pub mod fast_rng;
pub mod quadrature;

pub use cubic::{Cubic, CubicIntegral, IntegrationDomain, signed_contribution};
pub use fast_rng::{FastRng, FastRngKind, UniformSource, stream_seed};
