//! Single-threaded hit-or-miss sampler.
//!
//! This is both the sequential reference estimator and the body every CPU
//! worker of the parallel estimator runs over its own share.

use crate::core::{Deadline, Estimate, IntegrationError, Tally};
use crate::math::{CubicIntegral, UniformSource};

/// Samples between two deadline checks.
const DEADLINE_CHECK_INTERVAL: u64 = 1 << 16;

#[inline(always)]
fn tally_block<R: UniformSource + ?Sized>(
    problem: &CubicIntegral,
    n_samples: u64,
    rng: &mut R,
    tally: &mut Tally,
) {
    let d = &problem.domain;
    let (xmin, xmax) = (d.xmin as f64, d.xmax as f64);
    let (ymin, ymax) = (d.ymin as f64, d.ymax as f64);

    for _ in 0..n_samples {
        let y = rng.uniform(ymin, ymax);
        let x = rng.uniform(xmin, xmax);
        tally.record(problem.contribution(x, y));
    }
}

/// Draws `n_samples` points and accumulates their signed classification.
///
/// With a deadline the loop runs in blocks and gives up with
/// `DeadlineExceeded` once the limit has passed.
pub fn sample_tally<R: UniformSource + ?Sized>(
    problem: &CubicIntegral,
    n_samples: u64,
    rng: &mut R,
    deadline: Option<&Deadline>,
) -> Result<Tally, IntegrationError> {
    let mut tally = Tally::default();
    let Some(deadline) = deadline else {
        tally_block(problem, n_samples, rng, &mut tally);
        return Ok(tally);
    };

    let mut remaining = n_samples;
    while remaining > 0 {
        deadline.check()?;
        let block = remaining.min(DEADLINE_CHECK_INTERVAL);
        tally_block(problem, block, rng, &mut tally);
        remaining -= block;
    }
    Ok(tally)
}

/// Sequential Monte Carlo estimate of the signed integral over the domain.
///
/// ```
/// use matecarlo::engines::monte_carlo::mc_integral_sequential;
/// use matecarlo::math::{CubicIntegral, FastRng, FastRngKind};
///
/// let problem = CubicIntegral::from_id("231RDB026").unwrap();
/// let mut rng = FastRng::from_seed(FastRngKind::Xoshiro256PlusPlus, 42);
/// let estimate = mc_integral_sequential(&problem, 100_000, &mut rng).unwrap();
/// assert!((estimate.value - problem.analytic_value()).abs() < 5.0);
/// ```
pub fn mc_integral_sequential<R: UniformSource + ?Sized>(
    problem: &CubicIntegral,
    n_samples: u64,
    rng: &mut R,
) -> Result<Estimate, IntegrationError> {
    if n_samples == 0 {
        return Err(IntegrationError::InvalidArgument(
            "n_samples must be > 0".to_string(),
        ));
    }
    let tally = sample_tally(problem, n_samples, rng, None)?;
    Ok(Estimate::from_tally(tally, n_samples, n_samples, problem.area()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::math::fast_rng::{FastRng, FastRngKind, Xoshiro256Rng};

    fn problem() -> CubicIntegral {
        CubicIntegral::from_roots(0, 2, 6).unwrap()
    }

    #[test]
    fn zero_samples_is_invalid_not_nan() {
        let mut rng = Xoshiro256Rng::seed_from_u64(1);
        let err = mc_integral_sequential(&problem(), 0, &mut rng).unwrap_err();
        assert!(matches!(err, IntegrationError::InvalidArgument(_)));
    }

    #[test]
    fn same_seed_same_estimate() {
        let mut a = FastRng::from_seed(FastRngKind::Pcg64, 11);
        let mut b = FastRng::from_seed(FastRngKind::Pcg64, 11);
        let ea = mc_integral_sequential(&problem(), 50_000, &mut a).unwrap();
        let eb = mc_integral_sequential(&problem(), 50_000, &mut b).unwrap();
        assert_eq!(ea.signed_count, eb.signed_count);
        assert_eq!(ea.value, eb.value);
    }

    #[test]
    fn blocked_sampling_matches_unblocked_stream() {
        let n = 3 * DEADLINE_CHECK_INTERVAL + 17;
        let deadline = Deadline::after(Duration::from_secs(3600));
        let mut a = Xoshiro256Rng::seed_from_u64(5);
        let mut b = Xoshiro256Rng::seed_from_u64(5);
        let plain = sample_tally(&problem(), n, &mut a, None).unwrap();
        let blocked = sample_tally(&problem(), n, &mut b, Some(&deadline)).unwrap();
        assert_eq!(plain, blocked);
    }

    #[test]
    fn expired_deadline_aborts_sampling() {
        let deadline = Deadline::after(Duration::ZERO);
        let mut rng = Xoshiro256Rng::seed_from_u64(5);
        let err = sample_tally(&problem(), 1_000, &mut rng, Some(&deadline)).unwrap_err();
        assert!(matches!(err, IntegrationError::DeadlineExceeded { .. }));
    }

    #[test]
    fn stderr_is_positive_and_small() {
        let mut rng = Xoshiro256Rng::seed_from_u64(3);
        let estimate = mc_integral_sequential(&problem(), 200_000, &mut rng).unwrap();
        assert!(estimate.stderr > 0.0 && estimate.stderr < 1.0, "{}", estimate.stderr);
        assert!(estimate.diagnostics.get("hits").unwrap() > 0.0);
    }
}
