use std::time::{Duration, Instant};

use super::IntegrationError;

/// Partial result of one worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    /// +1 per point under a positive curve value, -1 per point over a negative one.
    pub signed: i64,
    /// Number of points that contributed to `signed`.
    pub hits: u64,
}

impl Tally {
    #[inline(always)]
    pub fn record(&mut self, contribution: i64) {
        self.signed += contribution;
        self.hits += contribution.unsigned_abs();
    }

    #[inline]
    pub fn merge(self, other: Self) -> Self {
        Self {
            signed: self.signed + other.signed,
            hits: self.hits + other.hits,
        }
    }
}

impl std::iter::Sum for Tally {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Self::merge)
    }
}

/// Wall-clock limit measured from the moment it was armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    /// Arms a deadline `limit` from now.
    pub fn after(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    #[inline]
    pub fn limit(&self) -> Duration {
        self.limit
    }

    #[inline]
    pub fn expired(&self) -> bool {
        self.started.elapsed() >= self.limit
    }

    /// Returns `DeadlineExceeded` once the limit has passed.
    #[inline]
    pub fn check(&self) -> Result<(), IntegrationError> {
        if self.expired() {
            Err(IntegrationError::DeadlineExceeded { limit: self.limit })
        } else {
            Ok(())
        }
    }
}
