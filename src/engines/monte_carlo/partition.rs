//! Splitting a sample budget across parallel workers.

use serde::Serialize;

/// How a budget of N samples is divided among W workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionPolicy {
    /// Every worker gets `N / W`, the first `N % W` workers one more.
    /// Exactly N samples are drawn.
    #[default]
    Exact,
    /// Every worker gets `max(N / W, 1)` and the remainder is dropped.
    /// Reproduces the historical benchmark output.
    Truncate,
}

impl std::str::FromStr for PartitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "truncate" => Ok(Self::Truncate),
            other => Err(format!(
                "unknown partition policy `{other}` (expected exact or truncate)"
            )),
        }
    }
}

impl std::fmt::Display for PartitionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Exact => "exact",
            Self::Truncate => "truncate",
        })
    }
}

/// Per-worker sample counts, one entry per worker (`workers` is clamped to 1).
///
/// ```
/// use matecarlo::engines::monte_carlo::{PartitionPolicy, split_samples};
///
/// assert_eq!(split_samples(10, 4, PartitionPolicy::Exact), vec![3, 3, 2, 2]);
/// assert_eq!(split_samples(10, 4, PartitionPolicy::Truncate), vec![2, 2, 2, 2]);
/// ```
pub fn split_samples(n_samples: u64, workers: usize, policy: PartitionPolicy) -> Vec<u64> {
    let chunks = workers.max(1) as u64;
    let base = n_samples / chunks;
    match policy {
        PartitionPolicy::Exact => {
            let rem = n_samples % chunks;
            (0..chunks)
                .map(|i| if i < rem { base + 1 } else { base })
                .collect()
        }
        PartitionPolicy::Truncate => vec![base.max(1); chunks as usize],
    }
}
