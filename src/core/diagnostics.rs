//! Fixed-capacity scalar diagnostics attached to every [`Estimate`](super::Estimate).

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Compact key set for estimator diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagKey {
    DomainArea,
    Hits,
    NumSamples,
    NumWorkers,
    SamplesDrawn,
    SignedCount,
    WorkerShare,
}

impl DiagKey {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DomainArea => "domain_area",
            Self::Hits => "hits",
            Self::NumSamples => "num_samples",
            Self::NumWorkers => "num_workers",
            Self::SamplesDrawn => "samples_drawn",
            Self::SignedCount => "signed_count",
            Self::WorkerShare => "worker_share",
        }
    }
}

impl std::str::FromStr for DiagKey {
    type Err = ();

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        match key {
            "domain_area" => Ok(Self::DomainArea),
            "hits" => Ok(Self::Hits),
            "num_samples" => Ok(Self::NumSamples),
            "num_workers" => Ok(Self::NumWorkers),
            "samples_drawn" => Ok(Self::SamplesDrawn),
            "signed_count" => Ok(Self::SignedCount),
            "worker_share" => Ok(Self::WorkerShare),
            _ => Err(()),
        }
    }
}

/// Inline diagnostics storage, one slot per [`DiagKey`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    entries: [Option<(DiagKey, f64)>; 8],
}

impl Diagnostics {
    pub const CAPACITY: usize = 8;

    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries[0].is_none()
    }

    /// Inserts or overwrites `key`, returning the previous value.
    #[inline]
    pub fn insert(&mut self, key: DiagKey, value: f64) -> Option<f64> {
        for (entry_key, existing) in self.entries.iter_mut().flatten() {
            if *entry_key == key {
                let prev = *existing;
                *existing = value;
                return Some(prev);
            }
        }

        for entry in &mut self.entries {
            if entry.is_none() {
                *entry = Some((key, value));
                return None;
            }
        }

        // Capacity exceeds the number of keys, so every key always has a slot.
        unreachable!("diagnostics capacity exceeded ({})", Self::CAPACITY);
    }

    #[inline]
    fn iter_entries(&self) -> impl Iterator<Item = &(DiagKey, f64)> {
        self.entries.iter().filter_map(Option::as_ref)
    }

    #[inline]
    pub fn get_key(&self, key: DiagKey) -> Option<f64> {
        self.iter_entries()
            .find_map(|(entry_key, value)| (*entry_key == key).then_some(*value))
    }

    /// Looks a value up by its snake_case name.
    #[inline]
    pub fn get(&self, key: &str) -> Option<f64> {
        let key: DiagKey = key.parse().ok()?;
        self.get_key(key)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        self.iter_entries().map(|(k, v)| (k.as_str(), *v))
    }
}

impl Serialize for Diagnostics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, &value)?;
        }
        map.end()
    }
}
