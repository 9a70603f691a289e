//! Short-lived cache of newest forecasts per location.

use avroute_core::ForecastRecord;
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CachedForecast {
    records: Vec<ForecastRecord>,
    fetched_at: Instant,
}

pub struct ForecastCache {
    entries: DashMap<String, CachedForecast>,
    ttl: Duration,
    max_entries: usize,
}

impl ForecastCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries,
        }
    }

    /// Cached records for `location` if they are younger than the TTL.
    pub fn get(&self, location: &str) -> Option<Vec<ForecastRecord>> {
        let entry = self.entries.get(location)?;
        if entry.fetched_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.records.clone())
    }

    pub fn insert(&self, location: &str, records: Vec<ForecastRecord>) {
        self.entries.insert(
            location.to_string(),
            CachedForecast {
                records,
                fetched_at: Instant::now(),
            },
        );
        self.prune();
    }

    pub fn invalidate(&self, location: &str) {
        self.entries.remove(location);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops expired entries, then the oldest until within `max_entries`.
    fn prune(&self) {
        let now = Instant::now();
        let mut entries: Vec<(String, Instant)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().fetched_at))
            .collect();

        for (key, fetched_at) in &entries {
            if now.duration_since(*fetched_at) > self.ttl {
                self.entries.remove(key);
            }
        }

        if self.entries.len() <= self.max_entries {
            return;
        }

        entries.sort_by_key(|(_, fetched_at)| *fetched_at);
        for (key, _) in entries {
            if self.entries.len() <= self.max_entries {
                break;
            }
            self.entries.remove(&key);
        }
    }
}
