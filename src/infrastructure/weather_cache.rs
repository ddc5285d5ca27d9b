//! Weather Cache
//!
//! Read-through cache of weather records keyed by city code, with TTL and
//! capacity bounds and single-flight collapsing of concurrent misses.

use crate::domain::entities::WeatherRecord;
use crate::domain::ports::FetchError;
use crate::domain::value_objects::CityCode;
use crate::infrastructure::clock::{Clock, SystemClock};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Expiry and capacity bounds for the cache.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// How long a record is served before it is fetched again
    pub ttl: Duration,
    /// Maximum number of cities held at once (0 disables caching)
    pub max_entries: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_entries: 1024,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    record: WeatherRecord,
    stored_at: Instant,
}

/// Drops the per-city fetch lock from the in-flight map once nobody holds it.
struct InflightSlot<'a> {
    inflight: &'a DashMap<CityCode, Arc<Mutex<()>>>,
    code: &'a CityCode,
}

impl Drop for InflightSlot<'_> {
    fn drop(&mut self) {
        self.inflight
            .remove_if(self.code, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Per-city weather cache.
///
/// Only successful fetches are stored. Concurrent misses for the same city
/// queue on a per-city lock, so one upstream call serves all of them.
pub struct WeatherCache {
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
    entries: Arc<DashMap<CityCode, CacheEntry>>,
    inflight: DashMap<CityCode, Arc<Mutex<()>>>,
}

impl WeatherCache {
    pub fn new(policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            entries: Arc::new(DashMap::new()),
            inflight: DashMap::new(),
        }
    }

    pub fn with_system_clock(policy: CachePolicy) -> Self {
        Self::new(policy, Arc::new(SystemClock))
    }

    /// Return the cached record for `code`, or run `fetch` and cache its result.
    ///
    /// Errors from `fetch` are handed back unchanged and nothing is stored.
    pub async fn get<F, Fut>(&self, code: &CityCode, fetch: F) -> Result<WeatherRecord, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<WeatherRecord, FetchError>>,
    {
        if let Some(record) = self.lookup(code) {
            tracing::debug!("cache hit for city {}", code);
            return Ok(record);
        }

        // Declared before the lock handle so it drops after it, even when
        // this future is cancelled mid-fetch.
        let _slot = InflightSlot {
            inflight: &self.inflight,
            code,
        };
        let lock = Arc::clone(&self.inflight.entry(code.clone()).or_default());
        let _guard = lock.lock_owned().await;

        // Another caller may have filled the entry while we waited.
        let result = match self.lookup(code) {
            Some(record) => {
                tracing::debug!("cache filled by concurrent fetch for city {}", code);
                Ok(record)
            }
            None => {
                tracing::debug!("cache miss for city {}", code);
                let fetched = fetch().await;
                if let Ok(record) = &fetched {
                    self.insert(code.clone(), record.clone());
                }
                fetched
            }
        };

        result
    }

    /// Drop the entry for `code`. Returns whether one was present.
    pub fn invalidate(&self, code: &CityCode) -> bool {
        self.entries.remove(code).is_some()
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        Self::purge(&self.entries, self.clock.as_ref(), self.policy.ttl)
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Start the background task that sweeps expired entries.
    pub fn start_gc(&self, interval: Duration) {
        let entries = self.entries.clone();
        let clock = self.clock.clone();
        let ttl = self.policy.ttl;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = Self::purge(&entries, clock.as_ref(), ttl);
                if removed > 0 {
                    tracing::debug!("weather cache GC removed {} expired entries", removed);
                }
            }
        });
    }

    fn lookup(&self, code: &CityCode) -> Option<WeatherRecord> {
        let now = self.clock.now();
        let entry = self.entries.get(code)?;
        if Self::is_fresh(entry.stored_at, now, self.policy.ttl) {
            Some(entry.record.clone())
        } else {
            None
        }
    }

    fn insert(&self, code: CityCode, record: WeatherRecord) {
        if self.policy.max_entries == 0 {
            return;
        }

        if !self.entries.contains_key(&code) && self.entries.len() >= self.policy.max_entries {
            self.purge_expired();
            if self.entries.len() >= self.policy.max_entries {
                self.evict_oldest();
            }
        }

        let stored_at = self.clock.now();
        self.entries.insert(code, CacheEntry { record, stored_at });
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.stored_at)
            .map(|entry| entry.key().clone());

        if let Some(code) = oldest {
            self.entries.remove(&code);
            tracing::debug!("weather cache full, evicted city {}", code);
        }
    }

    fn purge(entries: &DashMap<CityCode, CacheEntry>, clock: &dyn Clock, ttl: Duration) -> usize {
        let now = clock.now();
        let before = entries.len();
        entries.retain(|_, entry| Self::is_fresh(entry.stored_at, now, ttl));
        before.saturating_sub(entries.len())
    }

    fn is_fresh(stored_at: Instant, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(stored_at) < ttl
    }
}
