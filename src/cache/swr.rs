// Stale-while-revalidate cache.
// Serves fresh or stale entries immediately and regenerates stale ones in the background.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Result;

use super::store::{CacheEntry, CacheStore, Payload, TtlPolicy};
use super::tasks::BackgroundTasks;

/// Default minimum time between sweeps of expired entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// How a payload was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Fresh entry, no background work.
    Hit,
    /// Stale entry served while a regeneration runs.
    Stale,
    /// No usable entry; produced synchronously.
    Miss,
    /// Client asked to skip the cache; produced synchronously.
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Stale => "STALE",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        }
    }
}

/// Result of a cache-backed read.
#[derive(Debug, Clone)]
pub struct Served {
    pub payload: Payload,
    pub status: CacheStatus,
}

type InFlight = Arc<Mutex<HashSet<String>>>;

/// Claim on a key's revalidation slot, released on drop even if the
/// revalidation panics.
struct InFlightSlot {
    in_flight: InFlight,
    key: String,
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

pub struct SwrCache {
    store: Arc<dyn CacheStore>,
    tasks: Arc<dyn BackgroundTasks>,
    ttl: TtlPolicy,
    in_flight: Option<InFlight>,
    sweep_interval: Duration,
    last_sweep: Mutex<DateTime<Utc>>,
}

impl SwrCache {
    pub fn new(
        store: Arc<dyn CacheStore>,
        tasks: Arc<dyn BackgroundTasks>,
        ttl: TtlPolicy,
    ) -> Self {
        Self {
            store,
            tasks,
            ttl,
            in_flight: None,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            last_sweep: Mutex::new(Utc::now()),
        }
    }

    /// Allow at most one background regeneration per key at a time.
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.in_flight = enabled.then(InFlight::default);
        self
    }

    /// Minimum time between background sweeps of expired entries.
    ///
    /// Sweeps are triggered by writes, so the first one runs on the first
    /// write at least `interval` after construction.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn ttl(&self) -> &TtlPolicy {
        &self.ttl
    }

    /// Look up a servable entry. Expired entries are evicted and reported absent.
    pub async fn lookup(&self, key: &str) -> Result<Option<CacheEntry>> {
        self.lookup_at(key, Utc::now()).await
    }

    async fn lookup_at(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheEntry>> {
        match self.store.get(key).await? {
            Some(entry) if entry.is_expired(now) => {
                tracing::debug!(key, "evicting expired entry");
                self.store.delete(key).await?;
                Ok(None)
            }
            entry => Ok(entry),
        }
    }

    /// Write a payload under `key` with deadlines starting now.
    pub async fn store(&self, key: &str, payload: Payload) -> Result<CacheEntry> {
        let now = Utc::now();
        let entry = CacheEntry::new(key, payload, &self.ttl, now);
        self.store.put(entry.clone()).await?;
        self.sweep_if_due(now);
        Ok(entry)
    }

    /// Schedule removal of every expired entry if the sweep interval has passed.
    fn sweep_if_due(&self, now: DateTime<Utc>) {
        {
            let mut last = self.last_sweep.lock().unwrap_or_else(PoisonError::into_inner);
            let due = (now - *last)
                .to_std()
                .is_ok_and(|elapsed| elapsed >= self.sweep_interval);
            if !due {
                return;
            }
            *last = now;
        }

        let store = Arc::clone(&self.store);
        self.tasks.spawn(Box::pin(async move {
            match store.purge_expired(Utc::now()).await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "swept expired entries"),
                Err(e) => tracing::warn!(error = %e, "sweeping expired entries failed"),
            }
        }));
    }

    /// Serve `key`, producing the payload with `produce` on a miss.
    ///
    /// A stale entry is returned as-is and `produce` runs as a background
    /// task instead. When `bypass` is set the cache is never read, but the
    /// produced payload is still written back. A failed production is never
    /// cached.
    pub async fn serve<F, Fut>(&self, key: &str, bypass: bool, produce: F) -> Result<Served>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Payload>> + Send + 'static,
    {
        if !bypass {
            let now = Utc::now();
            match self.lookup_at(key, now).await {
                Ok(Some(entry)) if entry.is_fresh(now) => {
                    tracing::debug!(key, "cache hit");
                    return Ok(Served {
                        payload: entry.payload,
                        status: CacheStatus::Hit,
                    });
                }
                Ok(Some(entry)) => {
                    tracing::debug!(key, stale_at = %entry.stale_at, "serving stale entry");
                    self.revalidate(key, produce);
                    return Ok(Served {
                        payload: entry.payload,
                        status: CacheStatus::Stale,
                    });
                }
                Ok(None) => tracing::debug!(key, "cache miss"),
                Err(e) => tracing::warn!(key, error = %e, "cache read failed, regenerating"),
            }
        }

        let payload = produce().await?;
        if let Err(e) = self.store(key, payload.clone()).await {
            tracing::warn!(key, error = %e, "cache write failed");
        }

        Ok(Served {
            payload,
            status: if bypass {
                CacheStatus::Bypass
            } else {
                CacheStatus::Miss
            },
        })
    }

    /// Schedule a regeneration of `key` that overwrites the entry on success.
    fn revalidate<F, Fut>(&self, key: &str, produce: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Payload>> + Send + 'static,
    {
        let slot = match &self.in_flight {
            Some(in_flight) => {
                let mut keys = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
                if !keys.insert(key.to_string()) {
                    tracing::debug!(key, "revalidation already in flight");
                    return;
                }
                Some(InFlightSlot {
                    in_flight: Arc::clone(in_flight),
                    key: key.to_string(),
                })
            }
            None => None,
        };

        let key = key.to_string();
        let store = Arc::clone(&self.store);
        let ttl = self.ttl;

        self.tasks.spawn(Box::pin(async move {
            match produce().await {
                Ok(payload) => {
                    let entry = CacheEntry::new(key.clone(), payload, &ttl, Utc::now());
                    match store.put(entry).await {
                        Ok(()) => tracing::debug!(key = %key, "revalidated"),
                        Err(e) => {
                            tracing::warn!(key = %key, error = %e, "revalidated entry not written")
                        }
                    }
                }
                // Stale entry stays servable until it expires
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "background revalidation failed")
                }
            }
            drop(slot);
        }));
    }
}
