//! Short-lived cache for transformed provider responses.
//!
//! Entries expire a fixed TTL after they were stored. Expired entries read
//! as absent and are evicted by moka's lazy housekeeping; there is no
//! background sweep to manage here.

use std::{fmt, future::Future, sync::Arc, time::Duration};

use moka::future::Cache as MokaCache;

use crate::{error::FetchError, model::Units};

/// Default lifetime of a cached response.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Safety bound; the real key space is (operation, city, units).
const MAX_ENTRIES: u64 = 1_000;

/// Provider operation a cache entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Current,
    Forecast,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Current => "current",
            Operation::Forecast => "forecast",
        }
    }
}

/// Request fingerprint: operation, city and unit system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub operation: Operation,
    pub city: String,
    pub units: Units,
}

impl CacheKey {
    pub fn current(city: &str, units: Units) -> Self {
        Self {
            operation: Operation::Current,
            city: city.to_string(),
            units,
        }
    }

    pub fn forecast(city: &str, units: Units) -> Self {
        Self {
            operation: Operation::Forecast,
            city: city.to_string(),
            units,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.operation.as_str(), self.city, self.units)
    }
}

/// TTL cache keyed by [`CacheKey`].
///
/// Values are shared behind `Arc` so a hit never clones the payload.
pub struct ResponseCache<V> {
    entries: MokaCache<CacheKey, Arc<V>>,
    ttl: Duration,
}

impl<V> ResponseCache<V>
where
    V: Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        let entries = MokaCache::builder()
            .time_to_live(ttl)
            .max_capacity(MAX_ENTRIES)
            .build();

        Self { entries, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stored value, provided it is younger than the TTL.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<V>> {
        self.entries.get(key).await
    }

    /// Store `value` as of now, replacing any previous entry.
    pub async fn put(&self, key: CacheKey, value: Arc<V>) {
        self.entries.insert(key, value).await;
    }

    /// Cached value for `key`, or the result of `fetch` stored under it.
    ///
    /// Concurrent callers for the same key wait on one `fetch` and all see
    /// its outcome. Errors are handed back but never stored.
    pub async fn get_or_fetch<F>(&self, key: CacheKey, fetch: F) -> Result<Arc<V>, FetchError>
    where
        F: Future<Output = Result<V, FetchError>>,
    {
        self.entries
            .try_get_with(key, async move { fetch.await.map(Arc::new) })
            .await
            .map_err(Arc::unwrap_or_clone)
    }

    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }

    /// Approximate count; pending housekeeping may lag behind.
    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}

impl<V> fmt::Debug for ResponseCache<V>
where
    V: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}
