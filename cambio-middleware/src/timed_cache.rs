use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use lru::LruCache;
use rand::Rng;
use tokio::sync::Mutex;

use cambio_core::{CambioError, Rate, RateSource};
use cambio_types::TtlConfig;

/// Buckets an entry is kept for; `None` is the "current" (no specific time)
/// load.
type BucketKey = Option<i64>;

struct Entry {
    rates: Arc<Vec<Rate>>,
    expires_at: Instant,
}

/// TTL decorator over a [`RateSource`].
///
/// The wrapped source's raw result set is cached per time bucket and
/// served until `time_to_live` (plus a random jitter that de-synchronizes
/// refreshes across processes) has elapsed. A load that arrives while a
/// refresh for the same bucket is already in flight fails with
/// [`CambioError::ReentrantRefresh`] rather than doubling up on the
/// wrapped source.
pub struct TimedCacheSource {
    inner: Arc<dyn RateSource>,
    time_to_live: Duration,
    jitter: Duration,
    entries: Mutex<LruCache<BucketKey, Entry>>,
    refreshing: std::sync::Mutex<Vec<BucketKey>>,
}

impl TimedCacheSource {
    /// Number of distinct buckets kept before old entries are evicted.
    const CAPACITY: usize = 64;

    /// Wrap `inner` with the given expiry settings.
    #[must_use]
    pub fn new(inner: Arc<dyn RateSource>, cfg: &TtlConfig) -> Self {
        let cap = NonZeroUsize::new(Self::CAPACITY).unwrap();
        Self {
            inner,
            time_to_live: cfg.time_to_live,
            jitter: cfg.jitter,
            entries: Mutex::new(LruCache::new(cap)),
            refreshing: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn lifetime(&self) -> Duration {
        let jitter_secs = self.jitter.as_secs();
        if jitter_secs == 0 {
            return self.time_to_live;
        }
        let mut rng = rand::rng();
        self.time_to_live + Duration::from_secs(rng.random_range(0..=jitter_secs))
    }

    /// Mark `key` as refreshing, or fail if a refresh is already running.
    fn begin_refresh(&self, key: BucketKey) -> Result<(), CambioError> {
        let mut refreshing = self.refreshing.lock().expect("refresh guard lock");
        if refreshing.contains(&key) {
            return Err(CambioError::reentrant_refresh(self.inner.name()));
        }
        refreshing.push(key);
        Ok(())
    }

    fn end_refresh(&self, key: BucketKey) {
        self.refreshing
            .lock()
            .expect("refresh guard lock")
            .retain(|k| *k != key);
    }
}

#[async_trait]
impl RateSource for TimedCacheSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn load_base_rates(
        &self,
        bucket: Option<DateTime<FixedOffset>>,
    ) -> Result<Vec<Rate>, CambioError> {
        let key: BucketKey = bucket.map(|b| b.timestamp());

        {
            let mut entries = self.entries.lock().await;
            if let Some(entry) = entries.get(&key)
                && Instant::now() <= entry.expires_at
            {
                return Ok((*entry.rates).clone());
            }
            // Either absent or expired; drop any stale entry before refreshing.
            if entries.pop(&key).is_some() {
                tracing::debug!(source = self.inner.name(), ?key, "cached rates expired");
            }
        }

        self.begin_refresh(key)?;
        let loaded = self.inner.load_base_rates(bucket).await;
        self.end_refresh(key);

        let rates = loaded?;
        let entry = Entry {
            rates: Arc::new(rates.clone()),
            expires_at: Instant::now() + self.lifetime(),
        };
        self.entries.lock().await.put(key, entry);
        Ok(rates)
    }

    async fn clear_rates(&self) {
        self.entries.lock().await.clear();
        self.inner.clear_rates().await;
    }
}
