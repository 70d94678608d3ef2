use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone};

use cambio_core::{CambioError, Rate, RateSource};
use cambio_middleware::{SourceBuilder, TimedCacheSource};
use cambio_mock::{FailingSource, MockSource};
use cambio_types::TtlConfig;

struct CountingSource {
    inner: Arc<dyn RateSource>,
    count: Arc<AtomicUsize>,
}

#[async_trait]
impl RateSource for CountingSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn load_base_rates(
        &self,
        bucket: Option<DateTime<FixedOffset>>,
    ) -> Result<Vec<Rate>, CambioError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.inner.load_base_rates(bucket).await
    }
}

fn counted(inner: Arc<dyn RateSource>) -> (Arc<dyn RateSource>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let source = Arc::new(CountingSource {
        inner,
        count: count.clone(),
    });
    (source, count)
}

fn cfg(ttl_ms: u64) -> TtlConfig {
    TtlConfig {
        time_to_live: Duration::from_millis(ttl_ms),
        jitter: Duration::ZERO,
    }
}

fn bucket(d: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2007, 2, d, 0, 0, 0)
        .unwrap()
}

#[tokio::test]
async fn fresh_entries_are_served_from_cache() {
    let (raw, count) = counted(Arc::new(MockSource::new()));
    let cached = TimedCacheSource::new(raw, &cfg(60_000));

    let first = cached.load_base_rates(None).await.unwrap();
    let second = cached.load_base_rates(None).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn expiry_causes_refetch() {
    let (raw, count) = counted(Arc::new(MockSource::new()));
    let cached = TimedCacheSource::new(raw, &cfg(50));

    let _ = cached.load_base_rates(None).await.unwrap(); // miss -> fetch
    assert_eq!(count.load(Ordering::SeqCst), 1);
    let _ = cached.load_base_rates(None).await.unwrap(); // hit
    assert_eq!(count.load(Ordering::SeqCst), 1);
    tokio::time::sleep(Duration::from_millis(60)).await;
    let _ = cached.load_base_rates(None).await.unwrap(); // expired -> refetch
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn buckets_are_cached_independently() {
    let (raw, count) = counted(Arc::new(MockSource::new()));
    let cached = TimedCacheSource::new(raw, &cfg(60_000));

    let _ = cached.load_base_rates(Some(bucket(14))).await.unwrap();
    let _ = cached.load_base_rates(Some(bucket(15))).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
    let _ = cached.load_base_rates(Some(bucket(14))).await.unwrap();
    let _ = cached.load_base_rates(Some(bucket(15))).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn clear_rates_drops_cached_entries() {
    let (raw, count) = counted(Arc::new(MockSource::new()));
    let cached = TimedCacheSource::new(raw, &cfg(60_000));

    let _ = cached.load_base_rates(None).await.unwrap();
    cached.clear_rates().await;
    let _ = cached.load_base_rates(None).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_loads_are_not_cached() {
    let (raw, count) = counted(Arc::new(FailingSource));
    let cached = TimedCacheSource::new(raw, &cfg(60_000));

    assert!(cached.load_base_rates(None).await.is_err());
    assert!(cached.load_base_rates(None).await.is_err());
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_refresh_of_one_bucket_is_rejected() {
    let slow = Arc::new(MockSource::new().with_latency(Duration::from_millis(150)));
    let cached = Arc::new(TimedCacheSource::new(slow, &cfg(60_000)));

    let racing = cached.clone();
    let first = tokio::spawn(async move { racing.load_base_rates(None).await });
    tokio::time::sleep(Duration::from_millis(30)).await;

    let err = cached.load_base_rates(None).await.unwrap_err();
    assert!(matches!(err, CambioError::ReentrantRefresh { .. }));

    // The in-flight refresh itself completes normally.
    assert!(first.await.unwrap().is_ok());
    // And later calls are served from the refreshed cache.
    assert!(cached.load_base_rates(None).await.is_ok());
}

#[tokio::test]
async fn builder_layers_compose() {
    let (raw, count) = counted(Arc::new(MockSource::new()));
    let source = SourceBuilder::new(raw).with_timed_cache(&cfg(60_000)).build();

    let _ = source.load_base_rates(None).await.unwrap();
    let _ = source.load_base_rates(None).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(source.name(), "cambio-mock");
}
