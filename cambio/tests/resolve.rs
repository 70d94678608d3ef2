use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone};

use cambio::{CambioError, Currency, Exchange, Rate, RateSource};
use cambio_mock::{FailingSource, MockSource};

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

fn counted_exchange() -> (Exchange, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let source = Arc::new(CountingSource {
        inner: Arc::new(MockSource::new()),
        count: count.clone(),
    });
    let exchange = Exchange::builder().with_source(source).build().unwrap();
    (exchange, count)
}

fn afternoon() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2007, 2, 14, 15, 30, 0)
        .unwrap()
}

fn currency(exchange: &Exchange, code: &str) -> Arc<Currency> {
    exchange.registry().parse(code).unwrap()
}

#[tokio::test]
async fn identity_rate_is_one_and_needs_no_source() {
    let (exchange, count) = counted_exchange();
    let usd = currency(&exchange, "USD");

    let rate = exchange.get_rate(&usd, &usd, Some(afternoon())).await.unwrap();
    assert_eq!(rate.rate(), 1.0);
    assert_eq!(rate.derived(), Some("identity"));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn direct_base_rate_is_served_as_is() {
    let (exchange, _) = counted_exchange();
    let usd = currency(&exchange, "USD");
    let cad = currency(&exchange, "CAD");

    let rate = exchange.get_rate(&usd, &cad, Some(afternoon())).await.unwrap();
    assert_eq!(rate.rate(), 1.1708);
    assert_eq!(rate.derived(), None);
    assert_eq!(rate.source(), "cambio-mock");
}

#[tokio::test]
async fn reciprocal_is_derived_from_the_opposite_quote() {
    let (exchange, _) = counted_exchange();
    let usd = currency(&exchange, "USD");
    let cad = currency(&exchange, "CAD");

    let rate = exchange.get_rate(&cad, &usd, Some(afternoon())).await.unwrap();
    assert_eq!(rate.rate(), 1.0 / 1.1708);
    assert_eq!(rate.derived(), Some("reciprocal"));
}

#[tokio::test]
async fn pivot_bridges_pairs_never_quoted_directly() {
    let (exchange, _) = counted_exchange();
    let cad = currency(&exchange, "CAD");
    let eur = currency(&exchange, "EUR");

    let rate = exchange.get_rate(&cad, &eur, Some(afternoon())).await.unwrap();
    assert!((rate.rate() - 0.7737 / 1.1708).abs() < 1e-6);
    let derived = rate.derived().unwrap();
    assert!(derived.starts_with("pivot(USD"), "unexpected provenance: {derived}");
}

#[tokio::test]
async fn cache_is_coherent_and_skips_the_source() {
    let (exchange, count) = counted_exchange();
    let usd = currency(&exchange, "USD");
    let cad = currency(&exchange, "CAD");

    let first = exchange.get_rate(&usd, &cad, Some(afternoon())).await.unwrap();
    let second = exchange.get_rate(&usd, &cad, Some(afternoon())).await.unwrap();
    assert!(first.rate().to_bits() == second.rate().to_bits());
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pivot_resolution_caches_its_legs() {
    let (exchange, count) = counted_exchange();
    let cad = currency(&exchange, "CAD");
    let eur = currency(&exchange, "EUR");
    let usd = currency(&exchange, "USD");

    let _ = exchange.get_rate(&cad, &eur, Some(afternoon())).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // Both legs were cached along the way; no further loads needed.
    let _ = exchange.get_rate(&cad, &usd, Some(afternoon())).await.unwrap();
    let _ = exchange.get_rate(&usd, &eur, Some(afternoon())).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unquoted_pair_fails_with_unknown_rate() {
    let (exchange, _) = counted_exchange();
    let cad = currency(&exchange, "CAD");
    let jpy = currency(&exchange, "JPY");

    let err = exchange.get_rate(&cad, &jpy, Some(afternoon())).await.unwrap_err();
    match err {
        CambioError::UnknownRate { base, quote, bucket } => {
            assert_eq!(base.as_str(), "CAD");
            assert_eq!(quote.as_str(), "JPY");
            assert!(bucket.is_some());
        }
        other => panic!("expected UnknownRate, got {other:?}"),
    }
}

#[tokio::test]
async fn source_failure_is_not_reported_as_unknown_rate() {
    let exchange = Exchange::builder()
        .with_source(Arc::new(FailingSource))
        .build()
        .unwrap();
    let usd = currency(&exchange, "USD");
    let cad = currency(&exchange, "CAD");

    let err = exchange.get_rate(&usd, &cad, None).await.unwrap_err();
    assert!(matches!(err, CambioError::Provider { .. }), "got {err:?}");
}

#[tokio::test]
async fn clear_rate_invalidates_both_directions() {
    let (exchange, count) = counted_exchange();
    let usd = currency(&exchange, "USD");
    let cad = currency(&exchange, "CAD");

    let _ = exchange.get_rate(&usd, &cad, Some(afternoon())).await.unwrap();
    exchange.clear_rate(&usd, &cad, Some(afternoon())).await;
    let _ = exchange.get_rate(&usd, &cad, Some(afternoon())).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn slow_sources_hit_the_configured_deadline() {
    let slow = Arc::new(MockSource::new().with_latency(Duration::from_millis(200)));
    let exchange = Exchange::builder()
        .with_source(slow)
        .provider_timeout(Some(Duration::from_millis(50)))
        .build()
        .unwrap();
    let usd = currency(&exchange, "USD");
    let cad = currency(&exchange, "CAD");

    let err = exchange.get_rate(&usd, &cad, None).await.unwrap_err();
    assert!(matches!(err, CambioError::ProviderTimeout { .. }), "got {err:?}");
}

#[tokio::test]
async fn convert_goes_through_the_resolved_rate() {
    let (exchange, _) = counted_exchange();
    let usd = currency(&exchange, "USD");
    let cad = currency(&exchange, "CAD");

    let forward = exchange.convert(100.0, &usd, &cad, None).await.unwrap();
    assert!((forward - 117.08).abs() < 1e-9);
    let backward = exchange.convert(forward, &cad, &usd, None).await.unwrap();
    assert!((backward - 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn building_without_a_source_fails() {
    assert!(matches!(
        Exchange::builder().build(),
        Err(CambioError::NoSource)
    ));
}
