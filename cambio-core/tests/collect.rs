use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeZone};

use cambio_core::{CambioError, MULTIPLE_SOURCES, Rate, RateCollector, collect};
use cambio_types::{Currency, CurrencyRegistry};

fn day(d: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2007, 2, d, 12, 0, 0)
        .unwrap()
}

fn currency(code: &str) -> Arc<Currency> {
    CurrencyRegistry::global().parse(code).unwrap()
}

fn usd_cad(rate: f64, d: u32, source: &str) -> Rate {
    Rate::base_rate(currency("USD"), currency("CAD"), rate, source, day(d)).unwrap()
}

#[test]
fn three_sample_boundary_scenario() {
    let samples = [
        usd_cad(1.10, 1, "xe.com"),
        usd_cad(1.12, 2, "xe.com"),
        usd_cad(1.15, 3, "xe.com"),
    ];
    let summary = collect(samples.iter()).unwrap();

    assert_eq!(summary.rate(), 1.10, "representative rate is the first sample's");
    assert_eq!(summary.source(), "xe.com");

    let stats = summary.stats().unwrap();
    assert!((stats.avg.unwrap() - (1.10 + 1.12 + 1.15) / 3.0).abs() < 1e-12);
    assert!((stats.avg.unwrap() - 1.1233).abs() < 1e-4);
    assert_eq!(stats.lo, Some(1.10));
    assert_eq!(stats.hi, Some(1.15));
    assert_eq!(stats.samples, 3);
    assert_eq!(stats.date_0, Some(day(1)));
    assert_eq!(stats.date_1, Some(day(3)));
    assert_eq!(stats.rate_at_date_0, Some(1.10));
    assert_eq!(stats.rate_at_date_1, Some(1.15));
}

#[test]
fn opposite_direction_samples_are_normalized() {
    let forward = usd_cad(1.10, 1, "xe.com");
    let backward =
        Rate::base_rate(currency("CAD"), currency("USD"), 1.0 / 1.20, "xe.com", day(2)).unwrap();

    let summary = collect([&forward, &backward]).unwrap();
    assert_eq!(summary.base().code(), forward.base().code());
    assert_eq!(summary.quote().code(), forward.quote().code());

    let stats = summary.stats().unwrap();
    assert_eq!(stats.samples, 2);
    assert!((stats.hi.unwrap() - 1.20).abs() < 1e-12);
    assert!((stats.avg.unwrap() - 1.15).abs() < 1e-12);
}

#[test]
fn mismatched_pair_is_rejected() {
    let mut collector = RateCollector::new();
    collector.push(&usd_cad(1.10, 1, "xe.com")).unwrap();

    let stray =
        Rate::base_rate(currency("USD"), currency("EUR"), 0.7737, "xe.com", day(1)).unwrap();
    let err = collector.push(&stray).unwrap_err();
    assert!(matches!(err, CambioError::MismatchedPair { .. }));
}

#[test]
fn disagreeing_sources_collapse_to_sentinel() {
    let summary = collect([
        &usd_cad(1.10, 1, "xe.com"),
        &usd_cad(1.12, 2, "newyorkfed.org"),
    ])
    .unwrap();
    assert_eq!(summary.source(), MULTIPLE_SOURCES);
}

#[test]
fn empty_input_is_an_error() {
    assert!(matches!(
        collect(std::iter::empty::<&Rate>()),
        Err(CambioError::NoSamples)
    ));
    assert!(RateCollector::new().is_empty());
}
