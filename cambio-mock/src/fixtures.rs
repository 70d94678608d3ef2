use chrono::{DateTime, FixedOffset, TimeZone};

use cambio_core::{CambioError, Rate};
use cambio_types::CurrencyRegistry;

/// USD-pivoted snapshot of quoted rates.
///
/// JPY is intentionally absent so unknown-pair scenarios are reproducible.
pub const BASE_RATES: &[(&str, &str, f64)] = &[
    ("USD", "CAD", 1.1708),
    ("USD", "EUR", 0.7737),
    ("USD", "GBP", 0.5307),
    ("USD", "AUD", 1.2819),
    ("USD", "CHF", 1.2465),
    ("USD", "SGD", 1.5240),
];

/// The observation date stamped on fixture rates when no bucket is given.
#[must_use]
pub fn default_date() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .expect("zero offset is valid")
        .with_ymd_and_hms(2007, 2, 14, 0, 0, 0)
        .single()
        .expect("fixture date is unambiguous")
}

/// Materialize the fixture table as [`Rate`]s stamped with `date`.
pub fn base_rates(
    registry: &CurrencyRegistry,
    source: &str,
    date: DateTime<FixedOffset>,
) -> Result<Vec<Rate>, CambioError> {
    BASE_RATES
        .iter()
        .map(|(base, quote, rate)| {
            let base = registry.parse(base)?;
            let quote = registry.parse(quote)?;
            Rate::base_rate(base, quote, *rate, source, date)
        })
        .collect()
}
