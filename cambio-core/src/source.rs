use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use cambio_types::CurrencyCode;

use crate::error::CambioError;
use crate::rate::Rate;

/// Contract implemented by rate providers.
///
/// A source hands back the full set of base rates it knows for a time
/// bucket; it never derives, never bridges, and never retries. Scrapers,
/// feeds, and database readers implement this; decorators in
/// `cambio-middleware` (TTL caching, failover) wrap it.
///
/// Loads must be idempotent for a fixed bucket within the source's own
/// caching policy. Failures surface as [`CambioError::Provider`]; the
/// resolver propagates them without retrying.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// A stable identifier for this source, used in rate provenance and
    /// logs (e.g. `"xe.com"`, `"newyorkfed.org"`).
    fn name(&self) -> &str;

    /// Load every base rate known for `bucket`; `None` means "current".
    ///
    /// Returned rates carry only pair, factor, source name, and date: no
    /// derivation path and no statistics.
    ///
    /// # Errors
    /// [`CambioError::Provider`] (or `ProviderTimeout`) on load failure.
    async fn load_base_rates(
        &self,
        bucket: Option<DateTime<FixedOffset>>,
    ) -> Result<Vec<Rate>, CambioError>;

    /// Drop any internally cached rates. Default: nothing to drop.
    async fn clear_rates(&self) {}
}

/// Find the base rate for a pair in a loaded result set.
#[must_use]
pub fn find_rate<'a>(
    rates: &'a [Rate],
    base: CurrencyCode,
    quote: CurrencyCode,
) -> Option<&'a Rate> {
    rates
        .iter()
        .find(|r| r.base().code() == base && r.quote().code() == quote)
}
