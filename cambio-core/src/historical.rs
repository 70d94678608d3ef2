//! Row shape and store contract for durable rate export.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use cambio_types::CurrencyCode;

use crate::error::CambioError;
use crate::rate::Rate;

/// One aggregated rate observation, shaped for durable storage.
///
/// The storage collaborator owns persistence; this row is the handoff. Rows
/// are unique on `(base, quote, source, date_0, date_1)` (see
/// [`HistoricalRate::unique_key`]); the store must upsert or reject on
/// collision of that tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRate {
    /// Currency the rate converts from.
    pub base: CurrencyCode,
    /// Currency the rate converts to.
    pub quote: CurrencyCode,
    /// Source name, or the multiple-sources sentinel.
    pub source: String,
    /// Representative conversion factor.
    pub rate: f64,
    /// Mean across collected samples.
    pub rate_avg: Option<f64>,
    /// Minimum across collected samples.
    pub rate_lo: Option<f64>,
    /// Maximum across collected samples.
    pub rate_hi: Option<f64>,
    /// Number of samples behind the aggregate.
    pub rate_samples: Option<u32>,
    /// Rate observed at the start of the validity window.
    pub rate_at_date_0: Option<f64>,
    /// Rate observed at the end of the validity window.
    pub rate_at_date_1: Option<f64>,
    /// Derivation provenance, if the rate was not observed directly.
    pub derived: Option<String>,
    /// Observation timestamp.
    pub date: DateTime<FixedOffset>,
    /// Start of the validity window.
    pub date_0: DateTime<FixedOffset>,
    /// End of the validity window.
    pub date_1: DateTime<FixedOffset>,
}

impl HistoricalRate {
    /// Build a row from a resolved or aggregated [`Rate`].
    ///
    /// Missing window dates fall back to the rate's own date; the writer
    /// tightens them to quantized bucket bounds afterwards.
    #[must_use]
    pub fn from_rate(rate: &Rate) -> Self {
        let stats = rate.stats();
        Self {
            base: rate.base().code(),
            quote: rate.quote().code(),
            source: rate.source().to_string(),
            rate: rate.rate(),
            rate_avg: stats.and_then(|s| s.avg),
            rate_lo: stats.and_then(|s| s.lo),
            rate_hi: stats.and_then(|s| s.hi),
            rate_samples: stats.map(|s| s.samples),
            rate_at_date_0: stats.and_then(|s| s.rate_at_date_0),
            rate_at_date_1: stats.and_then(|s| s.rate_at_date_1),
            derived: rate.derived().map(str::to_string),
            date: rate.date(),
            date_0: stats.and_then(|s| s.date_0).unwrap_or_else(|| rate.date()),
            date_1: stats.and_then(|s| s.date_1).unwrap_or_else(|| rate.date()),
        }
    }

    /// The storage uniqueness tuple.
    #[must_use]
    pub fn unique_key(
        &self,
    ) -> (
        CurrencyCode,
        CurrencyCode,
        &str,
        DateTime<FixedOffset>,
        DateTime<FixedOffset>,
    ) {
        (self.base, self.quote, &self.source, self.date_0, self.date_1)
    }
}

/// Storage collaborator accepting batches of historical rows.
///
/// Implementations live outside this workspace (database writers, file
/// sinks). A batch must be saved all-or-nothing.
#[async_trait]
pub trait HistoricalRateStore: Send + Sync {
    /// Persist a batch of rows atomically.
    ///
    /// # Errors
    /// Implementation-defined, surfaced as [`CambioError::Provider`].
    async fn save_rates(&self, rows: &[HistoricalRate]) -> Result<(), CambioError>;
}
