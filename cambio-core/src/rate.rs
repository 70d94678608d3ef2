use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, FixedOffset};

use cambio_types::Currency;

use crate::error::CambioError;

/// Statistical envelope attached to aggregated rates.
///
/// Base rates from a source never carry one; the aggregator fills it in
/// before rates are handed to the historical-export path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RateStats {
    /// Mean of the collected sample rates.
    pub avg: Option<f64>,
    /// Minimum observed rate across samples.
    pub lo: Option<f64>,
    /// Maximum observed rate across samples.
    pub hi: Option<f64>,
    /// Number of samples folded in.
    pub samples: u32,
    /// Rate of the sample observed at the start of the validity window.
    pub rate_at_date_0: Option<f64>,
    /// Rate of the sample observed at the end of the validity window.
    pub rate_at_date_1: Option<f64>,
    /// Start of the validity window.
    pub date_0: Option<DateTime<FixedOffset>>,
    /// End of the validity window.
    pub date_1: Option<DateTime<FixedOffset>>,
}

impl RateStats {
    /// Field-wise reciprocal: each rate-valued field is inverted, dates and
    /// the sample count pass through, `None` stays `None`.
    #[must_use]
    pub fn reciprocal(&self) -> Self {
        let inv = |v: Option<f64>| v.map(|r| 1.0 / r);
        Self {
            avg: inv(self.avg),
            lo: inv(self.lo),
            hi: inv(self.hi),
            samples: self.samples,
            rate_at_date_0: inv(self.rate_at_date_0),
            rate_at_date_1: inv(self.rate_at_date_1),
            date_0: self.date_0,
            date_1: self.date_1,
        }
    }
}

/// An immutable, directed conversion factor between two currencies.
///
/// `rate` converts one unit of `base` into `rate` units of `quote`. A rate
/// knows where it came from (`source`), when it applies (`date`), and, if
/// it was not observed directly, how it was derived.
pub struct Rate {
    base: Arc<Currency>,
    quote: Arc<Currency>,
    rate: f64,
    source: String,
    date: DateTime<FixedOffset>,
    derived: Option<String>,
    stats: Option<RateStats>,
    recip: OnceLock<Arc<Rate>>,
}

impl Rate {
    fn new_checked(
        base: Arc<Currency>,
        quote: Arc<Currency>,
        rate: f64,
        source: String,
        date: DateTime<FixedOffset>,
        derived: Option<String>,
        stats: Option<RateStats>,
    ) -> Result<Self, CambioError> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(CambioError::InvalidRate {
                base: base.code(),
                quote: quote.code(),
                rate,
            });
        }
        Ok(Self {
            base,
            quote,
            rate,
            source,
            date,
            derived,
            stats,
            recip: OnceLock::new(),
        })
    }

    /// Construct a directly-observed base rate.
    ///
    /// # Errors
    /// [`CambioError::InvalidRate`] if `rate` is not a positive finite number.
    pub fn base_rate(
        base: Arc<Currency>,
        quote: Arc<Currency>,
        rate: f64,
        source: impl Into<String>,
        date: DateTime<FixedOffset>,
    ) -> Result<Self, CambioError> {
        Self::new_checked(base, quote, rate, source.into(), date, None, None)
    }

    /// Construct a derived rate with a provenance description, e.g.
    /// `"identity"` or `"pivot(USD,CADUSD,USDEUR)"`.
    ///
    /// # Errors
    /// [`CambioError::InvalidRate`] if `rate` is not a positive finite number.
    pub fn derived_rate(
        base: Arc<Currency>,
        quote: Arc<Currency>,
        rate: f64,
        source: impl Into<String>,
        date: DateTime<FixedOffset>,
        derived: impl Into<String>,
    ) -> Result<Self, CambioError> {
        Self::new_checked(base, quote, rate, source.into(), date, Some(derived.into()), None)
    }

    /// Construct an aggregated rate carrying a statistical envelope.
    ///
    /// # Errors
    /// [`CambioError::InvalidRate`] if `rate` is not a positive finite number.
    pub fn with_stats(
        base: Arc<Currency>,
        quote: Arc<Currency>,
        rate: f64,
        source: impl Into<String>,
        date: DateTime<FixedOffset>,
        derived: Option<String>,
        stats: RateStats,
    ) -> Result<Self, CambioError> {
        Self::new_checked(base, quote, rate, source.into(), date, derived, Some(stats))
    }

    /// Currency this rate converts from.
    #[must_use]
    pub fn base(&self) -> &Arc<Currency> {
        &self.base
    }

    /// Currency this rate converts to.
    #[must_use]
    pub fn quote(&self) -> &Arc<Currency> {
        &self.quote
    }

    /// The conversion factor (quote units per base unit).
    #[must_use]
    pub const fn rate(&self) -> f64 {
        self.rate
    }

    /// Name of the source that produced this rate.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Point in time the rate was observed or resolved for.
    #[must_use]
    pub const fn date(&self) -> DateTime<FixedOffset> {
        self.date
    }

    /// Derivation provenance; `None` for a directly-observed base rate.
    #[must_use]
    pub fn derived(&self) -> Option<&str> {
        self.derived.as_deref()
    }

    /// Statistical envelope, if this rate came out of aggregation.
    #[must_use]
    pub const fn stats(&self) -> Option<&RateStats> {
        self.stats.as_ref()
    }

    /// Convert `amount` denominated in `from` across this rate.
    ///
    /// Multiplies when `from` is the base currency, divides otherwise.
    /// Passing a currency that is neither side is a caller error; callers
    /// must pre-check.
    #[must_use]
    pub fn convert(&self, amount: f64, from: &Currency) -> f64 {
        if from.code() == self.base.code() {
            amount * self.rate
        } else {
            amount / self.rate
        }
    }

    /// The inverse rate (quote to base), memoized on this instance.
    ///
    /// Repeated calls return the same `Arc`. Memoization is structural only;
    /// it is not kept coherent with any resolver cache.
    pub fn reciprocal(&self) -> Arc<Self> {
        self.recip
            .get_or_init(|| {
                let derived = match &self.derived {
                    Some(d) => format!("reciprocal: {d}"),
                    None => "reciprocal".to_string(),
                };
                Arc::new(Self {
                    base: self.quote.clone(),
                    quote: self.base.clone(),
                    rate: 1.0 / self.rate,
                    source: self.source.clone(),
                    date: self.date,
                    derived: Some(derived),
                    stats: self.stats.as_ref().map(RateStats::reciprocal),
                    recip: OnceLock::new(),
                })
            })
            .clone()
    }
}

impl Clone for Rate {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            quote: self.quote.clone(),
            rate: self.rate,
            source: self.source.clone(),
            date: self.date,
            derived: self.derived.clone(),
            stats: self.stats.clone(),
            // The memoized reciprocal is per-instance state, not identity.
            recip: OnceLock::new(),
        }
    }
}

impl PartialEq for Rate {
    fn eq(&self, other: &Self) -> bool {
        self.base.code() == other.base.code()
            && self.quote.code() == other.quote.code()
            && self.rate == other.rate
            && self.source == other.source
            && self.date == other.date
            && self.derived == other.derived
            && self.stats == other.stats
    }
}

impl fmt::Debug for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rate")
            .field("base", &self.base.code())
            .field("quote", &self.quote.code())
            .field("rate", &self.rate)
            .field("source", &self.source)
            .field("date", &self.date)
            .field("derived", &self.derived)
            .field("stats", &self.stats)
            .finish()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} {} {} @ {}",
            self.base.code(),
            self.quote.code(),
            self.rate,
            self.source,
            self.date.to_rfc3339()
        )?;
        if let Some(d) = &self.derived {
            write!(f, " ({d})")?;
        }
        Ok(())
    }
}
