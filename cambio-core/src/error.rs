use std::fmt;

use chrono::{DateTime, FixedOffset};

use cambio_types::{CurrencyCode, CurrencyError};

/// Unified error type for the cambio workspace.
///
/// Every variant is distinguishable so callers can separate "no rate exists"
/// (a business condition) from "the source is unreachable" (transient
/// infrastructure). The type is `Clone` because coalesced cache waiters all
/// observe one shared failure.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CambioError {
    /// A currency code was not three uppercase ASCII letters.
    InvalidCurrencyCode {
        /// The offending input.
        code: String,
    },

    /// A rate was constructed with a non-positive (or non-finite) factor.
    InvalidRate {
        /// Currency the rate converts from.
        base: CurrencyCode,
        /// Currency the rate converts to.
        quote: CurrencyCode,
        /// The rejected factor.
        rate: f64,
    },

    /// Resolution exhausted the direct, reciprocal, and pivot searches.
    UnknownRate {
        /// Currency the rate converts from.
        base: CurrencyCode,
        /// Currency the rate converts to.
        quote: CurrencyCode,
        /// Quantized time bucket of the request, if one was given.
        bucket: Option<DateTime<FixedOffset>>,
    },

    /// A rate source failed to load its base rates.
    Provider {
        /// Name of the failing source.
        source: String,
        /// Human-readable failure detail.
        msg: String,
    },

    /// A source load exceeded the configured deadline.
    ProviderTimeout {
        /// Name of the source that timed out.
        source: String,
    },

    /// A TTL-wrapped source was asked to refresh while a refresh for the
    /// same bucket was already in flight.
    ReentrantRefresh {
        /// Name of the wrapped source.
        source: String,
    },

    /// Aggregation received a sample for a different currency pair.
    MismatchedPair {
        /// Pair fixed by the first sample (from side).
        expected_base: CurrencyCode,
        /// Pair fixed by the first sample (to side).
        expected_quote: CurrencyCode,
        /// Offending sample's from side, after reciprocal normalization.
        base: CurrencyCode,
        /// Offending sample's to side, after reciprocal normalization.
        quote: CurrencyCode,
    },

    /// Aggregation was asked to summarize an empty sample list.
    NoSamples,

    /// A currency required by the historical export was not available from
    /// the source.
    MissingCurrency {
        /// The missing currency.
        code: CurrencyCode,
    },

    /// An exchange was built without a rate source.
    NoSource,
}

impl fmt::Display for CambioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCurrencyCode { code } => {
                write!(f, "invalid currency code: {code:?}")
            }
            Self::InvalidRate { base, quote, rate } => {
                write!(f, "invalid rate {rate} for {base}/{quote}")
            }
            Self::UnknownRate {
                base,
                quote,
                bucket,
            } => write!(f, "no rate known for {base}/{quote} at {bucket:?}"),
            Self::Provider { source, msg } => write!(f, "{source} failed: {msg}"),
            Self::ProviderTimeout { source } => write!(f, "rate source timed out: {source}"),
            Self::ReentrantRefresh { source } => {
                write!(f, "refresh already in flight for {source}")
            }
            Self::MismatchedPair {
                expected_base,
                expected_quote,
                base,
                quote,
            } => write!(
                f,
                "aggregation pair mismatch: expected {expected_base}/{expected_quote}, got {base}/{quote}"
            ),
            Self::NoSamples => write!(f, "no rate samples to aggregate"),
            Self::MissingCurrency { code } => {
                write!(f, "required currency {code} not available from source")
            }
            Self::NoSource => write!(f, "no rate source configured"),
        }
    }
}

impl std::error::Error for CambioError {}

impl CambioError {
    /// Helper: build a `Provider` error with the source name and message.
    pub fn provider(source: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Provider {
            source: source.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build an `UnknownRate` error for a pair and bucket.
    #[must_use]
    pub const fn unknown_rate(
        base: CurrencyCode,
        quote: CurrencyCode,
        bucket: Option<DateTime<FixedOffset>>,
    ) -> Self {
        Self::UnknownRate {
            base,
            quote,
            bucket,
        }
    }

    /// Helper: build a `ProviderTimeout` error.
    pub fn provider_timeout(source: impl Into<String>) -> Self {
        Self::ProviderTimeout {
            source: source.into(),
        }
    }

    /// Helper: build a `ReentrantRefresh` error.
    pub fn reentrant_refresh(source: impl Into<String>) -> Self {
        Self::ReentrantRefresh {
            source: source.into(),
        }
    }
}

impl From<CurrencyError> for CambioError {
    fn from(err: CurrencyError) -> Self {
        match err {
            CurrencyError::InvalidCode(code) => Self::InvalidCurrencyCode { code },
        }
    }
}
