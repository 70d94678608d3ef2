//! Configuration types shared by the resolver and source wrappers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::currency::CurrencyCode;

const SECONDS_PER_DAY: i64 = 86_400;

/// Settings for [`TimeQuantizer`](https://docs.rs/cambio-core) buckets.
///
/// Timestamps are truncated to `bucket_secs`-sized buckets before they are
/// used as cache-key components. `offset_secs` shifts the bucket boundary;
/// when unset, each timestamp's own UTC offset is used, i.e. truncation
/// happens in local civil time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantizerConfig {
    /// Bucket width in seconds. Defaults to one calendar day.
    #[serde(default = "default_bucket_secs")]
    pub bucket_secs: i64,
    /// Fixed boundary offset in seconds; `None` means "the timestamp's own
    /// UTC offset".
    #[serde(default)]
    pub offset_secs: Option<i32>,
}

fn default_bucket_secs() -> i64 {
    SECONDS_PER_DAY
}

impl Default for QuantizerConfig {
    fn default() -> Self {
        Self {
            bucket_secs: SECONDS_PER_DAY,
            offset_secs: None,
        }
    }
}

/// Expiry settings for a TTL-wrapped rate source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TtlConfig {
    /// How long a loaded result set stays fresh.
    pub time_to_live: Duration,
    /// Upper bound of the random extra lifetime added per refresh, which
    /// spreads out synchronized re-fetches.
    pub jitter: Duration,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            time_to_live: Duration::from_secs(600),
            jitter: Duration::from_secs(30),
        }
    }
}

/// Global configuration for an `Exchange` resolver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExchangeConfig {
    /// Currency used to bridge pairs with no direct or reciprocal base rate.
    #[serde(default = "default_pivot")]
    pub pivot: CurrencyCode,
    /// Time-bucket quantization applied to every requested timestamp.
    #[serde(default)]
    pub quantizer: QuantizerConfig,
    /// Per-call deadline for source loads; `None` disables the timeout.
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout: Option<Duration>,
    /// Maximum number of resolved rates kept in the pair/bucket cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

fn default_pivot() -> CurrencyCode {
    CurrencyCode::USD
}

fn default_provider_timeout() -> Option<Duration> {
    Some(Duration::from_secs(5))
}

fn default_cache_capacity() -> u64 {
    10_000
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            pivot: default_pivot(),
            quantizer: QuantizerConfig::default(),
            provider_timeout: default_provider_timeout(),
            cache_capacity: default_cache_capacity(),
        }
    }
}
