//! Builder for composing a rate source with decorator layers.
//!
//! Layers wrap outward in the order they are added: the raw source is the
//! innermost, and the last layer added answers `load_base_rates` first.
//!
//! ```text
//! SourceBuilder::new(scraper)
//!     .with_timed_cache(&TtlConfig::default())
//!     .with_failover(fallback)
//!     .build()
//!
//! Result: Failover(TimedCache(scraper), fallback)
//! ```

use std::sync::Arc;

use cambio_core::RateSource;
use cambio_types::TtlConfig;

use crate::failover::FailoverSource;
use crate::timed_cache::TimedCacheSource;

/// Composes a raw [`RateSource`] with decorator layers.
pub struct SourceBuilder {
    inner: Arc<dyn RateSource>,
}

impl SourceBuilder {
    /// Start from a raw, unwrapped source.
    #[must_use]
    pub fn new(raw: Arc<dyn RateSource>) -> Self {
        Self { inner: raw }
    }

    /// Wrap the current stack in a TTL cache.
    #[must_use]
    pub fn with_timed_cache(mut self, cfg: &TtlConfig) -> Self {
        self.inner = Arc::new(TimedCacheSource::new(self.inner, cfg));
        self
    }

    /// Wrap the current stack as the primary of a failover pair.
    #[must_use]
    pub fn with_failover(mut self, secondary: Arc<dyn RateSource>) -> Self {
        self.inner = Arc::new(FailoverSource::new(self.inner, secondary));
        self
    }

    /// Finish and hand back the composed source.
    #[must_use]
    pub fn build(self) -> Arc<dyn RateSource> {
        self.inner
    }
}
