//! cambio-mock
//!
//! Deterministic [`RateSource`] implementations for CI-safe tests and
//! examples: a fixture-backed source, an empty source, and an
//! always-failing source.
#![warn(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use cambio_core::{CambioError, Rate, RateSource};
use cambio_types::CurrencyRegistry;

/// Fixture rate tables.
pub mod fixtures;

/// Mock source serving a static table of USD-pivoted base rates.
///
/// Rates are stamped with the requested bucket (or a fixed default date),
/// so bucket-scoped lookups always match. An optional artificial latency
/// makes coalescing behavior observable in tests.
pub struct MockSource {
    registry: Arc<CurrencyRegistry>,
    latency: Option<Duration>,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    /// Mock source with its own private currency registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(CurrencyRegistry::new()),
            latency: None,
        }
    }

    /// Mock source interning currencies in an explicit registry.
    #[must_use]
    pub fn with_registry(registry: Arc<CurrencyRegistry>) -> Self {
        Self {
            registry,
            latency: None,
        }
    }

    /// Sleep this long before every load, to widen race windows in tests.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl RateSource for MockSource {
    fn name(&self) -> &str {
        "cambio-mock"
    }

    async fn load_base_rates(
        &self,
        bucket: Option<DateTime<FixedOffset>>,
    ) -> Result<Vec<Rate>, CambioError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let date = bucket.unwrap_or_else(fixtures::default_date);
        fixtures::base_rates(&self.registry, self.name(), date)
    }
}

/// A source that loads successfully but knows no rates.
pub struct EmptySource;

#[async_trait]
impl RateSource for EmptySource {
    fn name(&self) -> &str {
        "cambio-empty"
    }

    async fn load_base_rates(
        &self,
        _bucket: Option<DateTime<FixedOffset>>,
    ) -> Result<Vec<Rate>, CambioError> {
        Ok(Vec::new())
    }
}

/// A source that fails every load with a provider error.
pub struct FailingSource;

#[async_trait]
impl RateSource for FailingSource {
    fn name(&self) -> &str {
        "cambio-failing"
    }

    async fn load_base_rates(
        &self,
        _bucket: Option<DateTime<FixedOffset>>,
    ) -> Result<Vec<Rate>, CambioError> {
        Err(CambioError::provider(self.name(), "forced failure"))
    }
}
