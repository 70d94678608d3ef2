use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use cambio_core::{CambioError, Rate, RateSource};

/// Primary/secondary failover decorator over two [`RateSource`]s.
///
/// The primary is tried first; a primary error *or* an empty primary result
/// triggers exactly one attempt against the secondary. The secondary's
/// outcome, rates or error, is final; there is no retry loop.
pub struct FailoverSource {
    primary: Arc<dyn RateSource>,
    secondary: Arc<dyn RateSource>,
    name: String,
}

impl FailoverSource {
    /// Compose a failover source from a primary and a secondary.
    #[must_use]
    pub fn new(primary: Arc<dyn RateSource>, secondary: Arc<dyn RateSource>) -> Self {
        let name = format!("failover({}, {})", primary.name(), secondary.name());
        Self {
            primary,
            secondary,
            name,
        }
    }
}

#[async_trait]
impl RateSource for FailoverSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load_base_rates(
        &self,
        bucket: Option<DateTime<FixedOffset>>,
    ) -> Result<Vec<Rate>, CambioError> {
        match self.primary.load_base_rates(bucket).await {
            Ok(rates) if !rates.is_empty() => Ok(rates),
            Ok(_) => {
                tracing::warn!(
                    primary = self.primary.name(),
                    secondary = self.secondary.name(),
                    "primary source returned no rates, trying secondary"
                );
                self.secondary.load_base_rates(bucket).await
            }
            Err(err) => {
                tracing::warn!(
                    primary = self.primary.name(),
                    secondary = self.secondary.name(),
                    error = %err,
                    "primary source failed, trying secondary"
                );
                self.secondary.load_base_rates(bucket).await
            }
        }
    }

    async fn clear_rates(&self) {
        self.primary.clear_rates().await;
        self.secondary.clear_rates().await;
    }
}
