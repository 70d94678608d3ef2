use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use moka::future::Cache;

use cambio_core::source::find_rate;
use cambio_core::{CambioError, Rate, RateSource, TimeQuantizer};
use cambio_types::{Currency, CurrencyCode, CurrencyRegistry, ExchangeConfig};

/// Cache key for one resolved rate: directed pair plus quantized bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RateKey {
    base: CurrencyCode,
    quote: CurrencyCode,
    bucket: Option<i64>,
}

impl RateKey {
    fn new(base: CurrencyCode, quote: CurrencyCode, bucket: Option<DateTime<FixedOffset>>) -> Self {
        Self {
            base,
            quote,
            bucket: bucket.map(|b| b.timestamp()),
        }
    }
}

fn now_fixed() -> DateTime<FixedOffset> {
    Utc::now().fixed_offset()
}

fn share(err: Arc<CambioError>) -> CambioError {
    (*err).clone()
}

fn leg_label(rate: &Rate) -> String {
    rate.derived().map_or_else(
        || format!("{}{}", rate.base().code(), rate.quote().code()),
        str::to_string,
    )
}

/// Resolves conversion rates between any two currencies at a point in time.
///
/// Resolution is deterministic and first-match-wins: identity, cache,
/// direct base rate, reciprocal of a base rate, then a single bridge
/// through the pivot currency. Results are cached per `(pair, bucket)`;
/// concurrent misses for one key coalesce into a single source load, and
/// every waiter observes the same rate or the same failure.
///
/// A cached entry always wins over recomputation. Invalidation is the
/// caller's explicit responsibility via [`Exchange::clear_rate`] and
/// [`Exchange::clear_rates`]; expiry policies belong to the source layer
/// (see `cambio-middleware`).
pub struct Exchange {
    source: Arc<dyn RateSource>,
    registry: Arc<CurrencyRegistry>,
    quantizer: TimeQuantizer,
    pivot: CurrencyCode,
    provider_timeout: Option<Duration>,
    cache: Cache<RateKey, Arc<Rate>>,
}

impl Exchange {
    /// Start building an exchange.
    #[must_use]
    pub fn builder() -> ExchangeBuilder {
        ExchangeBuilder::new()
    }

    /// The currency registry this exchange interns codes in.
    #[must_use]
    pub fn registry(&self) -> &Arc<CurrencyRegistry> {
        &self.registry
    }

    /// The quantizer applied to every requested timestamp.
    #[must_use]
    pub const fn quantizer(&self) -> &TimeQuantizer {
        &self.quantizer
    }

    /// The configured pivot currency code.
    #[must_use]
    pub const fn pivot(&self) -> CurrencyCode {
        self.pivot
    }

    /// Resolve the rate from `base` to `quote` at `time`.
    ///
    /// `None` means "current, no specific time" and maps to the unbucketed
    /// cache slot.
    ///
    /// # Errors
    /// [`CambioError::UnknownRate`] when no direct, reciprocal, or pivoted
    /// path exists; [`CambioError::Provider`]/`ProviderTimeout` when the
    /// source fails.
    pub async fn get_rate(
        &self,
        base: &Arc<Currency>,
        quote: &Arc<Currency>,
        time: Option<DateTime<FixedOffset>>,
    ) -> Result<Arc<Rate>, CambioError> {
        let bucket = self.quantizer.quantize_opt(time);
        let key = RateKey::new(base.code(), quote.code(), bucket);

        if base.code() == quote.code() {
            let identity = self.identity_rate(base, quote, bucket);
            return self
                .cache
                .try_get_with(key, async move { identity.map(Arc::new) })
                .await
                .map_err(share);
        }

        self.cache
            .try_get_with(key, self.resolve(base.clone(), quote.clone(), bucket))
            .await
            .map_err(share)
    }

    /// Convert `amount` from one currency into another at `time`.
    ///
    /// # Errors
    /// Same failure modes as [`Exchange::get_rate`].
    pub async fn convert(
        &self,
        amount: f64,
        from: &Arc<Currency>,
        to: &Arc<Currency>,
        time: Option<DateTime<FixedOffset>>,
    ) -> Result<f64, CambioError> {
        let rate = self.get_rate(from, to, time).await?;
        Ok(rate.convert(amount, from))
    }

    /// Load the source's base rates for `time` (quantized), honoring the
    /// configured timeout.
    ///
    /// # Errors
    /// [`CambioError::Provider`] or [`CambioError::ProviderTimeout`].
    pub async fn base_rates(
        &self,
        time: Option<DateTime<FixedOffset>>,
    ) -> Result<Vec<Rate>, CambioError> {
        let bucket = self.quantizer.quantize_opt(time);
        self.load_base_rates(bucket).await
    }

    /// Every currency the source quotes at `time`, in code order.
    ///
    /// # Errors
    /// Same failure modes as [`Exchange::base_rates`].
    pub async fn currencies(
        &self,
        time: Option<DateTime<FixedOffset>>,
    ) -> Result<Vec<Arc<Currency>>, CambioError> {
        let rates = self.base_rates(time).await?;
        let codes: BTreeSet<CurrencyCode> = rates
            .iter()
            .flat_map(|r| [r.base().code(), r.quote().code()])
            .collect();
        Ok(codes.into_iter().map(|c| self.registry.get(c)).collect())
    }

    /// Drop the cached rate for a pair (both directions) at `time`.
    pub async fn clear_rate(
        &self,
        base: &Currency,
        quote: &Currency,
        time: Option<DateTime<FixedOffset>>,
    ) {
        let bucket = self.quantizer.quantize_opt(time);
        self.cache
            .invalidate(&RateKey::new(base.code(), quote.code(), bucket))
            .await;
        self.cache
            .invalidate(&RateKey::new(quote.code(), base.code(), bucket))
            .await;
    }

    /// Drop every cached rate, and tell the source to do the same.
    pub async fn clear_rates(&self) {
        self.cache.invalidate_all();
        self.source.clear_rates().await;
    }

    fn identity_rate(
        &self,
        base: &Arc<Currency>,
        quote: &Arc<Currency>,
        bucket: Option<DateTime<FixedOffset>>,
    ) -> Result<Rate, CambioError> {
        Rate::derived_rate(
            base.clone(),
            quote.clone(),
            1.0,
            self.source.name(),
            bucket.unwrap_or_else(now_fixed),
            "identity",
        )
    }

    async fn load_base_rates(
        &self,
        bucket: Option<DateTime<FixedOffset>>,
    ) -> Result<Vec<Rate>, CambioError> {
        match self.provider_timeout {
            Some(deadline) => tokio::time::timeout(deadline, self.source.load_base_rates(bucket))
                .await
                .map_err(|_| CambioError::provider_timeout(self.source.name()))?,
            None => self.source.load_base_rates(bucket).await,
        }
    }

    /// Find a base rate for the pair in a loaded set, respecting the bucket.
    fn find_base<'a>(
        &self,
        rates: &'a [Rate],
        base: CurrencyCode,
        quote: CurrencyCode,
        bucket: Option<DateTime<FixedOffset>>,
    ) -> Option<&'a Rate> {
        match bucket {
            None => find_rate(rates, base, quote),
            Some(b) => rates.iter().find(|r| {
                r.base().code() == base
                    && r.quote().code() == quote
                    && self.quantizer.quantize(r.date()) == b
            }),
        }
    }

    async fn resolve(
        &self,
        base: Arc<Currency>,
        quote: Arc<Currency>,
        bucket: Option<DateTime<FixedOffset>>,
    ) -> Result<Arc<Rate>, CambioError> {
        tracing::debug!(
            base = %base.code(),
            quote = %quote.code(),
            ?bucket,
            source = self.source.name(),
            "resolving rate"
        );
        let rates = self.load_base_rates(bucket).await?;

        if let Some(direct) = self.find_base(&rates, base.code(), quote.code(), bucket) {
            return Ok(Arc::new(direct.clone()));
        }

        // The opposite direction was quoted: cache the base rate under its
        // own key and answer with its reciprocal.
        if let Some(inverse) = self.find_base(&rates, quote.code(), base.code(), bucket) {
            let inverse = Arc::new(inverse.clone());
            self.cache
                .insert(
                    RateKey::new(quote.code(), base.code(), bucket),
                    inverse.clone(),
                )
                .await;
            return Ok(inverse.reciprocal());
        }

        // Single-hop bridge through the pivot. Legs resolve via cache,
        // direct, or reciprocal only; a leg never pivots again.
        let pivot = self.registry.get(self.pivot);
        let leg_1 = self.leg_rate(&base, &pivot, bucket, &rates).await;
        let leg_2 = self.leg_rate(&pivot, &quote, bucket, &rates).await;
        if let (Some(leg_1), Some(leg_2)) = (leg_1, leg_2) {
            let derived = format!(
                "pivot({},{},{})",
                pivot.code(),
                leg_label(&leg_1),
                leg_label(&leg_2)
            );
            tracing::debug!(
                base = %base.code(),
                quote = %quote.code(),
                pivot = %pivot.code(),
                derived = %derived,
                "bridging through pivot"
            );
            let rate = Rate::derived_rate(
                base,
                quote,
                leg_1.rate() * leg_2.rate(),
                self.source.name(),
                leg_1.date(),
                derived,
            )?;
            return Ok(Arc::new(rate));
        }

        Err(CambioError::unknown_rate(base.code(), quote.code(), bucket))
    }

    /// Resolve one pivot leg through the cache or the loaded base rates.
    async fn leg_rate(
        &self,
        base: &Arc<Currency>,
        quote: &Arc<Currency>,
        bucket: Option<DateTime<FixedOffset>>,
        rates: &[Rate],
    ) -> Option<Arc<Rate>> {
        let key = RateKey::new(base.code(), quote.code(), bucket);

        if base.code() == quote.code() {
            let identity = Arc::new(self.identity_rate(base, quote, bucket).ok()?);
            self.cache.insert(key, identity.clone()).await;
            return Some(identity);
        }

        if let Some(hit) = self.cache.get(&key).await {
            return Some(hit);
        }

        if let Some(direct) = self.find_base(rates, base.code(), quote.code(), bucket) {
            let direct = Arc::new(direct.clone());
            self.cache.insert(key, direct.clone()).await;
            return Some(direct);
        }

        if let Some(inverse) = self.find_base(rates, quote.code(), base.code(), bucket) {
            let inverse = Arc::new(inverse.clone());
            self.cache
                .insert(
                    RateKey::new(quote.code(), base.code(), bucket),
                    inverse.clone(),
                )
                .await;
            let reciprocal = inverse.reciprocal();
            self.cache.insert(key, reciprocal.clone()).await;
            return Some(reciprocal);
        }

        None
    }
}

/// Builder for constructing an [`Exchange`] with custom configuration.
pub struct ExchangeBuilder {
    source: Option<Arc<dyn RateSource>>,
    registry: Option<Arc<CurrencyRegistry>>,
    cfg: ExchangeConfig,
}

impl Default for ExchangeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeBuilder {
    /// Create a builder with default configuration and no source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: None,
            registry: None,
            cfg: ExchangeConfig::default(),
        }
    }

    /// Bind the rate source. Required; compose decorators beforehand with
    /// `cambio_middleware::SourceBuilder`.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn RateSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Use an explicit currency registry instead of a fresh private one.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<CurrencyRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replace the whole configuration in one go.
    #[must_use]
    pub fn config(mut self, cfg: ExchangeConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Set the pivot currency used for bridged derivations.
    #[must_use]
    pub const fn pivot(mut self, pivot: CurrencyCode) -> Self {
        self.cfg.pivot = pivot;
        self
    }

    /// Set (or disable) the per-load source deadline.
    #[must_use]
    pub const fn provider_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.cfg.provider_timeout = timeout;
        self
    }

    /// Build the exchange.
    ///
    /// # Errors
    /// [`CambioError::NoSource`] if no rate source was bound.
    pub fn build(self) -> Result<Exchange, CambioError> {
        let source = self.source.ok_or(CambioError::NoSource)?;
        Ok(Exchange {
            source,
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(CurrencyRegistry::new())),
            quantizer: TimeQuantizer::from_config(&self.cfg.quantizer),
            pivot: self.cfg.pivot,
            provider_timeout: self.cfg.provider_timeout,
            cache: Cache::builder()
                .max_capacity(self.cfg.cache_capacity)
                .build(),
        })
    }
}
