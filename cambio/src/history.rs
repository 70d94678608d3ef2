use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use cambio_core::{CambioError, HistoricalRate, HistoricalRateStore, Rate};
use cambio_types::CurrencyCode;

use crate::core::Exchange;

/// Batch exporter of resolved rates to a historical store.
///
/// Pulls pairs through an [`Exchange`], shapes them into
/// [`HistoricalRate`] rows with quantized validity windows, and hands the
/// batch to the storage collaborator. Pair selection follows the
/// configured options; each directed pair is exported at most once per
/// batch, so rows satisfy the store's
/// `(base, quote, source, date_0, date_1)` uniqueness contract.
pub struct HistoricalWriter {
    exchange: Arc<Exchange>,
    store: Arc<dyn HistoricalRateStore>,
    all_rates: bool,
    identity_rates: bool,
    reciprocal_rates: bool,
    base_currencies: Vec<CurrencyCode>,
    preferred_currencies: Vec<CurrencyCode>,
    required_currencies: Vec<CurrencyCode>,
}

impl HistoricalWriter {
    /// Create a writer with no selection options set: only the source's
    /// own base rates are exported.
    #[must_use]
    pub fn new(exchange: Arc<Exchange>, store: Arc<dyn HistoricalRateStore>) -> Self {
        Self {
            exchange,
            store,
            all_rates: false,
            identity_rates: false,
            reciprocal_rates: false,
            base_currencies: Vec::new(),
            preferred_currencies: Vec::new(),
            required_currencies: Vec::new(),
        }
    }

    /// Export a rate for every ordered pair of quoted currencies, deriving
    /// where necessary. Useful for reports that join in either direction.
    #[must_use]
    pub const fn all_rates(mut self, yes: bool) -> Self {
        self.all_rates = yes;
        self
    }

    /// Also export identity rates (`c -> c`, factor 1.0).
    #[must_use]
    pub const fn identity_rates(mut self, yes: bool) -> Self {
        self.identity_rates = yes;
        self
    }

    /// Also export the reverse of every selected pair.
    #[must_use]
    pub const fn reciprocal_rates(mut self, yes: bool) -> Self {
        self.reciprocal_rates = yes;
        self
    }

    /// Export pairs from these base currencies to every quoted currency.
    /// Ignored when `all_rates` is set.
    #[must_use]
    pub fn base_currencies(mut self, codes: Vec<CurrencyCode>) -> Self {
        self.base_currencies = codes;
        self
    }

    /// Restrict the quoted currency set to these codes.
    #[must_use]
    pub fn preferred_currencies(mut self, codes: Vec<CurrencyCode>) -> Self {
        self.preferred_currencies = codes;
        self
    }

    /// Fail the export unless the source quotes these codes.
    #[must_use]
    pub fn required_currencies(mut self, codes: Vec<CurrencyCode>) -> Self {
        self.required_currencies = codes;
        self
    }

    /// Resolve the selected pairs into rates, without writing anything.
    ///
    /// # Errors
    /// [`CambioError::MissingCurrency`] if a required currency is not
    /// quoted, plus any resolution failure from the exchange.
    pub async fn selected_rates(
        &self,
        time: Option<DateTime<FixedOffset>>,
    ) -> Result<Vec<Arc<Rate>>, CambioError> {
        let mut currencies = self.exchange.currencies(time).await?;
        if !self.preferred_currencies.is_empty() {
            currencies.retain(|c| self.preferred_currencies.contains(&c.code()));
        }
        for required in &self.required_currencies {
            if !currencies.iter().any(|c| c.code() == *required) {
                return Err(CambioError::MissingCurrency { code: *required });
            }
        }

        let mut selected: Vec<Arc<Rate>> = Vec::new();
        let mut seen: BTreeSet<(CurrencyCode, CurrencyCode)> = BTreeSet::new();

        if self.all_rates {
            for c1 in &currencies {
                for c2 in &currencies {
                    if c1.code() == c2.code() {
                        continue;
                    }
                    let rate = self.exchange.get_rate(c1, c2, time).await?;
                    if seen.insert((c1.code(), c2.code())) {
                        selected.push(rate);
                    }
                }
            }
        } else if !self.base_currencies.is_empty() {
            for code in &self.base_currencies {
                let c1 = self.exchange.registry().get(*code);
                for c2 in &currencies {
                    if c1.code() == c2.code() {
                        continue;
                    }
                    let rate = self.exchange.get_rate(&c1, c2, time).await?;
                    if seen.insert((c1.code(), c2.code())) {
                        selected.push(rate);
                    }
                }
            }
        } else {
            let quoted: BTreeSet<CurrencyCode> = currencies.iter().map(|c| c.code()).collect();
            for rate in self.exchange.base_rates(time).await? {
                let pair = (rate.base().code(), rate.quote().code());
                if quoted.contains(&pair.0) && quoted.contains(&pair.1) && seen.insert(pair) {
                    selected.push(Arc::new(rate));
                }
            }
        }

        if self.identity_rates {
            for c in &currencies {
                let rate = self.exchange.get_rate(c, c, time).await?;
                if seen.insert((c.code(), c.code())) {
                    selected.push(rate);
                }
            }
        }

        if self.reciprocal_rates {
            let forward = selected.clone();
            for rate in forward {
                let pair = (rate.quote().code(), rate.base().code());
                if seen.contains(&pair) {
                    continue;
                }
                let reversed = self
                    .exchange
                    .get_rate(rate.quote(), rate.base(), time)
                    .await?;
                if seen.insert(pair) {
                    selected.push(reversed);
                }
            }
        }

        Ok(selected)
    }

    /// Resolve the selected pairs and hand them to the store as one batch.
    ///
    /// Rows without an explicit validity window get the quantized bucket
    /// bounds of their observation date. Returns the written rows.
    ///
    /// # Errors
    /// Selection failures (see [`HistoricalWriter::selected_rates`]) and
    /// store failures.
    pub async fn write_rates(
        &self,
        time: Option<DateTime<FixedOffset>>,
    ) -> Result<Vec<HistoricalRate>, CambioError> {
        let rates = self.selected_rates(time).await?;
        let quantizer = self.exchange.quantizer();

        let rows: Vec<HistoricalRate> = rates
            .iter()
            .map(|rate| {
                let mut row = HistoricalRate::from_rate(rate);
                let window_known = rate
                    .stats()
                    .is_some_and(|s| s.date_0.is_some() && s.date_1.is_some());
                if !window_known {
                    let (date_0, date_1) = quantizer.quantize_range(row.date);
                    row.date_0 = date_0;
                    row.date_1 = date_1;
                }
                row
            })
            .collect();

        self.store.save_rates(&rows).await?;
        Ok(rows)
    }
}
