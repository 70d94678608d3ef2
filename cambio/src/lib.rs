//! Cambio resolves conversion rates between currencies from a sparse set of
//! directly-observed base rates.
//!
//! Overview
//! - A [`RateSource`] supplies base rates for a time bucket; scrapers,
//!   feeds, and database readers implement it, decorators from
//!   `cambio-middleware` (TTL caching, failover) wrap it.
//! - The [`Exchange`] derives the requested pair deterministically: identity,
//!   cache, direct base rate, reciprocal, then one bridge through the pivot
//!   currency, failing with `UnknownRate` when every path is exhausted.
//! - Resolved rates are cached per `(pair, quantized time)`; concurrent
//!   misses for one key coalesce into a single source load.
//! - [`HistoricalWriter`] batch-resolves pairs into export rows with
//!   quantized validity windows and hands them to a storage collaborator;
//!   multi-observation summaries come from [`collect`].
//!
//! Key behaviors and trade-offs
//! - A cached entry always wins over recomputation; invalidation is the
//!   caller's job (`clear_rate`/`clear_rates`) or the TTL decorator's.
//! - No hidden retries: a source failure propagates, and failover wraps
//!   perform exactly one secondary attempt.
//! - Derived rates keep their provenance (`"reciprocal: ..."`,
//!   `"pivot(USD,...)"`), so every answer is explainable.
//!
//! Examples
//! Building an exchange over a TTL-cached source and converting:
//! ```rust,ignore
//! use std::sync::Arc;
//! use cambio::{Exchange, SourceBuilder, TtlConfig};
//!
//! let source = SourceBuilder::new(Arc::new(MyScraper::new()))
//!     .with_timed_cache(&TtlConfig::default())
//!     .build();
//! let exchange = Exchange::builder().with_source(source).build()?;
//!
//! let usd = exchange.registry().parse("USD")?;
//! let cad = exchange.registry().parse("CAD")?;
//! let amount = exchange.convert(100.0, &usd, &cad, None).await?;
//! ```
//!
//! Exporting aggregated history:
//! ```rust,ignore
//! use cambio::HistoricalWriter;
//!
//! let writer = HistoricalWriter::new(exchange.clone(), store)
//!     .all_rates(true)
//!     .reciprocal_rates(true);
//! let rows = writer.write_rates(None).await?;
//! ```
//!
//! See `cambio/examples/` for a runnable end-to-end demonstration.
#![warn(missing_docs)]

pub(crate) mod core;
mod history;

pub use crate::core::{Exchange, ExchangeBuilder};
pub use crate::history::HistoricalWriter;

pub use cambio_core::{
    CambioError, HistoricalRate, HistoricalRateStore, MULTIPLE_SOURCES, Rate, RateCollector,
    RateSource, RateStats, TimeQuantizer, collect,
};
pub use cambio_middleware::{FailoverSource, SourceBuilder, TimedCacheSource};
pub use cambio_types::{
    Currency, CurrencyCode, CurrencyRegistry, ExchangeConfig, QuantizerConfig, TtlConfig,
};
