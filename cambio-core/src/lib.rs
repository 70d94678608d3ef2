//! cambio-core
//!
//! Core types and traits shared across the cambio workspace.
//!
//! - `rate`: the [`Rate`] value with provenance, reciprocals, and the
//!   statistical envelope used by aggregation.
//! - `source`: the [`RateSource`] contract implemented by providers and
//!   their decorators.
//! - `quantize`: [`TimeQuantizer`], timestamp-to-bucket truncation.
//! - `aggregate`: folding independent observations into summary rates.
//! - `historical`: the export row and store contract.
//!
//! Async runtime (Tokio)
//! ---------------------
//! Source loading is async behind `async-trait`; the resolver in the
//! `cambio` crate and the decorators in `cambio-middleware` assume a Tokio
//! 1.x runtime.
#![warn(missing_docs)]

pub mod aggregate;
mod error;
pub mod historical;
pub mod quantize;
mod rate;
/// The provider contract and lookup helpers.
pub mod source;

pub use aggregate::{MULTIPLE_SOURCES, RateCollector, collect};
pub use error::CambioError;
pub use historical::{HistoricalRate, HistoricalRateStore};
pub use quantize::TimeQuantizer;
pub use rate::{Rate, RateStats};
pub use source::{RateSource, find_rate};

pub use cambio_types::{Currency, CurrencyCode, CurrencyRegistry};
