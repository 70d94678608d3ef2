//! cambio-types
//!
//! Currency identity and configuration types shared across the cambio
//! workspace.
//!
//! - `currency`: `CurrencyCode`, `Currency`, and the interning
//!   `CurrencyRegistry`.
//! - `config`: serializable settings for the resolver, the time quantizer,
//!   and TTL-wrapped sources.
#![warn(missing_docs)]

/// Currency codes, interned currencies, and the registry.
pub mod currency;

/// Configuration types for the resolver and source wrappers.
pub mod config;

pub use config::{ExchangeConfig, QuantizerConfig, TtlConfig};
pub use currency::{Currency, CurrencyCode, CurrencyError, CurrencyRegistry};
