use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock, RwLock};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced while constructing currency identities.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    /// The code is not three uppercase ASCII letters.
    #[error("invalid currency code: {0:?}")]
    InvalidCode(String),
}

/// A 3-letter uppercase ISO-style currency code, e.g. `USD` or `CAD`.
///
/// Stored inline as three ASCII bytes; cheap to copy, hash, and compare.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// The default pivot currency of the workspace.
    pub const USD: Self = Self(*b"USD");

    /// The code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Construction only admits ASCII uppercase letters.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_uppercase) {
            return Err(CurrencyError::InvalidCode(s.to_string()));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2]]))
    }
}

impl TryFrom<&str> for CurrencyCode {
    type Error = CurrencyError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurrencyCode({})", self.as_str())
    }
}

impl Serialize for CurrencyCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CurrencyCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// A currency identity: code, display symbol, and decimal scale.
///
/// Currencies are interned by [`CurrencyRegistry`]; equality and hashing are
/// by code alone, so two `Arc<Currency>` handles from the same registry
/// compare equal iff they name the same currency.
#[derive(Clone)]
pub struct Currency {
    code: CurrencyCode,
    symbol: Option<String>,
    scale: u32,
    scale_exp: u32,
}

impl Currency {
    /// Create a currency with an explicit symbol and scale factor.
    ///
    /// `scale` is the power of ten of the minor unit (100 for two decimal
    /// places); values below 1 are clamped to 1.
    #[must_use]
    pub fn new(code: CurrencyCode, symbol: Option<String>, scale: u32) -> Self {
        let scale = scale.max(1);
        Self {
            code,
            symbol,
            scale,
            scale_exp: scale.ilog10(),
        }
    }

    /// The 3-letter code.
    #[must_use]
    pub const fn code(&self) -> CurrencyCode {
        self.code
    }

    /// Display symbol, if one is known (e.g. `$`).
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    /// Scale factor as a power of ten, e.g. 100 for USD.
    #[must_use]
    pub const fn scale(&self) -> u32 {
        self.scale
    }

    /// log10 of the scale factor, e.g. 2 for USD.
    #[must_use]
    pub const fn scale_exp(&self) -> u32 {
        self.scale_exp
    }
}

impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Currency {}

impl std::hash::Hash for Currency {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency({})", self.code)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// Well-known symbols and scales; everything else defaults to a two-decimal
/// currency with no symbol.
fn builtin(code: CurrencyCode) -> (Option<&'static str>, u32) {
    match code.as_str() {
        "USD" | "CAD" | "AUD" | "NZD" | "SGD" | "HKD" => (Some("$"), 100),
        "EUR" => (Some("\u{20ac}"), 100),
        "GBP" => (Some("\u{a3}"), 100),
        "JPY" => (Some("\u{a5}"), 1),
        "CHF" => (Some("Fr"), 100),
        _ => (None, 100),
    }
}

/// Interning registry for [`Currency`] values.
///
/// A currency is created once on first lookup by code and shared thereafter;
/// handles are `Arc<Currency>` so they are cheap to clone into rates. The
/// registry is an explicit object so callers can scope or replace it; a
/// process-wide default lives behind [`CurrencyRegistry::global`] for the
/// outermost application boundary.
pub struct CurrencyRegistry {
    inner: RwLock<HashMap<CurrencyCode, Arc<Currency>>>,
}

impl CurrencyRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide default registry, created lazily.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<CurrencyRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// Fetch the interned currency for `code`, creating it with built-in
    /// defaults on first lookup.
    pub fn get(&self, code: CurrencyCode) -> Arc<Currency> {
        if let Some(found) = self.inner.read().expect("registry lock").get(&code) {
            return found.clone();
        }
        let mut map = self.inner.write().expect("registry lock");
        map.entry(code)
            .or_insert_with(|| {
                let (symbol, scale) = builtin(code);
                Arc::new(Currency::new(code, symbol.map(str::to_string), scale))
            })
            .clone()
    }

    /// Parse a code string and fetch its interned currency.
    ///
    /// # Errors
    /// Returns [`CurrencyError::InvalidCode`] for malformed codes.
    pub fn parse(&self, code: &str) -> Result<Arc<Currency>, CurrencyError> {
        Ok(self.get(code.parse()?))
    }

    /// Look up an already-interned currency without creating it.
    pub fn lookup(&self, code: CurrencyCode) -> Option<Arc<Currency>> {
        self.inner.read().expect("registry lock").get(&code).cloned()
    }

    /// Register (or replace) a currency with explicit attributes.
    ///
    /// Intended for startup configuration, before the registry is shared.
    pub fn insert(&self, currency: Currency) -> Arc<Currency> {
        let handle = Arc::new(currency);
        self.inner
            .write()
            .expect("registry lock")
            .insert(handle.code(), handle.clone());
        handle
    }
}

impl Default for CurrencyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
