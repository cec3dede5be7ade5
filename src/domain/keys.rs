//! Key Normalizer - Candidate Price Keys for a Dashboard Row
//!
//! A price feed subject is addressed by a lookup key of the form
//! `<segment>:<symbol>[<expiry>][<strike>][<optionType>]`. Dashboard rows
//! only carry the broker's exchange code, so every row expands into an
//! ordered candidate list; the renderer uses the first candidate that has
//! a cached price.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a bound dashboard row (e.g. `"42/requests/1187"`).
pub type RowId = String;

/// Segments tried, in this order, when a row's exchange is unknown.
pub const STANDARD_SEGMENTS: [&str; 4] = ["NSE", "BSE", "NFO", "BFO"];

/// Base exchange assumed for option keys when a row carries none.
pub const DEFAULT_OPTION_EXCHANGE: Exchange = Exchange::Nf;

/// Broker exchange codes with a known segment mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    /// NSE futures & options.
    Nf,
    /// BSE futures & options.
    Bf,
    /// NSE cash.
    Nc,
    /// BSE cash.
    Bc,
}

impl Exchange {
    /// Parse a broker exchange code (case-insensitive).
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "NF" => Some(Self::Nf),
            "BF" => Some(Self::Bf),
            "NC" => Some(Self::Nc),
            "BC" => Some(Self::Bc),
            _ => None,
        }
    }

    /// Broker code as sent by the backend.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Nf => "NF",
            Self::Bf => "BF",
            Self::Nc => "NC",
            Self::Bc => "BC",
        }
    }

    /// Equity-like segment the underlying trades on.
    pub const fn underlying_segment(self) -> &'static str {
        match self {
            Self::Nf | Self::Nc => "NSE",
            Self::Bf | Self::Bc => "BSE",
        }
    }

    /// Derivatives segment, if the exchange lists derivatives.
    pub const fn derivatives_segment(self) -> Option<&'static str> {
        match self {
            Self::Nf => Some("NFO"),
            Self::Bf => Some("BFO"),
            Self::Nc | Self::Bc => None,
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Canonical price lookup key. Opaque to the cache: equality is exact
/// string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupKey(String);

impl LookupKey {
    /// Wrap an already-formatted key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Compose `<segment>:<symbol>`.
    pub fn scoped(segment: &str, symbol: &str) -> Self {
        Self(format!("{segment}:{symbol}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for LookupKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LookupKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for LookupKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Identifying fields of a dashboard row, as delivered by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowIdentity {
    /// Broker exchange code (`NF`, `BF`, `NC`, `BC`), if known.
    pub exchange: Option<String>,
    /// Instrument / trading symbol.
    pub symbol: String,
    /// Option strike, already rendered as text.
    pub strike: Option<String>,
    /// Option expiry, as the backend spells it.
    pub expiry: Option<String>,
    /// `CE` / `PE`.
    pub option_type: Option<String>,
}

impl RowIdentity {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    #[must_use]
    pub fn with_strike(mut self, strike: impl Into<String>) -> Self {
        self.strike = Some(strike.into());
        self
    }

    #[must_use]
    pub fn with_expiry(mut self, expiry: impl Into<String>) -> Self {
        self.expiry = Some(expiry.into());
        self
    }

    #[must_use]
    pub fn with_option_type(mut self, option_type: impl Into<String>) -> Self {
        self.option_type = Some(option_type.into());
        self
    }

    /// Exchange code, or `None` when absent or blank.
    pub fn exchange_code(&self) -> Option<&str> {
        non_blank(self.exchange.as_deref())
    }

    /// Strike, or `None` when absent or blank.
    pub fn strike_text(&self) -> Option<&str> {
        non_blank(self.strike.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Segment used for option-specific keys.
///
/// Known exchanges map to their derivatives segment, other codes are used
/// as-is (upper-cased), and a missing exchange falls back to
/// [`DEFAULT_OPTION_EXCHANGE`].
pub fn option_segment(exchange: Option<&str>) -> String {
    match non_blank(exchange) {
        None => DEFAULT_OPTION_EXCHANGE
            .derivatives_segment()
            .unwrap_or(DEFAULT_OPTION_EXCHANGE.code())
            .to_string(),
        Some(code) => Exchange::parse(code)
            .and_then(Exchange::derivatives_segment)
            .map_or_else(|| code.to_ascii_uppercase(), str::to_string),
    }
}

/// Resolve the ordered candidate keys for a row, most preferred first.
///
/// 1. Known exchange: underlying segment, then derivatives segment if any.
/// 2. Unknown or blank exchange: all four [`STANDARD_SEGMENTS`].
/// 3. With a strike: the option key is appended last.
pub fn candidate_keys(row: &RowIdentity) -> Vec<LookupKey> {
    let symbol = row.symbol.trim();
    let mut candidates = Vec::with_capacity(5);

    match row.exchange_code().and_then(Exchange::parse) {
        Some(exchange) => {
            candidates.push(LookupKey::scoped(exchange.underlying_segment(), symbol));
            if let Some(segment) = exchange.derivatives_segment() {
                candidates.push(LookupKey::scoped(segment, symbol));
            }
        }
        None => {
            candidates.extend(
                STANDARD_SEGMENTS
                    .iter()
                    .map(|segment| LookupKey::scoped(segment, symbol)),
            );
        }
    }

    if let Some(strike) = row.strike_text() {
        let segment = option_segment(row.exchange_code());
        let expiry = non_blank(row.expiry.as_deref()).unwrap_or_default();
        let option_type = non_blank(row.option_type.as_deref()).unwrap_or_default();
        candidates.push(LookupKey::new(format!(
            "{segment}:{symbol}{expiry}{strike}{option_type}"
        )));
    }

    candidates
}
