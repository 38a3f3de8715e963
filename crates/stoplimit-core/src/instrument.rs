//! Instrument identity and trading filters.

use crate::{CoreError, Price, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum accepted symbol length.
pub const MIN_SYMBOL_LEN: usize = 3;

/// Exchange instrument identifier, normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a symbol.
    ///
    /// Trims whitespace, uppercases, and requires at least
    /// [`MIN_SYMBOL_LEN`] ASCII alphanumeric characters.
    pub fn new(raw: &str) -> Result<Self, CoreError> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.len() < MIN_SYMBOL_LEN {
            return Err(CoreError::InvalidSymbol(format!(
                "{raw:?}: must be at least {MIN_SYMBOL_LEN} characters"
            )));
        }
        if !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidSymbol(format!(
                "{raw:?}: only ASCII letters and digits are allowed"
            )));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

/// Trading filters for one instrument.
///
/// `None` means the exchange publishes no constraint for that dimension.
/// Fetched once per watch and read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstrumentFilters {
    /// Quantity step size (LOT_SIZE).
    pub step_size: Option<Size>,
    /// Price tick size (PRICE_FILTER).
    pub tick_size: Option<Price>,
}

impl InstrumentFilters {
    pub fn new(step_size: Option<Size>, tick_size: Option<Price>) -> Self {
        // A zero step/tick is how the exchange spells "filter disabled".
        Self {
            step_size: step_size.filter(Size::is_positive),
            tick_size: tick_size.filter(Price::is_positive),
        }
    }

    /// Quantize a configured quantity and limit price to these filters.
    pub fn adjust(&self, quantity: Size, limit_price: Price) -> Result<AdjustedOrderParams, CoreError> {
        Ok(AdjustedOrderParams {
            quantity: quantity.quantize_down(self.step_size)?,
            limit_price: limit_price.quantize_down(self.tick_size)?,
        })
    }
}

/// Order parameters after quantization. Computed once before polling starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustedOrderParams {
    pub quantity: Size,
    pub limit_price: Price,
}
