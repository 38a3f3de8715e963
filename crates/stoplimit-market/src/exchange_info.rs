//! Exchange instrument metadata.
//!
//! Parses the `exchangeInfo` payload into [`InstrumentFilters`]. Only the two
//! filters the watcher quantizes against are read; every other filter type is
//! accepted and ignored.

use crate::error::{MarketDataError, MarketDataResult};
use rust_decimal::Decimal;
use serde::Deserialize;
use stoplimit_core::{InstrumentFilters, Price, Size, Symbol};
use tracing::{debug, warn};

/// Trading status of a listed symbol that accepts new orders.
pub const STATUS_TRADING: &str = "TRADING";

/// `GET /api/v3/exchangeInfo` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfoResponse {
    #[serde(default)]
    pub symbols: Vec<RawSymbolInfo>,
}

/// Raw symbol entry from `exchangeInfo`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub filters: Vec<RawSymbolFilter>,
}

/// Raw symbol filter, tagged by `filterType`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "filterType")]
pub enum RawSymbolFilter {
    #[serde(rename = "PRICE_FILTER")]
    PriceFilter {
        #[serde(rename = "tickSize", with = "rust_decimal::serde::str")]
        tick_size: Decimal,
    },
    #[serde(rename = "LOT_SIZE")]
    LotSize {
        #[serde(rename = "stepSize", with = "rust_decimal::serde::str")]
        step_size: Decimal,
    },
    #[serde(other)]
    Other,
}

impl RawSymbolInfo {
    /// Extract step and tick sizes. A missing filter is treated as unconstrained.
    pub fn to_filters(&self) -> InstrumentFilters {
        let mut step_size = None;
        let mut tick_size = None;
        for filter in &self.filters {
            match filter {
                RawSymbolFilter::PriceFilter { tick_size: t } => tick_size = Some(Price::new(*t)),
                RawSymbolFilter::LotSize { step_size: s } => step_size = Some(Size::new(*s)),
                RawSymbolFilter::Other => {}
            }
        }
        InstrumentFilters::new(step_size, tick_size)
    }
}

/// Find `symbol` in an `exchangeInfo` response and extract its filters.
///
/// # Errors
/// [`MarketDataError::SymbolNotFound`] if the symbol is not listed.
pub fn parse_filters(
    response: &ExchangeInfoResponse,
    symbol: &Symbol,
) -> MarketDataResult<InstrumentFilters> {
    let info = response
        .symbols
        .iter()
        .find(|s| s.symbol.eq_ignore_ascii_case(symbol.as_str()))
        .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

    if info.status != STATUS_TRADING {
        // Orders may still be rejected later; the watch itself can proceed.
        warn!(
            symbol = %symbol,
            status = %info.status,
            "Symbol is not in TRADING status"
        );
    }

    let filters = info.to_filters();
    debug!(
        symbol = %symbol,
        step_size = ?filters.step_size,
        tick_size = ?filters.tick_size,
        "Parsed instrument filters"
    );
    Ok(filters)
}
