//! Exchange market data for the stop-limit watcher.
//!
//! - [`MarketDataProbe`]: last-trade price and instrument filters
//! - [`BinanceMarketClient`]: REST implementation over the public spot API
//! - [`RequestThrottle`]: request weight budget shared by every watch

pub mod client;
pub mod error;
pub mod exchange_info;
pub mod probe;
pub mod throttle;

pub use client::{build_http_client, BinanceMarketClient, Network, DEFAULT_TIMEOUT};
pub use error::{ApiErrorBody, MarketDataError, MarketDataResult, ERR_CODE_INVALID_SYMBOL};
pub use exchange_info::{parse_filters, ExchangeInfoResponse, RawSymbolFilter, RawSymbolInfo};
pub use probe::{BoxFuture, DynMarketDataProbe, MarketDataProbe, MockMarketDataProbe};
pub use throttle::{RequestThrottle, ThrottleConfig, ThrottlePermit, WEIGHT_WINDOW};
