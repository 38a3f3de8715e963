//! Market data probe abstraction.
//!
//! The watch loop reads prices and instrument filters only through
//! [`MarketDataProbe`], so tests can drive it with a scripted price feed.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use stoplimit_core::{InstrumentFilters, Price, Symbol};

use crate::error::{MarketDataError, MarketDataResult};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Read-only source of last-trade prices and trading filters.
pub trait MarketDataProbe: Send + Sync {
    /// Most recent trade price for `symbol`.
    fn fetch_last_price<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, MarketDataResult<Price>>;

    /// Step and tick sizes for `symbol`.
    ///
    /// Returns [`MarketDataError::SymbolNotFound`] if the exchange does not list it.
    fn fetch_filters<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> BoxFuture<'a, MarketDataResult<InstrumentFilters>>;
}

/// Arc wrapper for MarketDataProbe trait objects.
pub type DynMarketDataProbe = Arc<dyn MarketDataProbe>;

/// Scripted probe for testing.
///
/// Price responses are served in order; once the script runs out the last
/// entry is repeated.
#[derive(Debug)]
pub struct MockMarketDataProbe {
    prices: Mutex<VecDeque<MarketDataResult<Price>>>,
    last: Mutex<Option<MarketDataResult<Price>>>,
    filters: Mutex<MarketDataResult<InstrumentFilters>>,
    latency: Mutex<Duration>,
    price_calls: AtomicU64,
    filter_calls: AtomicU64,
}

impl Default for MockMarketDataProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMarketDataProbe {
    pub fn new() -> Self {
        Self {
            prices: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            filters: Mutex::new(Ok(InstrumentFilters::default())),
            latency: Mutex::new(Duration::ZERO),
            price_calls: AtomicU64::new(0),
            filter_calls: AtomicU64::new(0),
        }
    }

    /// Create a probe that serves `prices` in order.
    pub fn with_prices(prices: impl IntoIterator<Item = Price>) -> Self {
        let probe = Self::new();
        for price in prices {
            probe.push_price(price);
        }
        probe
    }

    pub fn push_price(&self, price: Price) {
        self.prices.lock().push_back(Ok(price));
    }

    pub fn push_error(&self, error: MarketDataError) {
        self.prices.lock().push_back(Err(error));
    }

    pub fn set_filters(&self, filters: MarketDataResult<InstrumentFilters>) {
        *self.filters.lock() = filters;
    }

    /// Delay every response by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    pub fn price_calls(&self) -> u64 {
        self.price_calls.load(Ordering::SeqCst)
    }

    pub fn filter_calls(&self) -> u64 {
        self.filter_calls.load(Ordering::SeqCst)
    }

    fn next_price(&self) -> MarketDataResult<Price> {
        let mut last = self.last.lock();
        if let Some(next) = self.prices.lock().pop_front() {
            *last = Some(next.clone());
            return next;
        }
        last.clone().unwrap_or_else(|| {
            Err(MarketDataError::HttpClient("no scripted price".to_string()))
        })
    }
}

impl MarketDataProbe for MockMarketDataProbe {
    fn fetch_last_price<'a>(&'a self, _symbol: &'a Symbol) -> BoxFuture<'a, MarketDataResult<Price>> {
        Box::pin(async move {
            let latency = *self.latency.lock();
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            self.price_calls.fetch_add(1, Ordering::SeqCst);
            self.next_price()
        })
    }

    fn fetch_filters<'a>(
        &'a self,
        _symbol: &'a Symbol,
    ) -> BoxFuture<'a, MarketDataResult<InstrumentFilters>> {
        Box::pin(async move {
            self.filter_calls.fetch_add(1, Ordering::SeqCst);
            self.filters.lock().clone()
        })
    }
}
