//! REST client for exchange market data.
//!
//! Fetches last-trade prices, instrument filters and server time from the
//! public spot API. Every request goes through the shared [`RequestThrottle`].

use crate::error::{MarketDataError, MarketDataResult, ERR_CODE_INVALID_SYMBOL};
use crate::exchange_info::{parse_filters, ExchangeInfoResponse};
use crate::probe::{BoxFuture, MarketDataProbe};
use crate::throttle::RequestThrottle;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use stoplimit_core::{InstrumentFilters, Price, Symbol};
use tracing::{debug, info};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Request weights as published by the exchange.
const WEIGHT_TICKER_PRICE: u32 = 2;
const WEIGHT_EXCHANGE_INFO: u32 = 20;
const WEIGHT_SERVER_TIME: u32 = 1;

/// Exchange environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Production,
    Testnet,
}

impl Network {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Production => "https://api.binance.com",
            Self::Testnet => "https://testnet.binance.vision",
        }
    }
}

/// Build the HTTP client shared by the market data and order clients.
pub fn build_http_client(timeout: Duration) -> MarketDataResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| MarketDataError::HttpClient(format!("Failed to create HTTP client: {e}")))
}

#[derive(Debug, Deserialize)]
struct TickerPriceResponse {
    #[serde(with = "rust_decimal::serde::str")]
    price: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerTimeResponse {
    server_time: i64,
}

/// Client for public market data endpoints.
#[derive(Clone)]
pub struct BinanceMarketClient {
    client: Client,
    base_url: String,
    throttle: Arc<RequestThrottle>,
}

impl BinanceMarketClient {
    /// Create a market data client.
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client (see [`build_http_client`])
    /// * `base_url` - REST base URL, e.g. `https://api.binance.com`
    /// * `throttle` - Throttle shared with every other client of the same account
    pub fn new(client: Client, base_url: impl Into<String>, throttle: Arc<RequestThrottle>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            throttle,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Last-trade price via `GET /api/v3/ticker/price`.
    pub async fn fetch_last_price(&self, symbol: &Symbol) -> MarketDataResult<Price> {
        let resp: TickerPriceResponse = self
            .get_json(
                "/api/v3/ticker/price",
                &[("symbol", symbol.as_str())],
                WEIGHT_TICKER_PRICE,
            )
            .await?;
        debug!(symbol = %symbol, price = %resp.price, "Fetched last price");
        Ok(Price::new(resp.price))
    }

    /// Instrument filters via `GET /api/v3/exchangeInfo`.
    pub async fn fetch_filters(&self, symbol: &Symbol) -> MarketDataResult<InstrumentFilters> {
        info!(symbol = %symbol, "Fetching instrument filters");
        let resp: ExchangeInfoResponse = self
            .get_json(
                "/api/v3/exchangeInfo",
                &[("symbol", symbol.as_str())],
                WEIGHT_EXCHANGE_INFO,
            )
            .await
            .map_err(|e| match e {
                MarketDataError::Api { code, .. } if code == ERR_CODE_INVALID_SYMBOL => {
                    MarketDataError::SymbolNotFound(symbol.to_string())
                }
                other => other,
            })?;
        parse_filters(&resp, symbol)
    }

    /// Exchange server time in epoch milliseconds via `GET /api/v3/time`.
    pub async fn fetch_server_time(&self) -> MarketDataResult<i64> {
        let resp: ServerTimeResponse = self
            .get_json("/api/v3/time", &[], WEIGHT_SERVER_TIME)
            .await?;
        Ok(resp.server_time)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        weight: u32,
    ) -> MarketDataResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let _permit = self.throttle.acquire(weight).await?;

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| MarketDataError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MarketDataError::HttpClient(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(MarketDataError::from_api(status.as_u16(), &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| MarketDataError::Decode(format!("{path}: {e}")))
    }
}

impl MarketDataProbe for BinanceMarketClient {
    fn fetch_last_price<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, MarketDataResult<Price>> {
        Box::pin(BinanceMarketClient::fetch_last_price(self, symbol))
    }

    fn fetch_filters<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> BoxFuture<'a, MarketDataResult<InstrumentFilters>> {
        Box::pin(BinanceMarketClient::fetch_filters(self, symbol))
    }
}
