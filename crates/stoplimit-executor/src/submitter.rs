//! Limit order submission.
//!
//! [`OrderSubmitter`] places exactly one GTC limit order per call. Dry-run
//! requests never touch the network and return a synthetic `DRY_RUN` result
//! echoing the parameters.

use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use stoplimit_core::{
    ClientOrderId, OrderSide, OrderStatus, OrderType, Price, Size, Symbol, TimeInForce,
};
use stoplimit_market::{ApiErrorBody, BoxFuture, RequestThrottle};
use tracing::{info, warn};

use crate::error::{OrderError, SubmitResult};
use crate::signer::RequestSigner;

/// Request weight of `POST /api/v3/order`.
const WEIGHT_ORDER: u32 = 1;

/// Parameters of one limit order, already quantized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimitOrderRequest {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Size,
    pub price: Price,
    pub time_in_force: TimeInForce,
    pub client_order_id: ClientOrderId,
}

impl LimitOrderRequest {
    /// GTC limit order with a fresh client order id.
    pub fn gtc(symbol: Symbol, side: OrderSide, quantity: Size, price: Price) -> Self {
        Self {
            symbol,
            side,
            quantity,
            price,
            time_in_force: TimeInForce::GoodTilCancelled,
            client_order_id: ClientOrderId::new(),
        }
    }

    /// Form fields in exchange spelling, without `recvWindow`/`timestamp`.
    fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("symbol", self.symbol.to_string()),
            ("side", self.side.to_string()),
            ("type", OrderType::Limit.to_string()),
            ("timeInForce", self.time_in_force.to_string()),
            ("quantity", self.quantity.inner().normalize().to_string()),
            ("price", self.price.inner().normalize().to_string()),
            ("newClientOrderId", self.client_order_id.to_string()),
            ("newOrderRespType", "RESULT".to_string()),
        ]
    }
}

/// Outcome of a successful (or simulated) submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderResult {
    /// Exchange order id; `None` for dry runs.
    pub order_id: Option<u64>,
    pub client_order_id: ClientOrderId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub quantity: Size,
    pub price: Price,
    pub status: OrderStatus,
    pub dry_run: bool,
    /// Exchange transact time, or local time for dry runs (epoch ms).
    pub timestamp_ms: i64,
}

impl OrderResult {
    /// Synthetic result for a request that was not sent.
    pub fn dry_run(request: &LimitOrderRequest) -> Self {
        Self {
            order_id: None,
            client_order_id: request.client_order_id.clone(),
            symbol: request.symbol.clone(),
            side: request.side,
            order_type: OrderType::Limit,
            time_in_force: request.time_in_force,
            quantity: request.quantity,
            price: request.price,
            status: OrderStatus::DryRun,
            dry_run: true,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// `POST /api/v3/order` response (RESULT type).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewOrderResponse {
    order_id: u64,
    #[serde(default)]
    client_order_id: Option<String>,
    #[serde(default)]
    transact_time: Option<i64>,
    #[serde(default)]
    status: Option<OrderStatus>,
}

/// Places limit orders.
pub trait OrderSubmitter: Send + Sync {
    /// Submit one GTC limit order, or simulate it when `dry_run` is set.
    ///
    /// Never retries: every failure is returned as an [`OrderError`].
    fn submit_limit_order<'a>(
        &'a self,
        symbol: &'a Symbol,
        side: OrderSide,
        quantity: Size,
        price: Price,
        dry_run: bool,
    ) -> BoxFuture<'a, SubmitResult<OrderResult>>;
}

/// Arc wrapper for OrderSubmitter trait objects.
pub type DynOrderSubmitter = Arc<dyn OrderSubmitter>;

/// Order submitter for the spot REST API.
pub struct RestOrderSubmitter {
    client: Client,
    base_url: String,
    /// `None` when no credentials are configured (dry-run only).
    signer: Option<Arc<RequestSigner>>,
    throttle: Arc<RequestThrottle>,
}

impl RestOrderSubmitter {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        signer: Option<Arc<RequestSigner>>,
        throttle: Arc<RequestThrottle>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            signer,
            throttle,
        }
    }

    /// Send a signed limit order.
    pub async fn place(&self, request: LimitOrderRequest) -> SubmitResult<OrderResult> {
        let signer = self.signer.as_ref().ok_or(OrderError::MissingCredentials)?;
        let url = format!("{}/api/v3/order", self.base_url);

        let _permit = self
            .throttle
            .acquire(WEIGHT_ORDER)
            .await
            .map_err(|e| OrderError::Transport(e.to_string()))?;
        // Timestamp after any throttle wait so recvWindow is measured from send.
        let body = signer.signed_payload(&request.form_fields())?;

        info!(
            symbol = %request.symbol,
            side = %request.side,
            quantity = %request.quantity,
            price = %request.price,
            client_order_id = %request.client_order_id,
            "Submitting limit order"
        );

        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", signer.api_key())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| OrderError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| OrderError::Transport(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let api = ApiErrorBody::from_body(&text);
            warn!(
                symbol = %request.symbol,
                http_status = status.as_u16(),
                code = api.code,
                msg = %api.msg,
                "Order rejected"
            );
            return Err(OrderError::Rejected {
                status: status.as_u16(),
                code: api.code,
                msg: api.msg,
            });
        }

        let ack: NewOrderResponse =
            serde_json::from_str(&text).map_err(|e| OrderError::Decode(e.to_string()))?;

        info!(
            symbol = %request.symbol,
            order_id = ack.order_id,
            status = ?ack.status,
            "Order accepted"
        );

        Ok(OrderResult {
            order_id: Some(ack.order_id),
            client_order_id: ack
                .client_order_id
                .map(ClientOrderId::from)
                .unwrap_or(request.client_order_id),
            symbol: request.symbol,
            side: request.side,
            order_type: OrderType::Limit,
            time_in_force: request.time_in_force,
            quantity: request.quantity,
            price: request.price,
            status: ack.status.unwrap_or(OrderStatus::New),
            dry_run: false,
            timestamp_ms: ack
                .transact_time
                .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
        })
    }
}

impl OrderSubmitter for RestOrderSubmitter {
    fn submit_limit_order<'a>(
        &'a self,
        symbol: &'a Symbol,
        side: OrderSide,
        quantity: Size,
        price: Price,
        dry_run: bool,
    ) -> BoxFuture<'a, SubmitResult<OrderResult>> {
        Box::pin(async move {
            let request = LimitOrderRequest::gtc(symbol.clone(), side, quantity, price);
            if dry_run {
                info!(
                    symbol = %symbol,
                    side = %side,
                    quantity = %quantity,
                    price = %price,
                    "Dry run: order not sent"
                );
                return Ok(OrderResult::dry_run(&request));
            }
            self.place(request).await
        })
    }
}

/// Recorded call to [`MockOrderSubmitter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedOrder {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Size,
    pub price: Price,
    pub dry_run: bool,
}

/// Mock order submitter for testing.
#[derive(Debug, Default)]
pub struct MockOrderSubmitter {
    /// Recorded submissions for verification.
    submissions: Mutex<Vec<SubmittedOrder>>,
    /// Error to return instead of a result, if set.
    next_error: Mutex<Option<OrderError>>,
}

impl MockOrderSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent submission with `error`.
    pub fn set_error(&self, error: OrderError) {
        *self.next_error.lock() = Some(error);
    }

    pub fn submissions(&self) -> Vec<SubmittedOrder> {
        self.submissions.lock().clone()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().len()
    }
}

impl OrderSubmitter for MockOrderSubmitter {
    fn submit_limit_order<'a>(
        &'a self,
        symbol: &'a Symbol,
        side: OrderSide,
        quantity: Size,
        price: Price,
        dry_run: bool,
    ) -> BoxFuture<'a, SubmitResult<OrderResult>> {
        Box::pin(async move {
            self.submissions.lock().push(SubmittedOrder {
                symbol: symbol.clone(),
                side,
                quantity,
                price,
                dry_run,
            });
            if let Some(err) = self.next_error.lock().clone() {
                return Err(err);
            }
            let request = LimitOrderRequest::gtc(symbol.clone(), side, quantity, price);
            let mut result = OrderResult::dry_run(&request);
            if !dry_run {
                result.order_id = Some(self.submission_count() as u64);
                result.status = OrderStatus::New;
                result.dry_run = false;
            }
            Ok(result)
        })
    }
}
