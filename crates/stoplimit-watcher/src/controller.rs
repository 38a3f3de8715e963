//! Watch loop controller.
//!
//! Drives one stop-limit watch through
//! `Initializing -> Polling -> {Triggered, TimedOut, Cancelled, Failed}`.
//!
//! - Filters are fetched once; a failure there is fatal.
//! - Price fetch failures while polling are logged, counted and retried on
//!   the next tick.
//! - At most one order is submitted. Submission is never raced against
//!   cancellation: once started it is awaited to completion.

use std::sync::Arc;

use stoplimit_core::AdjustedOrderParams;
use stoplimit_executor::{DynOrderSubmitter, OrderError, OrderResult, OrderSubmitter};
use stoplimit_market::{DynMarketDataProbe, MarketDataProbe};
use stoplimit_telemetry::Metrics;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::error::WatchError;
use crate::outcome::{WatchOutcome, WatchReport, WatchState, WatchStats};
use crate::request::WatchRequest;
use crate::trigger::is_triggered;

/// Runs a single watch against a market data probe and an order submitter.
pub struct WatchController {
    probe: DynMarketDataProbe,
    submitter: DynOrderSubmitter,
    cancel: CancellationToken,
}

impl WatchController {
    /// Create a controller.
    ///
    /// # Arguments
    /// * `probe` - Source of filters and last prices
    /// * `submitter` - Order submitter (handles dry runs itself)
    /// * `cancel` - Cancels the watch; observed between and during price fetches
    pub fn new(
        probe: Arc<dyn MarketDataProbe>,
        submitter: Arc<dyn OrderSubmitter>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            probe,
            submitter,
            cancel,
        }
    }

    /// Run the watch to a terminal state.
    pub async fn run(&self, request: &WatchRequest) -> WatchReport {
        let span = info_span!(
            "watch",
            symbol = %request.symbol(),
            side = %request.side(),
            stop_price = %request.stop_price(),
        );
        self.run_inner(request).instrument(span).await
    }

    async fn run_inner(&self, request: &WatchRequest) -> WatchReport {
        let started = Instant::now();
        let mut stats = WatchStats::default();
        Metrics::watch_started();

        info!(
            limit_price = %request.limit_price(),
            quantity = %request.quantity(),
            interval_ms = request.check_interval().as_millis() as u64,
            timeout_ms = request.timeout().map(|t| t.as_millis() as u64),
            dry_run = request.dry_run(),
            "Watch started"
        );

        let (outcome, adjusted) = self.drive(request, &mut stats, started).await;
        stats.elapsed = started.elapsed();
        Metrics::watch_finished(outcome.label());

        match &outcome {
            WatchOutcome::Failed { error } => {
                error!(error = %error, polls = stats.polls, "Watch failed");
            }
            other => {
                info!(
                    state = %other.state(),
                    polls = stats.polls,
                    market_data_errors = stats.market_data_errors,
                    elapsed_ms = stats.elapsed.as_millis() as u64,
                    "Watch finished"
                );
            }
        }

        WatchReport {
            symbol: request.symbol().clone(),
            side: request.side(),
            stop_price: request.stop_price(),
            outcome,
            stats,
            adjusted,
        }
    }

    async fn drive(
        &self,
        request: &WatchRequest,
        stats: &mut WatchStats,
        started: Instant,
    ) -> (WatchOutcome, Option<AdjustedOrderParams>) {
        let adjusted = match self.initialize(request).await {
            Ok(Some(adjusted)) => adjusted,
            Ok(None) => return (WatchOutcome::Cancelled, None),
            Err((error, adjusted)) => return (WatchOutcome::Failed { error }, adjusted),
        };

        debug!(state = %WatchState::Polling, "State transition");
        let outcome = self.poll(request, &adjusted, stats, started).await;
        (outcome, Some(adjusted))
    }

    /// Fetch filters and quantize. `Ok(None)` means cancelled.
    async fn initialize(
        &self,
        request: &WatchRequest,
    ) -> Result<Option<AdjustedOrderParams>, (WatchError, Option<AdjustedOrderParams>)> {
        let symbol = request.symbol();

        let filters = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(None),
            res = self.probe.fetch_filters(symbol) => res.map_err(|e| (WatchError::from(e), None))?,
        };

        let adjusted = filters
            .adjust(request.quantity(), request.limit_price())
            .map_err(|e| (WatchError::from(e), None))?;
        info!(
            step_size = ?filters.step_size,
            tick_size = ?filters.tick_size,
            quantity = %adjusted.quantity,
            limit_price = %adjusted.limit_price,
            "Order parameters quantized"
        );

        if !adjusted.quantity.is_positive() {
            return Err((
                WatchError::Configuration(format!(
                    "quantity {} rounds to {} at step size {}",
                    request.quantity(),
                    adjusted.quantity,
                    display_unit(filters.step_size),
                )),
                Some(adjusted),
            ));
        }
        if !adjusted.limit_price.is_positive() {
            return Err((
                WatchError::Configuration(format!(
                    "limit price {} rounds to {} at tick size {}",
                    request.limit_price(),
                    adjusted.limit_price,
                    display_unit(filters.tick_size),
                )),
                Some(adjusted),
            ));
        }

        Ok(Some(adjusted))
    }

    async fn poll(
        &self,
        request: &WatchRequest,
        adjusted: &AdjustedOrderParams,
        stats: &mut WatchStats,
        started: Instant,
    ) -> WatchOutcome {
        let symbol = request.symbol();
        let deadline = request.timeout().map(|timeout| started + timeout);

        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return WatchOutcome::TimedOut;
            }

            // A fetch stalled behind the throttle or the HTTP timeout still ends at the deadline.
            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return WatchOutcome::Cancelled,
                res = self.probe.fetch_last_price(symbol) => res,
                _ = deadline_reached(deadline) => return WatchOutcome::TimedOut,
            };
            stats.polls += 1;
            Metrics::poll(symbol.as_str());

            match fetched {
                Ok(last_price) => {
                    debug!(
                        last_price = %last_price,
                        stop_price = %request.stop_price(),
                        "Polled last price"
                    );
                    if is_triggered(request.side(), request.stop_price(), last_price) {
                        info!(
                            last_price = %last_price,
                            stop_price = %request.stop_price(),
                            "Stop triggered"
                        );
                        let order = self.submit(request, adjusted, stats).await;
                        return WatchOutcome::Triggered {
                            trigger_price: last_price,
                            order,
                        };
                    }
                }
                Err(e) => {
                    stats.market_data_errors += 1;
                    Metrics::market_data_error(symbol.as_str());
                    warn!(error = %e, "Price fetch failed, retrying next interval");
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return WatchOutcome::Cancelled,
                _ = tokio::time::sleep(request.check_interval()) => {}
                _ = deadline_reached(deadline) => return WatchOutcome::TimedOut,
            }
        }
    }

    async fn submit(
        &self,
        request: &WatchRequest,
        adjusted: &AdjustedOrderParams,
        stats: &mut WatchStats,
    ) -> Result<OrderResult, OrderError> {
        let symbol = request.symbol();
        stats.orders_submitted += 1;

        let result = self
            .submitter
            .submit_limit_order(
                symbol,
                request.side(),
                adjusted.quantity,
                adjusted.limit_price,
                request.dry_run(),
            )
            .await;

        let label = match &result {
            Ok(order) if order.dry_run => "dry_run",
            Ok(_) => "accepted",
            Err(e) if e.is_rejection() => "rejected",
            Err(_) => "error",
        };
        Metrics::order_submitted(symbol.as_str(), label);

        match &result {
            Ok(order) => info!(
                order_id = ?order.order_id,
                client_order_id = %order.client_order_id,
                status = %order.status,
                "Limit order submitted"
            ),
            Err(e) => error!(error = %e, "Limit order submission failed"),
        }
        result
    }
}

/// Completes at `deadline`; never completes without one.
async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn display_unit<T: std::fmt::Display>(unit: Option<T>) -> String {
    unit.map_or_else(|| "none".to_string(), |u| u.to_string())
}
