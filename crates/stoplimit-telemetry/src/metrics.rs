//! Prometheus metrics for the stop-limit watcher.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`; it only fails on a duplicate
//! metric name.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_int_gauge, CounterVec, Encoder, IntGauge, TextEncoder,
};

/// Total price polls.
/// Labels: symbol
pub static POLLS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "stoplimit_polls_total",
        "Total last-price polls",
        &["symbol"]
    )
    .unwrap()
});

/// Total failed price fetches during polling.
/// Labels: symbol
pub static MARKET_DATA_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "stoplimit_market_data_errors_total",
        "Total market data fetch failures",
        &["symbol"]
    )
    .unwrap()
});

/// Total order submissions.
/// Labels: symbol, result (accepted/dry_run/rejected/error)
pub static ORDERS_SUBMITTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "stoplimit_orders_submitted_total",
        "Total limit order submissions",
        &["symbol", "result"]
    )
    .unwrap()
});

/// Total finished watches.
/// Labels: outcome (triggered/timed_out/cancelled/failed)
pub static WATCH_OUTCOMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "stoplimit_watch_outcomes_total",
        "Total finished watches by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Watches currently running.
pub static ACTIVE_WATCHES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("stoplimit_active_watches", "Watches currently running").unwrap()
});

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    /// Record one price poll.
    pub fn poll(symbol: &str) {
        POLLS_TOTAL.with_label_values(&[symbol]).inc();
    }

    /// Record a failed price fetch.
    pub fn market_data_error(symbol: &str) {
        MARKET_DATA_ERRORS_TOTAL.with_label_values(&[symbol]).inc();
    }

    /// Record an order submission and its result class.
    pub fn order_submitted(symbol: &str, result: &str) {
        ORDERS_SUBMITTED_TOTAL
            .with_label_values(&[symbol, result])
            .inc();
    }

    /// Record a watch reaching a terminal state.
    pub fn watch_finished(outcome: &str) {
        WATCH_OUTCOMES_TOTAL.with_label_values(&[outcome]).inc();
        ACTIVE_WATCHES.dec();
    }

    pub fn watch_started() {
        ACTIVE_WATCHES.inc();
    }
}

/// Render every registered metric in the Prometheus text format.
pub fn gather_text() -> TelemetryResult<String> {
    let mut buf = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
    Ok(String::from_utf8(buf)?)
}
