//! JSON result reporting and process exit status.

use serde::Serialize;
use stoplimit_core::{AdjustedOrderParams, OrderSide, Price, Symbol};
use stoplimit_executor::OrderResult;
use stoplimit_watcher::{WatchOutcome, WatchReport, WatchState};

/// Serializable view of one finished watch.
#[derive(Debug, Serialize)]
pub struct WatchResultJson<'a> {
    pub symbol: &'a Symbol,
    pub side: OrderSide,
    pub stop_price: Price,
    pub outcome: WatchState,
    pub trigger_price: Option<Price>,
    pub order: Option<&'a OrderResult>,
    pub error: Option<String>,
    pub adjusted: Option<&'a AdjustedOrderParams>,
    pub stats: StatsJson,
}

#[derive(Debug, Serialize)]
pub struct StatsJson {
    pub polls: u64,
    pub market_data_errors: u64,
    pub orders_submitted: u64,
    pub elapsed_ms: u64,
}

impl<'a> From<&'a WatchReport> for WatchResultJson<'a> {
    fn from(report: &'a WatchReport) -> Self {
        let (order, error) = match report.outcome.order() {
            Some(Ok(order)) => (Some(order), None),
            Some(Err(e)) => (None, Some(e.to_string())),
            None => match &report.outcome {
                WatchOutcome::Failed { error } => (None, Some(error.to_string())),
                _ => (None, None),
            },
        };

        Self {
            symbol: &report.symbol,
            side: report.side,
            stop_price: report.stop_price,
            outcome: report.outcome.state(),
            trigger_price: report.outcome.trigger_price(),
            order,
            error,
            adjusted: report.adjusted.as_ref(),
            stats: StatsJson {
                polls: report.stats.polls,
                market_data_errors: report.stats.market_data_errors,
                orders_submitted: report.stats.orders_submitted,
                elapsed_ms: report.stats.elapsed.as_millis() as u64,
            },
        }
    }
}

/// One JSON object per line.
pub fn render(report: &WatchReport) -> serde_json::Result<String> {
    serde_json::to_string(&WatchResultJson::from(report))
}

/// 0 when every watch triggered with an accepted order or timed out.
pub fn exit_code(reports: &[WatchReport]) -> i32 {
    if !reports.is_empty() && reports.iter().all(|r| r.outcome.is_success()) {
        0
    } else {
        1
    }
}
