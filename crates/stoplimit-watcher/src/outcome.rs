//! Watch states, outcomes and reports.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use stoplimit_core::{AdjustedOrderParams, OrderSide, Price, Symbol};
use stoplimit_executor::{OrderError, OrderResult};

use crate::error::WatchError;

/// Watch lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatchState {
    Initializing,
    Polling,
    Triggered,
    TimedOut,
    Cancelled,
    Failed,
}

impl WatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "INITIALIZING",
            Self::Polling => "POLLING",
            Self::Triggered => "TRIGGERED",
            Self::TimedOut => "TIMED_OUT",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Initializing | Self::Polling)
    }
}

impl fmt::Display for WatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a watch.
#[derive(Debug, Clone)]
pub enum WatchOutcome {
    /// The stop fired and exactly one order submission was attempted.
    Triggered {
        trigger_price: Price,
        order: Result<OrderResult, OrderError>,
    },
    TimedOut,
    Cancelled,
    Failed { error: WatchError },
}

impl WatchOutcome {
    pub fn state(&self) -> WatchState {
        match self {
            Self::Triggered { .. } => WatchState::Triggered,
            Self::TimedOut => WatchState::TimedOut,
            Self::Cancelled => WatchState::Cancelled,
            Self::Failed { .. } => WatchState::Failed,
        }
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Triggered { .. } => "triggered",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
            Self::Failed { .. } => "failed",
        }
    }

    /// Triggered with an accepted (or dry-run) order, or timed out quietly.
    pub fn is_success(&self) -> bool {
        match self {
            Self::Triggered { order, .. } => order.is_ok(),
            Self::TimedOut => true,
            Self::Cancelled | Self::Failed { .. } => false,
        }
    }

    pub fn trigger_price(&self) -> Option<Price> {
        match self {
            Self::Triggered { trigger_price, .. } => Some(*trigger_price),
            _ => None,
        }
    }

    pub fn order(&self) -> Option<&Result<OrderResult, OrderError>> {
        match self {
            Self::Triggered { order, .. } => Some(order),
            _ => None,
        }
    }
}

/// Counters collected over one watch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    /// Price fetch attempts, successful or not.
    pub polls: u64,
    pub market_data_errors: u64,
    pub orders_submitted: u64,
    pub elapsed: Duration,
}

/// Outcome plus the context needed to report it.
#[derive(Debug, Clone)]
pub struct WatchReport {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub stop_price: Price,
    pub outcome: WatchOutcome,
    pub stats: WatchStats,
    /// Quantized order parameters, once filters were fetched.
    pub adjusted: Option<AdjustedOrderParams>,
}
