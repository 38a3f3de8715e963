//! Watch error types.

use stoplimit_core::CoreError;
use stoplimit_market::MarketDataError;
use thiserror::Error;

/// Errors that end a watch in the `Failed` state.
///
/// Order submission failures are not here: they are carried inside the
/// `Triggered` outcome.
#[derive(Debug, Clone, Error)]
pub enum WatchError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),

    /// The task driving the watch panicked or was aborted.
    #[error("Watch task failed: {0}")]
    Task(String),
}

impl From<CoreError> for WatchError {
    fn from(e: CoreError) -> Self {
        Self::Configuration(e.to_string())
    }
}

pub type WatchResult<T> = Result<T, WatchError>;
