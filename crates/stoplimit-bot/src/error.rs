//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Watch error: {0}")]
    Watch(#[from] stoplimit_watcher::WatchError),

    #[error("Market data error: {0}")]
    MarketData(#[from] stoplimit_market::MarketDataError),

    #[error("Credential error: {0}")]
    Key(#[from] stoplimit_executor::KeyError),
}

pub type AppResult<T> = Result<T, AppError>;
