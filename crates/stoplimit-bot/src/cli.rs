//! Command line arguments.

use crate::config::{seconds, AppConfig, CONFIG_ENV_VAR};
use crate::error::{AppError, AppResult};
use clap::Parser;
use stoplimit_core::{OrderSide, Price, Size};
use stoplimit_market::Network;
use stoplimit_watcher::{WatchParams, WatchRequest};

/// Stop-limit price watcher.
///
/// Polls the last-trade price and places one GTC limit order once the stop
/// price is crossed. A single watch can be given on the command line; more
/// can be listed under `[[watches]]` in the config file.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Trading pair, e.g. BTCUSDT
    #[arg(short, long)]
    pub symbol: Option<String>,

    /// BUY or SELL (case-insensitive)
    #[arg(long)]
    pub side: Option<OrderSide>,

    /// Stop (trigger) price
    #[arg(long)]
    pub stop: Option<Price>,

    /// Limit price of the order placed on trigger
    #[arg(long)]
    pub limit: Option<Price>,

    /// Order quantity
    #[arg(short, long)]
    pub quantity: Option<Size>,

    /// Poll interval in seconds (default from config, 5)
    #[arg(long)]
    pub interval: Option<f64>,

    /// Give up after this many seconds; 0 disables (default from config, 3600)
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Simulate the order instead of sending it
    #[arg(long)]
    pub dry_run: bool,

    /// Use the exchange testnet
    #[arg(long)]
    pub testnet: bool,

    /// Configuration file path (can also be set via STOPLIMIT_CONFIG env var)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long)]
    pub print_metrics: bool,
}

impl Args {
    /// Config path: CLI arg > STOPLIMIT_CONFIG env var > none.
    pub fn config_path(&self) -> Option<String> {
        self.config
            .clone()
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
    }

    /// Apply command-line overrides to a loaded config.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if self.testnet {
            config.network = Network::Testnet;
        }
    }

    /// The watch given on the command line, if any.
    ///
    /// # Errors
    /// `AppError::Config` if `--symbol` is given without the other order fields.
    pub fn watch_params(&self, config: &AppConfig) -> AppResult<Option<WatchParams>> {
        let Some(symbol) = &self.symbol else {
            return Ok(None);
        };

        let missing = |name: &str| AppError::Config(format!("--{name} is required with --symbol"));
        let interval = self.interval.unwrap_or(config.default_interval_secs);
        let timeout = self.timeout.unwrap_or(config.default_timeout_secs);

        Ok(Some(WatchParams {
            symbol: symbol.clone(),
            side: self.side.ok_or_else(|| missing("side"))?,
            stop_price: self.stop.ok_or_else(|| missing("stop"))?,
            limit_price: self.limit.ok_or_else(|| missing("limit"))?,
            quantity: self.quantity.ok_or_else(|| missing("quantity"))?,
            check_interval: seconds("interval", interval)?,
            timeout: seconds("timeout", timeout)?,
            dry_run: self.dry_run,
        }))
    }

    /// Every watch to run: `[[watches]]` from the config, then the command-line watch.
    ///
    /// # Errors
    /// The first watch that fails validation.
    pub fn watch_requests(&self, config: &AppConfig) -> AppResult<Vec<WatchRequest>> {
        let mut params = config
            .watches
            .iter()
            .map(|watch| config.watch_params(watch))
            .collect::<AppResult<Vec<_>>>()?;
        if let Some(cli_watch) = self.watch_params(config)? {
            params.push(cli_watch);
        }

        let requests = params
            .into_iter()
            .map(WatchParams::validate)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(requests)
    }
}
