//! Application configuration.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use stoplimit_core::{OrderSide, Price, Size};
use stoplimit_executor::{KeySource, DEFAULT_RECV_WINDOW_MS};
use stoplimit_market::{Network, ThrottleConfig};
use stoplimit_watcher::{WatchParams, DEFAULT_CHECK_INTERVAL, DEFAULT_TIMEOUT};

/// Environment variable holding the config file path.
pub const CONFIG_ENV_VAR: &str = "STOPLIMIT_CONFIG";

/// Request throttle limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleSettings {
    /// Request weight budget per minute, shared by all watches. Default: 1200.
    #[serde(default = "default_max_weight_per_minute")]
    pub max_weight_per_minute: u32,
    /// Maximum concurrent requests. Default: 8.
    #[serde(default = "default_max_inflight")]
    pub max_inflight: usize,
}

fn default_max_weight_per_minute() -> u32 {
    ThrottleConfig::default().max_weight_per_window
}

fn default_max_inflight() -> usize {
    ThrottleConfig::default().max_inflight
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            max_weight_per_minute: default_max_weight_per_minute(),
            max_inflight: default_max_inflight(),
        }
    }
}

impl From<&ThrottleSettings> for ThrottleConfig {
    fn from(s: &ThrottleSettings) -> Self {
        ThrottleConfig {
            max_weight_per_window: s.max_weight_per_minute,
            max_inflight: s.max_inflight,
        }
    }
}

/// Where API credentials come from.
///
/// A file path, when set, takes precedence over the environment variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_api_secret_env")]
    pub api_secret_env: String,
    #[serde(default)]
    pub api_key_file: Option<PathBuf>,
    #[serde(default)]
    pub api_secret_file: Option<PathBuf>,
}

fn default_api_key_env() -> String {
    "BINANCE_API_KEY".to_string()
}

fn default_api_secret_env() -> String {
    "BINANCE_API_SECRET".to_string()
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            api_secret_env: default_api_secret_env(),
            api_key_file: None,
            api_secret_file: None,
        }
    }
}

impl CredentialsConfig {
    pub fn api_key_source(&self) -> KeySource {
        source(&self.api_key_file, &self.api_key_env)
    }

    pub fn api_secret_source(&self) -> KeySource {
        source(&self.api_secret_file, &self.api_secret_env)
    }
}

fn source(file: &Option<PathBuf>, env: &str) -> KeySource {
    match file {
        Some(path) => KeySource::File { path: path.clone() },
        None => KeySource::env(env),
    }
}

/// One watch from the `[[watches]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    pub symbol: String,
    pub side: OrderSide,
    pub stop_price: Price,
    pub limit_price: Price,
    pub quantity: Size,
    /// Poll interval (seconds). Falls back to `default_interval_secs`.
    #[serde(default)]
    pub interval_secs: Option<f64>,
    /// Timeout (seconds, 0 = none). Falls back to `default_timeout_secs`.
    #[serde(default)]
    pub timeout_secs: Option<f64>,
    #[serde(default)]
    pub dry_run: bool,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Exchange environment.
    #[serde(default)]
    pub network: Network,
    /// REST base URL override. Defaults to the network's URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// HTTP request timeout (ms). Default: 10,000.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
    /// `recvWindow` for signed requests (ms). Default: 5,000.
    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,
    #[serde(default)]
    pub throttle: ThrottleSettings,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Poll interval for watches that do not set one (seconds). Default: 5.
    #[serde(default = "default_interval_secs")]
    pub default_interval_secs: f64,
    /// Timeout for watches that do not set one (seconds). Default: 3600.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: f64,
    /// Watches run concurrently.
    #[serde(default)]
    pub watches: Vec<WatchConfig>,
}

fn default_http_timeout_ms() -> u64 {
    stoplimit_market::DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_recv_window_ms() -> u64 {
    DEFAULT_RECV_WINDOW_MS
}

fn default_interval_secs() -> f64 {
    DEFAULT_CHECK_INTERVAL.as_secs_f64()
}

fn default_timeout_secs() -> f64 {
    DEFAULT_TIMEOUT.as_secs_f64()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            base_url: None,
            http_timeout_ms: default_http_timeout_ms(),
            recv_window_ms: default_recv_window_ms(),
            throttle: ThrottleSettings::default(),
            credentials: CredentialsConfig::default(),
            default_interval_secs: default_interval_secs(),
            default_timeout_secs: default_timeout_secs(),
            watches: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config {path}: {e}")))
    }

    /// Load from `path`, or return defaults when no path is given.
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// REST base URL: explicit override, else the network default.
    pub fn rest_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.network.base_url().to_string())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Resolve a configured watch into unvalidated params, applying defaults.
    pub fn watch_params(&self, watch: &WatchConfig) -> AppResult<WatchParams> {
        let interval = watch.interval_secs.unwrap_or(self.default_interval_secs);
        let timeout = watch.timeout_secs.unwrap_or(self.default_timeout_secs);
        Ok(WatchParams {
            symbol: watch.symbol.clone(),
            side: watch.side,
            stop_price: watch.stop_price,
            limit_price: watch.limit_price,
            quantity: watch.quantity,
            check_interval: seconds("interval", interval)?,
            timeout: seconds("timeout", timeout)?,
            dry_run: watch.dry_run,
        })
    }
}

/// Convert a seconds value to a `Duration`, rejecting negative or non-finite input.
pub fn seconds(field: &str, secs: f64) -> AppResult<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| AppError::Config(format!("{field} must be a non-negative number of seconds, got {secs}")))
}
