//! Stop-limit price watcher.
//!
//! Wires the market data probe, order submitter and watch controllers
//! together:
//! - Shared REST client and request throttle
//! - Credential loading for live orders
//! - Concurrent watches with a common shutdown token
//! - JSON result lines and exit status

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;

pub use app::{run_watches, Application};
pub use cli::Args;
pub use config::{AppConfig, WatchConfig};
pub use error::{AppError, AppResult};
pub use output::{exit_code, render};
