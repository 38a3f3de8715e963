//! Prometheus metrics and structured logging for the stop-limit watcher.
//!
//! - Structured logging with tracing (JSON in production)
//! - Prometheus counters for polls, market data errors, orders and outcomes

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, DEFAULT_FILTER};
pub use metrics::{gather_text, Metrics};
