//! Stop-limit watching.
//!
//! A watch polls the last-trade price of one instrument and, once the stop
//! price is crossed, submits a single quantized GTC limit order.
//!
//! - [`is_triggered`]: pure stop trigger decision
//! - [`WatchRequest`]: validated, immutable watch parameters
//! - [`WatchController`]: the polling state machine

pub mod controller;
pub mod error;
pub mod outcome;
pub mod request;
pub mod trigger;

pub use controller::WatchController;
pub use error::{WatchError, WatchResult};
pub use outcome::{WatchOutcome, WatchReport, WatchState, WatchStats};
pub use request::{WatchParams, WatchRequest, DEFAULT_CHECK_INTERVAL, DEFAULT_TIMEOUT};
pub use trigger::is_triggered;
