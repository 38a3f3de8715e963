//! Core domain types for the stop-limit watcher.
//!
//! This crate provides fundamental types used throughout the workspace:
//! - `Price`, `Size`: Precision-safe numeric types and `quantize_down`
//! - `Symbol`, `InstrumentFilters`, `AdjustedOrderParams`: Instrument data
//! - `OrderSide`, `OrderType`, `TimeInForce`, `OrderStatus`: Trading enums

pub mod decimal;
pub mod error;
pub mod instrument;
pub mod order;

pub use decimal::{quantize_down, unit_precision, Price, Size};
pub use error::{CoreError, Result};
pub use instrument::{AdjustedOrderParams, InstrumentFilters, Symbol, MIN_SYMBOL_LEN};
pub use order::{ClientOrderId, OrderSide, OrderStatus, OrderType, TimeInForce};
