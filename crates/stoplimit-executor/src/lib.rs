//! Limit order execution for the stop-limit watcher.
//!
//! Provides:
//! - [`OrderSubmitter`]: one-shot GTC limit order placement (or dry run)
//! - [`RestOrderSubmitter`]: signed REST implementation
//! - [`ApiCredentials`] / [`RequestSigner`]: credential loading and HMAC signing

pub mod error;
pub mod signer;
pub mod submitter;

pub use error::{OrderError, SubmitResult};
pub use signer::{ApiCredentials, KeyError, KeySource, RequestSigner, DEFAULT_RECV_WINDOW_MS};
pub use submitter::{
    DynOrderSubmitter, LimitOrderRequest, MockOrderSubmitter, OrderResult, OrderSubmitter,
    RestOrderSubmitter, SubmittedOrder,
};
