//! Executor error types.

use thiserror::Error;

/// Order submission failure.
///
/// Terminal for a watch: the controller reports it verbatim and never retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("No API credentials configured for live order submission")]
    MissingCredentials,

    #[error("Order transport failed: {0}")]
    Transport(String),

    #[error("Order rejected: HTTP {status}, code {code}: {msg}")]
    Rejected { status: u16, code: i64, msg: String },

    #[error("Failed to decode order response: {0}")]
    Decode(String),

    #[error("Failed to sign order: {0}")]
    Signing(String),
}

impl OrderError {
    /// Whether the exchange saw and refused the order.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

pub type SubmitResult<T> = Result<T, OrderError>;
