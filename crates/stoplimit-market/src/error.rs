//! Market data error types.

use serde::Deserialize;
use thiserror::Error;

/// Exchange error code for an unknown symbol.
pub const ERR_CODE_INVALID_SYMBOL: i64 = -1121;

/// Error payload returned by the exchange on non-2xx responses.
///
/// Example: `{"code": -1121, "msg": "Invalid symbol."}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}

impl ApiErrorBody {
    /// Best-effort parse; falls back to the raw body as the message.
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_else(|_| Self {
            code: 0,
            msg: body.to_string(),
        })
    }
}

#[derive(Debug, Clone, Error)]
pub enum MarketDataError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Exchange API error: HTTP {status}, code {code}: {msg}")]
    Api { status: u16, code: i64, msg: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Symbol not listed on exchange: {0}")]
    SymbolNotFound(String),
}

impl MarketDataError {
    pub(crate) fn from_api(status: u16, body: &str) -> Self {
        let parsed = ApiErrorBody::from_body(body);
        Self::Api {
            status,
            code: parsed.code,
            msg: parsed.msg,
        }
    }
}

pub type MarketDataResult<T> = Result<T, MarketDataError>;
