//! API credentials and request signing.
//!
//! Signed endpoints take a form-encoded payload ending in
//! `recvWindow={ms}&timestamp={ms}` and an HMAC-SHA256 hex `signature` over
//! that exact payload, keyed by the API secret.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::info;
use zeroize::Zeroizing;

use crate::error::OrderError;

type HmacSha256 = Hmac<Sha256>;

/// Default `recvWindow` in milliseconds.
pub const DEFAULT_RECV_WINDOW_MS: u64 = 5_000;

// =============================================================================
// KeySource and ApiCredentials
// =============================================================================

/// Source of one credential value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Load from environment variable (development, `.env`).
    EnvVar { var_name: String },
    /// Load from file (production, recommend 0600 permissions).
    File { path: PathBuf },
}

impl KeySource {
    pub fn env(var_name: impl Into<String>) -> Self {
        Self::EnvVar {
            var_name: var_name.into(),
        }
    }

    fn read(&self) -> Result<Zeroizing<String>, KeyError> {
        let raw = match self {
            Self::EnvVar { var_name } => Zeroizing::new(
                std::env::var(var_name).map_err(|_| KeyError::EnvVarNotFound(var_name.clone()))?,
            ),
            Self::File { path } => Zeroizing::new(std::fs::read_to_string(path)?),
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(KeyError::Empty(self.describe()));
        }
        Ok(Zeroizing::new(trimmed.to_string()))
    }

    fn describe(&self) -> String {
        match self {
            Self::EnvVar { var_name } => format!("env:{var_name}"),
            Self::File { path } => format!("file:{}", path.display()),
        }
    }
}

/// API key and secret for signed endpoints.
///
/// Loaded once at startup. The secret lives in a zeroizing buffer and is
/// never logged; `Debug` redacts both values.
pub struct ApiCredentials {
    api_key: Zeroizing<String>,
    secret: Zeroizing<String>,
}

impl ApiCredentials {
    /// Load the API key and secret from their sources.
    ///
    /// # Errors
    /// Returns `KeyError` if a variable is unset, a file cannot be read, or a
    /// value is empty.
    pub fn load(api_key: &KeySource, secret: &KeySource) -> Result<Self, KeyError> {
        let creds = Self {
            api_key: api_key.read()?,
            secret: secret.read()?,
        };
        info!(
            api_key_source = %api_key.describe(),
            secret_source = %secret.describe(),
            "Loaded API credentials"
        );
        Ok(creds)
    }

    pub fn new(api_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            api_key: Zeroizing::new(api_key.into()),
            secret: Zeroizing::new(secret.into()),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Credential loading errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Credential is empty: {0}")]
    Empty(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// RequestSigner
// =============================================================================

/// Signs request payloads and stamps them with exchange-aligned timestamps.
#[derive(Debug)]
pub struct RequestSigner {
    credentials: ApiCredentials,
    recv_window_ms: u64,
    /// server_time - local_time, in milliseconds.
    time_offset_ms: AtomicI64,
}

impl RequestSigner {
    pub fn new(credentials: ApiCredentials, recv_window_ms: u64) -> Self {
        Self {
            credentials,
            recv_window_ms,
            time_offset_ms: AtomicI64::new(0),
        }
    }

    pub fn api_key(&self) -> &str {
        self.credentials.api_key()
    }

    /// Align request timestamps with the exchange clock.
    pub fn sync_server_time(&self, server_time_ms: i64) {
        let offset = server_time_ms - chrono::Utc::now().timestamp_millis();
        self.time_offset_ms.store(offset, Ordering::Relaxed);
        info!(offset_ms = offset, "Synchronized with exchange server time");
    }

    pub fn time_offset_ms(&self) -> i64 {
        self.time_offset_ms.load(Ordering::Relaxed)
    }

    /// Current timestamp in exchange time.
    pub fn timestamp_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis() + self.time_offset_ms()
    }

    /// HMAC-SHA256 of `payload`, hex encoded.
    pub fn sign(&self, payload: &str) -> Result<String, OrderError> {
        let mut mac = HmacSha256::new_from_slice(self.credentials.secret.as_bytes())
            .map_err(|e| OrderError::Signing(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Encode `params`, append `recvWindow` and `timestamp`, then the signature.
    pub fn signed_payload(&self, params: &[(&str, String)]) -> Result<String, OrderError> {
        self.signed_payload_at(params, self.timestamp_ms())
    }

    fn signed_payload_at(
        &self,
        params: &[(&str, String)],
        timestamp_ms: i64,
    ) -> Result<String, OrderError> {
        let mut fields: Vec<(&str, String)> = params.to_vec();
        fields.push(("recvWindow", self.recv_window_ms.to_string()));
        fields.push(("timestamp", timestamp_ms.to_string()));

        let payload = serde_urlencoded::to_string(&fields)
            .map_err(|e| OrderError::Signing(format!("payload encoding: {e}")))?;
        let signature = self.sign(&payload)?;
        Ok(format!("{payload}&signature={signature}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // Published exchange documentation example (not a real key).
    const DOC_API_KEY: &str = "vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A";
    const DOC_SECRET: &str = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";

    fn doc_signer() -> RequestSigner {
        RequestSigner::new(ApiCredentials::new(DOC_API_KEY, DOC_SECRET), 5000)
    }

    #[test]
    fn test_sign_matches_documented_vector() {
        let payload = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            doc_signer().sign(payload).unwrap(),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_signed_payload_layout() {
        let signer = doc_signer();
        let params = [
            ("symbol", "LTCBTC".to_string()),
            ("side", "BUY".to_string()),
            ("type", "LIMIT".to_string()),
            ("timeInForce", "GTC".to_string()),
            ("quantity", "1".to_string()),
            ("price", "0.1".to_string()),
        ];
        let body = signer.signed_payload_at(&params, 1499827319559).unwrap();
        assert_eq!(
            body,
            "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1\
             &recvWindow=5000&timestamp=1499827319559\
             &signature=c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_server_time_offset_applied() {
        let signer = doc_signer();
        let ahead = chrono::Utc::now().timestamp_millis() + 60_000;
        signer.sync_server_time(ahead);
        let offset = signer.time_offset_ms();
        assert!((59_000..=60_000).contains(&offset), "offset {offset}");
        assert!(signer.timestamp_ms() >= ahead - 1_000);
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let creds = ApiCredentials::new("my-key", "my-secret");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("my-key"));
        assert!(!debug.contains("my-secret"));
    }

    #[test]
    fn test_load_from_file_trims() {
        let mut key = tempfile::NamedTempFile::new().unwrap();
        writeln!(key, "  file-key  ").unwrap();
        let mut secret = tempfile::NamedTempFile::new().unwrap();
        writeln!(secret, "file-secret").unwrap();

        let creds = ApiCredentials::load(
            &KeySource::File {
                path: key.path().to_path_buf(),
            },
            &KeySource::File {
                path: secret.path().to_path_buf(),
            },
        )
        .unwrap();
        assert_eq!(creds.api_key(), "file-key");
    }

    #[test]
    fn test_load_missing_env_var() {
        let err = ApiCredentials::load(
            &KeySource::env("STOPLIMIT_TEST_UNSET_KEY_VAR"),
            &KeySource::env("STOPLIMIT_TEST_UNSET_SECRET_VAR"),
        )
        .unwrap_err();
        assert!(matches!(err, KeyError::EnvVarNotFound(v) if v == "STOPLIMIT_TEST_UNSET_KEY_VAR"));
    }

    #[test]
    fn test_load_empty_file() {
        let empty = tempfile::NamedTempFile::new().unwrap();
        let source = KeySource::File {
            path: empty.path().to_path_buf(),
        };
        let err = ApiCredentials::load(&source, &source).unwrap_err();
        assert!(matches!(err, KeyError::Empty(_)));
    }
}
