/*
[INPUT]:  Error sources (HTTP, API envelope, serialization, signing, WebSocket)
[OUTPUT]: Structured error types with context and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the KuCoin Futures adapter
#[derive(Error, Debug)]
pub enum KucoinError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response (HTTP status or envelope code)
    #[error("API error (code {code}): {message}")]
    Api { code: i64, message: String },

    /// Request requires credentials but none are set
    #[error("Missing credentials for authenticated endpoint")]
    MissingCredentials,

    /// Authentication failed (bad key, signature or passphrase)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after}s")]
    RateLimit { retry_after: u64 },

    /// Connection timeout
    #[error("Connection timeout after {duration}s")]
    Timeout { duration: u64 },

    /// Client was closed and can no longer issue requests
    #[error("Client is closed")]
    Closed,
}

/// Envelope code KuCoin returns on success
pub const SUCCESS_CODE: &str = "200000";

impl KucoinError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            KucoinError::Http(_)
                | KucoinError::RateLimit { .. }
                | KucoinError::Timeout { .. }
                | KucoinError::WebSocket(_)
                | KucoinError::InvalidResponse(_)
        )
    }

    /// Get retry delay in seconds (if retryable)
    pub fn retry_delay(&self) -> Option<u64> {
        match self {
            KucoinError::RateLimit { retry_after } => Some(*retry_after),
            KucoinError::Timeout { .. } => Some(1),
            _ => None,
        }
    }

    /// Check if error indicates authentication failure
    pub fn is_auth_error(&self) -> bool {
        match self {
            KucoinError::Authentication { .. } | KucoinError::MissingCredentials => true,
            // 400001..400005 are the key/signature/passphrase/timestamp rejections
            KucoinError::Api { code, .. } => (400_001..=400_005).contains(code) || *code == 401,
            _ => false,
        }
    }

    /// Create an API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return KucoinError::RateLimit { retry_after: 10 };
        }
        KucoinError::Api {
            code: i64::from(status.as_u16()),
            message: message.into(),
        }
    }

    /// Create an API error from a non-success envelope code
    pub fn envelope_error(code: &str, message: Option<String>) -> Self {
        let parsed = code.parse::<i64>().unwrap_or(-1);
        if parsed == 429_000 {
            return KucoinError::RateLimit { retry_after: 10 };
        }
        KucoinError::Api {
            code: parsed,
            message: message.unwrap_or_else(|| format!("unexpected response code {code}")),
        }
    }
}

/// Result type alias for KuCoin operations
pub type Result<T> = std::result::Result<T, KucoinError>;
