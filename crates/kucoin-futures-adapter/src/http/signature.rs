/*
[INPUT]:  API credentials and request parts (timestamp, method, path, body)
[OUTPUT]: Signed request headers (KC-API-SIGN, KC-API-PASSPHRASE, ...)
[POS]:    HTTP layer - request signing for authenticated endpoints
[UPDATE]: When changing signing algorithm or header format
*/

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use reqwest::RequestBuilder;
use sha2::Sha256;

use super::client::Credentials;

type HmacSha256 = Hmac<Sha256>;

/// Key version 2 means the passphrase header is itself HMAC-signed
pub const API_KEY_VERSION: &str = "2";

/// Signs HTTP requests for authenticated endpoints
#[derive(Debug, Clone)]
pub struct RequestSigner {
    credentials: Credentials,
}

/// Header values for one signed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub api_key: String,
    pub sign: String,
    pub timestamp: String,
    pub passphrase: String,
    pub key_version: &'static str,
}

impl RequestSigner {
    /// Create a new request signer for the given credentials
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    pub fn api_key(&self) -> &str {
        &self.credentials.api_key
    }

    /// Sign a request with the KuCoin HMAC-SHA256 scheme
    ///
    /// Format: "{timestamp}{METHOD}{request_path}{body}"
    /// Returns base64-encoded HMAC-SHA256
    pub fn sign_request(&self, timestamp: u64, method: &str, request_path: &str, body: &str) -> String {
        let message = format!("{timestamp}{}{request_path}{body}", method.to_ascii_uppercase());
        self.hmac_base64(message.as_bytes())
    }

    /// Passphrase signed with the API secret (key version 2)
    pub fn signed_passphrase(&self) -> String {
        self.hmac_base64(self.credentials.passphrase.as_bytes())
    }

    /// Build the full header set for a request
    pub fn headers(&self, timestamp: u64, method: &str, request_path: &str, body: &str) -> SignedHeaders {
        SignedHeaders {
            api_key: self.credentials.api_key.clone(),
            sign: self.sign_request(timestamp, method, request_path, body),
            timestamp: timestamp.to_string(),
            passphrase: self.signed_passphrase(),
            key_version: API_KEY_VERSION,
        }
    }

    fn hmac_base64(&self, message: &[u8]) -> String {
        let mut mac = match HmacSha256::new_from_slice(self.credentials.api_secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC accepts keys of any length"),
        };
        mac.update(message);
        BASE64.encode(mac.finalize().into_bytes())
    }
}

impl SignedHeaders {
    /// Attach the headers to a request builder
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("KC-API-KEY", &self.api_key)
            .header("KC-API-SIGN", &self.sign)
            .header("KC-API-TIMESTAMP", &self.timestamp)
            .header("KC-API-PASSPHRASE", &self.passphrase)
            .header("KC-API-KEY-VERSION", self.key_version)
    }
}
