/*
[INPUT]:  HTTP configuration (base URL, timeouts, credentials)
[OUTPUT]: Configured reqwest client ready for API calls
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use std::fmt;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::{KucoinError, Result, SUCCESS_CODE};
use super::signature::RequestSigner;

/// Base URL for the KuCoin Futures REST API
pub const FUTURES_BASE_URL: &str = "https://api-futures.kucoin.com";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Credentials for authenticated requests
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
}

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            passphrase: passphrase.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Response envelope wrapping every REST payload
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: String,
    data: Option<T>,
    #[serde(default)]
    msg: Option<String>,
}

/// Main HTTP client for the KuCoin Futures API
#[derive(Debug)]
pub struct KucoinFuturesClient {
    http_client: Option<Client>,
    base_url: Url,
    signer: Option<RequestSigner>,
}

impl KucoinFuturesClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Self::with_config_and_base_url(config, FUTURES_BASE_URL)
    }

    /// Create a new client against an explicit base URL (sandbox, mock server)
    pub fn with_config_and_base_url(config: ClientConfig, base_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client: Some(http_client),
            base_url: Url::parse(base_url)?,
            signer: None,
        })
    }

    /// Set credentials for authenticated requests
    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.signer = Some(RequestSigner::new(credentials));
    }

    /// Builder-style variant of [`set_credentials`](Self::set_credentials)
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.set_credentials(credentials);
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.signer.is_some()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn is_closed(&self) -> bool {
        self.http_client.is_none()
    }

    /// Release the connection pool. Later requests fail with [`KucoinError::Closed`].
    pub fn close(&mut self) {
        if self.http_client.take().is_some() {
            debug!(base_url = %self.base_url, "rest client closed");
        }
    }

    fn http(&self) -> Result<&Client> {
        self.http_client.as_ref().ok_or(KucoinError::Closed)
    }

    /// Build request builder for a public endpoint
    pub(crate) fn public_request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(endpoint)?;
        Ok(self.http()?.request(method, url))
    }

    /// Build request builder for a private endpoint with signed headers.
    ///
    /// `endpoint` must include the query string, it is part of the signed payload.
    pub(crate) fn signed_request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<RequestBuilder> {
        let signer = self.signer.as_ref().ok_or(KucoinError::MissingCredentials)?;
        let body_text = body.map(|value| value.to_string()).unwrap_or_default();
        let timestamp = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
        let headers = signer.headers(timestamp, method.as_str(), endpoint, &body_text);

        let url = self.base_url.join(endpoint)?;
        let mut builder = headers.apply(self.http()?.request(method, url));
        if body.is_some() {
            builder = builder
                .header("Content-Type", "application/json")
                .body(body_text);
        }
        Ok(builder)
    }

    /// Send a request and unwrap the `{code, data, msg}` envelope
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(KucoinError::api_error(status, text));
            }
            return Err(match serde_json::from_str::<Envelope<serde_json::Value>>(&text) {
                Ok(envelope) => KucoinError::envelope_error(&envelope.code, envelope.msg),
                Err(_) => KucoinError::api_error(status, text),
            });
        }

        decode_envelope(&text)
    }
}

fn decode_envelope<T: DeserializeOwned>(text: &str) -> Result<T> {
    let envelope: Envelope<T> = serde_json::from_str(text)?;
    if envelope.code != SUCCESS_CODE {
        return Err(KucoinError::envelope_error(&envelope.code, envelope.msg));
    }
    envelope
        .data
        .ok_or_else(|| KucoinError::InvalidResponse("response envelope has no data".into()))
}
