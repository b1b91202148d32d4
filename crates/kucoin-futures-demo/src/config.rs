/*
[INPUT]:  Optional YAML configuration file, KUCOIN_* environment variables
[OUTPUT]: Validated demo configuration and exchange credentials
[POS]:    Configuration layer - session setup
[UPDATE]: When adding new configuration options
*/

use std::path::Path;
use std::time::Duration;

use ::config::{Config, Environment, File, FileFormat};
use kucoin_futures_adapter::{Credentials, FUTURES_BASE_URL};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Prefix of every environment variable read by [`DemoConfig::load`]
pub const ENV_PREFIX: &str = "KUCOIN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    /// One or more of key, secret, passphrase is absent or blank
    #[error("missing credentials: {}", .missing.join(", "))]
    MissingCredentials { missing: Vec<&'static str> },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to render configuration: {0}")]
    Render(#[from] serde_yaml::Error),
}

/// Settings for one demo session
#[derive(Clone, Deserialize, Serialize)]
pub struct DemoConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default)]
    pub api_passphrase: Option<String>,
    /// Contract symbol (e.g., "XBTUSDTM")
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_watch_duration_secs")]
    pub watch_duration_secs: u64,
    /// Settlement currencies queried for the balance summary
    #[serde(
        default = "default_balance_currencies",
        deserialize_with = "deserialize_currencies"
    )]
    pub balance_currencies: Vec<String>,
    #[serde(default = "default_rest_base_url")]
    pub rest_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Order book levels shown per side
    #[serde(default = "default_depth_limit")]
    pub depth_limit: usize,
}

impl std::fmt::Debug for DemoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("api_passphrase", &self.api_passphrase.as_ref().map(|_| "<redacted>"))
            .field("symbol", &self.symbol)
            .field("watch_duration_secs", &self.watch_duration_secs)
            .field("balance_currencies", &self.balance_currencies)
            .field("rest_base_url", &self.rest_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("depth_limit", &self.depth_limit)
            .finish()
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            api_passphrase: None,
            symbol: default_symbol(),
            watch_duration_secs: default_watch_duration_secs(),
            balance_currencies: default_balance_currencies(),
            rest_base_url: default_rest_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            depth_limit: default_depth_limit(),
        }
    }
}

fn default_symbol() -> String {
    "XBTUSDTM".to_string()
}

fn default_watch_duration_secs() -> u64 {
    60
}

fn default_balance_currencies() -> Vec<String> {
    vec!["USDT".to_string(), "XBT".to_string()]
}

/// Accepts a YAML list or a comma-separated string (`KUCOIN_BALANCE_CURRENCIES=USDT,XBT`)
fn deserialize_currencies<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Currencies {
        List(Vec<String>),
        Joined(String),
    }

    let currencies = match Currencies::deserialize(deserializer)? {
        Currencies::List(list) => list,
        Currencies::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(currencies
        .into_iter()
        .map(|currency| currency.trim().to_string())
        .filter(|currency| !currency.is_empty())
        .collect())
}

fn default_rest_base_url() -> String {
    FUTURES_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_depth_limit() -> usize {
    5
}

impl DemoConfig {
    /// Layer an optional YAML file under `KUCOIN_*` environment variables.
    ///
    /// Environment values stay strings; numeric fields are converted on
    /// deserialization so credentials reach the signer verbatim.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
        }

        let config: Self = builder
            .add_source(env)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("symbol must not be empty".into()));
        }
        if self.depth_limit == 0 {
            return Err(ConfigError::Invalid("depth_limit must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be at least 1".into()));
        }
        Ok(())
    }

    /// Credentials for signed requests. Blank values count as missing.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let fields = [
            ("api_key", &self.api_key),
            ("api_secret", &self.api_secret),
            ("api_passphrase", &self.api_passphrase),
        ];

        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(ConfigError::MissingCredentials { missing });
        }

        let value = |field: &Option<String>| field.as_deref().unwrap_or_default().trim().to_string();
        Ok(Credentials::new(
            value(&self.api_key),
            value(&self.api_secret),
            value(&self.api_passphrase),
        ))
    }

    pub fn watch_duration(&self) -> Duration {
        Duration::from_secs(self.watch_duration_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Effective configuration as YAML with secrets masked
    pub fn to_redacted_yaml(&self) -> Result<String, ConfigError> {
        let mut masked = self.clone();
        masked.api_secret = masked.api_secret.map(|_| "<redacted>".to_string());
        masked.api_passphrase = masked.api_passphrase.map(|_| "<redacted>".to_string());
        Ok(serde_yaml::to_string(&masked)?)
    }
}
