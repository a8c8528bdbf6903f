use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::time::Duration;

/// API credentials for the exchange. Secrets are held in memory only and are
/// never serialized or logged in cleartext.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub api_key: Secret<String>,
    pub secret_key: Secret<String>,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for ExchangeConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ExchangeConfig", 2)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("secret_key", "[REDACTED]")?;
        state.end()
    }
}

// Custom Deserialize implementation
impl<'de> Deserialize<'de> for ExchangeConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ExchangeConfigHelper {
            api_key: String,
            secret_key: String,
        }

        let helper = ExchangeConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            api_key: Secret::new(helper.api_key),
            secret_key: Secret::new(helper.secret_key),
        })
    }
}

impl ExchangeConfig {
    /// Create a new configuration with API credentials
    #[must_use]
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{EXCHANGE}_API_KEY` (e.g., `BINANCE_API_KEY`)
    /// - `{EXCHANGE}_SECRET_KEY` (e.g., `BINANCE_SECRET_KEY`)
    pub fn from_env(exchange_prefix: &str) -> Result<Self, ConfigError> {
        let api_key_var = format!("{}_API_KEY", exchange_prefix.to_uppercase());
        let secret_key_var = format!("{}_SECRET_KEY", exchange_prefix.to_uppercase());

        let api_key = env::var(&api_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(api_key_var))?;

        let secret_key = env::var(&secret_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(secret_key_var))?;

        Ok(Self::new(api_key, secret_key))
    }

    /// Create configuration from .env file and environment variables
    ///
    /// Loads environment variables from a .env file first (if it exists),
    /// then reads the configuration using the standard variable names.
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(exchange_prefix: &str) -> Result<Self, ConfigError> {
        match dotenv::dotenv() {
            Ok(_) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // No .env file; system environment variables still apply
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file: {}",
                    e
                )));
            }
        }

        Self::from_env(exchange_prefix)
    }

    /// Create configuration for public endpoints only (no private polling)
    #[must_use]
    pub fn read_only() -> Self {
        Self::new(String::new(), String::new())
    }

    /// Check if this configuration has credentials for private endpoints
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty() && !self.secret_key.expose_secret().is_empty()
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get secret key (use carefully - exposes secret)
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Request-weight budget for one credential. The exchange publishes these
/// limits and changes them occasionally; treat the defaults as a
/// conservative floor, not gospel.
#[derive(Debug, Clone)]
pub struct RateBudgetConfig {
    pub weight_limit: u32,
    pub window: Duration,
}

impl Default for RateBudgetConfig {
    fn default() -> Self {
        Self {
            weight_limit: 1200,
            window: Duration::from_secs(60),
        }
    }
}

/// Static per-endpoint request weights, from the exchange's published
/// limits. Configurable because the exchange revises them.
#[derive(Debug, Clone)]
pub struct EndpointWeights {
    /// `/api/v3/ticker/24hr`, single symbol
    pub spot_ticker_24h: u32,
    /// `/api/v3/ticker/price`, single symbol
    pub spot_ticker_price: u32,
    /// `/fapi/v1/ticker/24hr`, single symbol
    pub futures_ticker_24h: u32,
    /// `/sapi/v1/asset/wallet/balance`
    pub wallet_balance: u32,
}

impl Default for EndpointWeights {
    fn default() -> Self {
        Self {
            spot_ticker_24h: 2,
            spot_ticker_price: 2,
            futures_ticker_24h: 1,
            wallet_balance: 60,
        }
    }
}

/// Retry/backoff policy for transient failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry; doubles per attempt
    pub base_delay: Duration,
    /// Backoff cap
    pub max_delay: Duration,
    /// Total attempts including the initial one
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_attempts: 4,
        }
    }
}

/// Tunables for the synchronization coordinator
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub spot_base_url: String,
    pub futures_base_url: String,
    /// Bound on every network call; exceeding it classifies as transient
    pub request_timeout: Duration,
    /// Signed-request freshness window, in milliseconds
    pub recv_window_ms: u64,
    pub budget: RateBudgetConfig,
    pub weights: EndpointWeights,
    pub retry: RetryPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            spot_base_url: "https://api.binance.com".to_string(),
            futures_base_url: "https://fapi.binance.com".to_string(),
            request_timeout: Duration::from_secs(30),
            recv_window_ms: 10_000,
            budget: RateBudgetConfig::default(),
            weights: EndpointWeights::default(),
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_config_has_no_credentials() {
        assert!(!ExchangeConfig::read_only().has_credentials());
        assert!(ExchangeConfig::new("k".to_string(), "s".to_string()).has_credentials());
    }

    #[test]
    fn serialization_redacts_secrets() {
        let config = ExchangeConfig::new("key-material".to_string(), "hunter2".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("key-material"));
        assert!(!json.contains("hunter2"));
        assert!(json.contains("[REDACTED]"));
    }
}
