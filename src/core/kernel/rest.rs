use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::{NoopSigner, Signer};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{instrument, trace};

/// Read-only REST transport.
///
/// The coordinator never mutates exchange state, so the surface is GET-only.
/// Implementations classify transport and HTTP outcomes into the
/// [`ExchangeError`] taxonomy, which is the single source of truth the
/// resilience layer acts on.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Make a GET request with a strongly-typed response
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `query_params` - Query parameters as key-value pairs
    /// * `authenticated` - Whether to sign the request
    async fn get_json<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<T, ExchangeError>;
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    /// Request timeout; exceeding it classifies as transient
    pub timeout: Duration,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl RestClientConfig {
    pub fn new(base_url: String, exchange_name: String) -> Self {
        Self {
            base_url,
            exchange_name,
            timeout: Duration::from_secs(30),
            user_agent: "binance-sync/0.1".to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self {
            config,
            signer: None,
        }
    }

    /// Set the signer for authenticated requests
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn build(self) -> Result<ReqwestRest, ExchangeError> {
        let client = Client::builder()
            .timeout(self.config.timeout)
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| ExchangeError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(ReqwestRest {
            client,
            config: self.config,
            signer: Arc::new(RwLock::new(
                self.signer.unwrap_or_else(|| Arc::new(NoopSigner)),
            )),
        })
    }
}

/// Implementation of [`RestClient`] using reqwest. Clones share the signer,
/// so a credential rotation is visible to every clone.
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
    signer: Arc<RwLock<Arc<dyn Signer>>>,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    /// Replace the signer used for authenticated requests
    pub fn swap_signer(&self, signer: Arc<dyn Signer>) {
        *self.signer.write().expect("signer lock poisoned") = signer;
    }

    fn get_timestamp() -> Result<u64, ExchangeError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .map_err(|e| ExchangeError::Other(format!("failed to get timestamp: {e}")))
    }

    fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url, endpoint)
    }

    fn create_query_string(params: &[(&str, &str)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Classify the response and extract JSON
    #[instrument(skip(self, response), fields(exchange = %self.config.exchange_name, status = %response.status()))]
    async fn handle_response(&self, response: Response) -> Result<Value, ExchangeError> {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = response.text().await.map_err(ExchangeError::Http)?;
        trace!("response body: {}", body);

        if status.is_success() {
            return serde_json::from_str(&body)
                .map_err(|e| ExchangeError::Malformed(format!("invalid JSON response: {e}")));
        }

        // 418 is the exchange's repeated-offender IP ban, handled like 429
        if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
            return Err(ExchangeError::RateLimited { retry_after });
        }

        // Error bodies look like {"code": -1121, "msg": "Invalid symbol."}
        let (api_code, message) = match serde_json::from_str::<Value>(&body) {
            Ok(value) => (
                value.get("code").and_then(Value::as_i64),
                value
                    .get("msg")
                    .and_then(Value::as_str)
                    .unwrap_or(&body)
                    .to_string(),
            ),
            Err(_) => (None, body.clone()),
        };

        match api_code {
            Some(-1121) => return Err(ExchangeError::UnknownSymbol(message)),
            Some(-2014 | -2015 | -1022) => return Err(ExchangeError::AuthRejected(message)),
            _ => {}
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ExchangeError::AuthRejected(message));
        }

        Err(ExchangeError::Api {
            code: status.as_u16(),
            message,
        })
    }

    #[instrument(skip(self, query_params), fields(exchange = %self.config.exchange_name, endpoint = %endpoint))]
    async fn make_request(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Value, ExchangeError> {
        let url = self.build_url(endpoint);
        let mut request = self.client.get(&url);

        if authenticated {
            let signer = Arc::clone(&self.signer.read().expect("signer lock poisoned"));
            let query_string = Self::create_query_string(query_params);
            let timestamp = Self::get_timestamp()?;
            let signed = signer.sign_request(&query_string, timestamp)?;

            for (key, value) in &signed.headers {
                request = request.header(key, value);
            }
            for (key, value) in &signed.params {
                request = request.query(&[(key, value)]);
            }
        } else {
            for (key, value) in query_params {
                request = request.query(&[(key, value)]);
            }
        }

        let response = request.send().await.map_err(ExchangeError::Http)?;
        self.handle_response(response).await
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    #[instrument(skip(self, query_params), fields(exchange = %self.config.exchange_name, endpoint = %endpoint, param_count = query_params.len()))]
    async fn get_json<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<T, ExchangeError> {
        self.make_request(endpoint, query_params, authenticated)
            .await
            .and_then(|value| {
                serde_json::from_value(value).map_err(|e| {
                    ExchangeError::Malformed(format!("failed to deserialize JSON: {e}"))
                })
            })
    }
}
