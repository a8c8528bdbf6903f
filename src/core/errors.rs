use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed response body: {0}")]
    Malformed(String),

    #[error("API error: {code} - {message}")]
    Api { code: u16, message: String },

    #[error("rate limited by exchange{}", retry_after.map_or_else(String::new, |d| format!(", retry after {}s", d.as_secs())))]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("configuration error: {0}")]
    Config(#[from] crate::core::config::ConfigError),

    #[error("other error: {0}")]
    Other(String),
}

/// Sub-reason attached to a permanent failure. Drives the disable policy:
/// `UnknownSymbol` disables one instrument, `AuthRejected` disables every
/// private cycle until credentials are replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalReason {
    UnknownSymbol,
    AuthRejected,
    Other(String),
}

impl fmt::Display for FatalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSymbol => write!(f, "unknown symbol"),
            Self::AuthRejected => write!(f, "authentication rejected"),
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

/// How the resilience layer should treat an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Retriable with backoff; never surfaces past the retry policy except
    /// as stale data
    Transient,
    /// Retrying cannot succeed until something outside the poll cycle changes
    Fatal(FatalReason),
}

impl ExchangeError {
    /// Single source of truth for failure classification.
    ///
    /// Transport errors, 5xx, rate limiting and malformed bodies are
    /// transient; auth rejections, unknown symbols and the remaining 4xx are
    /// fatal. `InvalidCredential` is raised before any network call and is
    /// treated like an auth rejection.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Http(_) | Self::Json(_) | Self::Malformed(_) | Self::RateLimited { .. } => {
                FailureKind::Transient
            }
            Self::Api { code, .. } if *code >= 500 => FailureKind::Transient,
            Self::Api { code, message } => FailureKind::Fatal(FatalReason::Other(format!(
                "HTTP {code}: {message}"
            ))),
            Self::AuthRejected(_) | Self::InvalidCredential(_) => {
                FailureKind::Fatal(FatalReason::AuthRejected)
            }
            Self::UnknownSymbol(_) => FailureKind::Fatal(FatalReason::UnknownSymbol),
            Self::Config(err) => FailureKind::Fatal(FatalReason::Other(err.to_string())),
            Self::Other(message) => FailureKind::Fatal(FatalReason::Other(message.clone())),
        }
    }

    /// Exchange-supplied backoff hint, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = ExchangeError::Api {
            code: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.failure_kind(), FailureKind::Transient);
    }

    #[test]
    fn client_errors_are_fatal() {
        let err = ExchangeError::Api {
            code: 400,
            message: "bad request".to_string(),
        };
        assert!(matches!(
            err.failure_kind(),
            FailureKind::Fatal(FatalReason::Other(_))
        ));
    }

    #[test]
    fn rate_limiting_is_transient_with_hint() {
        let err = ExchangeError::RateLimited {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(err.failure_kind(), FailureKind::Transient);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn auth_rejection_classifies_as_auth_fatal() {
        let err = ExchangeError::AuthRejected("invalid api key".to_string());
        assert_eq!(
            err.failure_kind(),
            FailureKind::Fatal(FatalReason::AuthRejected)
        );
    }

    #[test]
    fn unknown_symbol_classifies_per_instrument() {
        let err = ExchangeError::UnknownSymbol("NOPEUSDT".to_string());
        assert_eq!(
            err.failure_kind(),
            FailureKind::Fatal(FatalReason::UnknownSymbol)
        );
    }
}
