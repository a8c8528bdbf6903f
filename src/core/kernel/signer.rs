use crate::core::errors::ExchangeError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

/// Output of signing one request: query parameters to send (including the
/// signature) and headers to attach.
#[derive(Debug, Clone, Default)]
pub struct SignedQuery {
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

/// Signer for authenticated requests.
///
/// Implementations are pure: given identical inputs they produce identical
/// output, and they never perform network I/O. The timestamp is passed in
/// rather than read from the clock so signing stays deterministic under test.
pub trait Signer: Send + Sync {
    /// Sign a request's canonical query string at the given timestamp
    fn sign_request(&self, query_string: &str, timestamp_ms: u64)
        -> Result<SignedQuery, ExchangeError>;
}

/// HMAC-SHA256 signer for Binance-style signed endpoints.
///
/// Appends `timestamp` and `recvWindow` to the query, computes the MAC over
/// the full canonical query with the API secret, and attaches the hex
/// signature as the final `signature` parameter plus the API key as the
/// `X-MBX-APIKEY` header.
pub struct BinanceHmacSigner {
    api_key: String,
    secret_key: String,
    recv_window_ms: u64,
}

impl fmt::Debug for BinanceHmacSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinanceHmacSigner")
            .field("recv_window_ms", &self.recv_window_ms)
            .finish_non_exhaustive()
    }
}

impl BinanceHmacSigner {
    pub fn new(
        api_key: String,
        secret_key: String,
        recv_window_ms: u64,
    ) -> Result<Self, ExchangeError> {
        if secret_key.is_empty() {
            return Err(ExchangeError::InvalidCredential(
                "empty API secret".to_string(),
            ));
        }
        if api_key.is_empty() {
            return Err(ExchangeError::InvalidCredential(
                "empty API key".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            secret_key,
            recv_window_ms,
        })
    }

    /// Raw HMAC-SHA256 over a canonical payload, hex-encoded
    pub fn signature_for(&self, payload: &str) -> Result<String, ExchangeError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| ExchangeError::InvalidCredential(format!("invalid secret key: {e}")))?;

        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl Signer for BinanceHmacSigner {
    fn sign_request(
        &self,
        query_string: &str,
        timestamp_ms: u64,
    ) -> Result<SignedQuery, ExchangeError> {
        let canonical = if query_string.is_empty() {
            format!("timestamp={}&recvWindow={}", timestamp_ms, self.recv_window_ms)
        } else {
            format!(
                "{}&timestamp={}&recvWindow={}",
                query_string, timestamp_ms, self.recv_window_ms
            )
        };

        let signature = self.signature_for(&canonical)?;

        let mut params: Vec<(String, String)> = canonical
            .split('&')
            .filter_map(|param| {
                param
                    .split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
            })
            .collect();
        params.push(("signature".to_string(), signature));

        Ok(SignedQuery {
            params,
            headers: vec![("X-MBX-APIKEY".to_string(), self.api_key.clone())],
        })
    }
}

/// Pass-through signer for public-only clients
pub struct NoopSigner;

impl Signer for NoopSigner {
    fn sign_request(
        &self,
        query_string: &str,
        _timestamp_ms: u64,
    ) -> Result<SignedQuery, ExchangeError> {
        let params = if query_string.is_empty() {
            Vec::new()
        } else {
            query_string
                .split('&')
                .filter_map(|param| {
                    param
                        .split_once('=')
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                })
                .collect()
        };

        Ok(SignedQuery {
            params,
            headers: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Official example from the Binance signed-endpoint documentation
    const DOC_SECRET: &str = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
    const DOC_PAYLOAD: &str = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
    const DOC_SIGNATURE: &str = "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71";

    #[test]
    fn signature_matches_published_vector() {
        let signer =
            BinanceHmacSigner::new("key".to_string(), DOC_SECRET.to_string(), 5000).unwrap();
        assert_eq!(signer.signature_for(DOC_PAYLOAD).unwrap(), DOC_SIGNATURE);
    }

    #[test]
    fn signing_is_deterministic() {
        let signer =
            BinanceHmacSigner::new("key".to_string(), "secret".to_string(), 10_000).unwrap();
        let a = signer.sign_request("symbol=BTCUSDT", 1_700_000_000_000).unwrap();
        let b = signer.sign_request("symbol=BTCUSDT", 1_700_000_000_000).unwrap();
        assert_eq!(a.params, b.params);
        assert_eq!(a.headers, b.headers);
    }

    #[test]
    fn signed_query_carries_timestamp_window_and_signature() {
        let signer =
            BinanceHmacSigner::new("api-key".to_string(), "secret".to_string(), 10_000).unwrap();
        let signed = signer.sign_request("symbol=BTCUSDT", 1_700_000_000_000).unwrap();

        let keys: Vec<&str> = signed.params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["symbol", "timestamp", "recvWindow", "signature"]);
        assert_eq!(
            signed.headers,
            vec![("X-MBX-APIKEY".to_string(), "api-key".to_string())]
        );
    }

    #[test]
    fn debug_output_redacts_the_credentials() {
        let signer =
            BinanceHmacSigner::new("key-material".to_string(), "hunter2".to_string(), 5000)
                .unwrap();
        let rendered = format!("{signer:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("key-material"));
    }

    #[test]
    fn empty_secret_is_rejected_before_any_io() {
        let err = BinanceHmacSigner::new("key".to_string(), String::new(), 5000).unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidCredential(_)));
    }
}
