use crate::core::config::EndpointWeights;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{RateBudget, RestClient};
use crate::exchanges::binance::types::{
    BinanceTicker24h, BinanceTickerPrice, BinanceWalletBalance,
};
use std::sync::Arc;

/// Thin typed wrapper around the transport for the endpoints the
/// coordinator polls. Every call reserves its published weight against the
/// shared budget before dispatching, and feeds exchange-reported throttling
/// back into the budget.
pub struct BinanceRestClient<R: RestClient> {
    spot: R,
    futures: R,
    budget: Arc<RateBudget>,
    weights: EndpointWeights,
}

impl<R: RestClient> BinanceRestClient<R> {
    pub fn new(spot: R, futures: R, budget: Arc<RateBudget>, weights: EndpointWeights) -> Self {
        Self {
            spot,
            futures,
            budget,
            weights,
        }
    }

    pub fn budget(&self) -> &Arc<RateBudget> {
        &self.budget
    }

    fn note_rate_limit<T>(&self, result: &Result<T, ExchangeError>) {
        if let Err(err @ ExchangeError::RateLimited { .. }) = result {
            self.budget.penalize(err.retry_after());
        }
    }

    /// Spot 24h ticker statistics for one symbol
    pub async fn spot_ticker_24h(&self, symbol: &str) -> Result<BinanceTicker24h, ExchangeError> {
        self.budget.acquire(self.weights.spot_ticker_24h).await;
        let result = self
            .spot
            .get_json("/api/v3/ticker/24hr", &[("symbol", symbol)], false)
            .await;
        self.note_rate_limit(&result);
        result
    }

    /// Futures 24h ticker statistics for one symbol
    pub async fn futures_ticker_24h(
        &self,
        symbol: &str,
    ) -> Result<BinanceTicker24h, ExchangeError> {
        self.budget.acquire(self.weights.futures_ticker_24h).await;
        let result = self
            .futures
            .get_json("/fapi/v1/ticker/24hr", &[("symbol", symbol)], false)
            .await;
        self.note_rate_limit(&result);
        result
    }

    /// Spot reference price for one symbol
    pub async fn spot_ticker_price(
        &self,
        symbol: &str,
    ) -> Result<BinanceTickerPrice, ExchangeError> {
        self.budget.acquire(self.weights.spot_ticker_price).await;
        let result = self
            .spot
            .get_json("/api/v3/ticker/price", &[("symbol", symbol)], false)
            .await;
        self.note_rate_limit(&result);
        result
    }

    /// Per-wallet balances for the credential's account. Signed; requires
    /// the "Permits Universal Transfer" account permission.
    pub async fn wallet_balances(&self) -> Result<Vec<BinanceWalletBalance>, ExchangeError> {
        self.budget.acquire(self.weights.wallet_balance).await;
        let result = self
            .spot
            .get_json("/sapi/v1/asset/wallet/balance", &[], true)
            .await;
        self.note_rate_limit(&result);
        result
    }
}
