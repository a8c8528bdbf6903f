pub mod converters;
pub mod rest;
pub mod types;

use crate::core::config::{ExchangeConfig, SyncOptions};
use crate::core::errors::ExchangeError;
use crate::core::kernel::{
    BinanceHmacSigner, RateBudget, ReqwestRest, RestClientBuilder, RestClientConfig, Signer,
};
use crate::core::traits::InstrumentSource;
use crate::core::types::{InstrumentKind, Snapshot, TrackedInstrument};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

// Re-export main types for easier importing
pub use rest::BinanceRestClient;
pub use types::{BinanceTicker24h, BinanceTickerPrice, BinanceWalletBalance};

/// Symbol used to convert BTC-denominated wallet totals to USDT
const REFERENCE_PRICE_SYMBOL: &str = "BTCUSDT";

/// Exchange-facing implementation of [`InstrumentSource`], wiring the typed
/// client to the instrument kinds the coordinator tracks.
pub struct BinanceSource {
    client: BinanceRestClient<ReqwestRest>,
    /// Shares its signer with the client's spot transport, so a credential
    /// rotation takes effect on in-flight clones too
    spot_rest: ReqwestRest,
    recv_window_ms: u64,
}

/// Build a [`BinanceSource`] from credentials and tunables. With empty
/// credentials only public endpoints work; wallet polls will come back as
/// auth rejections from the exchange.
pub fn create_binance_source(
    credentials: &ExchangeConfig,
    options: &SyncOptions,
) -> Result<BinanceSource, ExchangeError> {
    let spot_config =
        RestClientConfig::new(options.spot_base_url.clone(), "binance".to_string())
            .with_timeout(options.request_timeout);
    let futures_config =
        RestClientConfig::new(options.futures_base_url.clone(), "binance-futures".to_string())
            .with_timeout(options.request_timeout);

    let mut spot_builder = RestClientBuilder::new(spot_config);
    if credentials.has_credentials() {
        let signer: Arc<dyn Signer> = Arc::new(BinanceHmacSigner::new(
            credentials.api_key().to_string(),
            credentials.secret_key().to_string(),
            options.recv_window_ms,
        )?);
        spot_builder = spot_builder.with_signer(signer);
    }

    let spot = spot_builder.build()?;
    let futures = RestClientBuilder::new(futures_config).build()?;
    let budget = Arc::new(RateBudget::new(&options.budget));

    Ok(BinanceSource {
        spot_rest: spot.clone(),
        client: BinanceRestClient::new(spot, futures, budget, options.weights.clone()),
        recv_window_ms: options.recv_window_ms,
    })
}

impl BinanceSource {
    pub fn budget(&self) -> &Arc<crate::core::kernel::RateBudget> {
        self.client.budget()
    }
}

#[async_trait]
impl InstrumentSource for BinanceSource {
    #[instrument(skip(self), fields(instrument = %instrument))]
    async fn fetch(&self, instrument: &TrackedInstrument) -> Result<Snapshot, ExchangeError> {
        match instrument.kind {
            InstrumentKind::SpotPair => {
                let ticker = self.client.spot_ticker_24h(&instrument.symbol).await?;
                converters::ticker_to_snapshot(&ticker)
            }
            InstrumentKind::FuturesPair => {
                let ticker = self.client.futures_ticker_24h(&instrument.symbol).await?;
                converters::ticker_to_snapshot(&ticker)
            }
            InstrumentKind::Wallet => {
                let balances = self.client.wallet_balances().await?;
                let reference = self.client.spot_ticker_price(REFERENCE_PRICE_SYMBOL).await?;
                converters::wallet_to_snapshot(&balances, converters::ticker_price(&reference)?)
            }
        }
    }

    fn replace_credentials(&self, credentials: &ExchangeConfig) -> Result<(), ExchangeError> {
        let signer = BinanceHmacSigner::new(
            credentials.api_key().to_string(),
            credentials.secret_key().to_string(),
            self.recv_window_ms,
        )?;
        self.spot_rest.swap_signer(Arc::new(signer));
        Ok(())
    }
}
