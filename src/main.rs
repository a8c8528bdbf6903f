use binance_sync::{
    create_binance_source, Coordinator, ExchangeConfig, LogSink, SyncOptions, TrackedInstrument,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Comma-separated symbol list from an environment variable, e.g.
/// `BINANCE_SPOT_PAIRS=BTCUSDT,ETHUSDT`.
fn symbols_from_env(var: &str) -> Vec<String> {
    std::env::var(var)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    #[cfg(feature = "env-file")]
    let credentials = ExchangeConfig::from_env_file("BINANCE").unwrap_or_else(|_| {
        warn!("no credentials configured, polling public endpoints only");
        ExchangeConfig::read_only()
    });
    #[cfg(not(feature = "env-file"))]
    let credentials = ExchangeConfig::from_env("BINANCE").unwrap_or_else(|_| {
        warn!("no credentials configured, polling public endpoints only");
        ExchangeConfig::read_only()
    });

    let options = SyncOptions::default();
    let source = Arc::new(create_binance_source(&credentials, &options)?);
    let coordinator = Coordinator::new(source, Arc::new(LogSink), options.retry);

    for symbol in symbols_from_env("BINANCE_SPOT_PAIRS") {
        coordinator.track(TrackedInstrument::spot(symbol));
    }
    for symbol in symbols_from_env("BINANCE_FUTURES_PAIRS") {
        coordinator.track(TrackedInstrument::futures(symbol));
    }
    if credentials.has_credentials() {
        coordinator.track(TrackedInstrument::wallet("primary"));
    }

    if coordinator.instruments().is_empty() {
        warn!("nothing to track; set BINANCE_SPOT_PAIRS or BINANCE_FUTURES_PAIRS");
        return Ok(());
    }

    info!(
        instruments = coordinator.instruments().len(),
        "coordinator running, ctrl-c to stop"
    );
    tokio::signal::ctrl_c().await?;

    info!("shutdown requested");
    coordinator.shutdown().await;
    Ok(())
}
