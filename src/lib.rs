//! Asynchronous Binance polling coordinator.
//!
//! Tracks a mutable set of instruments (spot pairs, futures pairs, wallet
//! balances), polls each on its own cadence under a shared request-weight
//! budget, and hands normalized snapshots with change flags to a
//! [`SnapshotSink`]. Credentials are held behind [`secrecy`] wrappers and can
//! be rotated at runtime without restarting the poll cycles.
//!
//! ```no_run
//! use binance_sync::{
//!     create_binance_source, Coordinator, ExchangeConfig, LogSink, RetryPolicy,
//!     SyncOptions, TrackedInstrument,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), binance_sync::ExchangeError> {
//! let credentials = ExchangeConfig::from_env("BINANCE")?;
//! let options = SyncOptions::default();
//! let source = Arc::new(create_binance_source(&credentials, &options)?);
//! let coordinator = Coordinator::new(source, Arc::new(LogSink), options.retry);
//!
//! coordinator.track(TrackedInstrument::spot("BTCUSDT"));
//! coordinator.track(TrackedInstrument::wallet("primary"));
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod exchanges;
pub mod sync;

pub use crate::core::config::{
    ConfigError, EndpointWeights, ExchangeConfig, RateBudgetConfig, RetryPolicy, SyncOptions,
};
pub use crate::core::errors::{ExchangeError, FailureKind, FatalReason};
pub use crate::core::kernel::{
    BinanceHmacSigner, RateBudget, Reservation, RestClient, Signer,
};
pub use crate::core::traits::{InstrumentSource, LogSink, SnapshotSink};
pub use crate::core::types::{
    InstrumentId, InstrumentKind, PollOutcome, PriceStats, Snapshot, SnapshotData,
    TrackedInstrument, WalletBalances, DEFAULT_PRICE_POLL_INTERVAL, DEFAULT_WALLET_POLL_INTERVAL,
    MIN_POLL_INTERVAL,
};
pub use crate::exchanges::binance::{create_binance_source, BinanceSource};
pub use crate::sync::{Coordinator, Normalizer};
