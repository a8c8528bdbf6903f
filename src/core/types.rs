use crate::core::errors::FatalReason;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Exchange-safe floor for polling cadence. The configuration collaborator
/// should never go below this; we clamp defensively anyway.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default cadence for price instruments, matching the integration default.
pub const DEFAULT_PRICE_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Default cadence for wallet instruments. Balances move slower than prices
/// and the endpoint is an order of magnitude heavier.
pub const DEFAULT_WALLET_POLL_INTERVAL: Duration = Duration::from_secs(120);

/// What kind of thing an instrument tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    SpotPair,
    FuturesPair,
    Wallet,
}

impl InstrumentKind {
    /// Whether polling this kind requires signed (private) requests
    pub fn requires_auth(self) -> bool {
        matches!(self, Self::Wallet)
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpotPair => write!(f, "spot"),
            Self::FuturesPair => write!(f, "futures"),
            Self::Wallet => write!(f, "wallet"),
        }
    }
}

/// Immutable identity of a tracked instrument. Removing and re-adding an
/// instrument creates a new instance with the same id but fresh state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrumentId {
    pub kind: InstrumentKind,
    pub symbol: String,
}

impl InstrumentId {
    pub fn new(kind: InstrumentKind, symbol: impl Into<String>) -> Self {
        Self {
            kind,
            symbol: symbol.into(),
        }
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.symbol)
    }
}

/// One thing to poll: a spot pair, a futures pair, or a wallet/account.
///
/// `symbol` holds the exchange pair symbol (e.g. `BTCUSDT`) for price
/// instruments and an account label for wallet instruments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedInstrument {
    pub kind: InstrumentKind,
    pub symbol: String,
    pub poll_interval: Duration,
}

impl TrackedInstrument {
    pub fn new(kind: InstrumentKind, symbol: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            kind,
            symbol: symbol.into(),
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn spot(symbol: impl Into<String>) -> Self {
        Self::new(InstrumentKind::SpotPair, symbol, DEFAULT_PRICE_POLL_INTERVAL)
    }

    pub fn futures(symbol: impl Into<String>) -> Self {
        Self::new(
            InstrumentKind::FuturesPair,
            symbol,
            DEFAULT_PRICE_POLL_INTERVAL,
        )
    }

    pub fn wallet(account: impl Into<String>) -> Self {
        Self::new(InstrumentKind::Wallet, account, DEFAULT_WALLET_POLL_INTERVAL)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn id(&self) -> InstrumentId {
        InstrumentId::new(self.kind, self.symbol.clone())
    }
}

impl fmt::Display for TrackedInstrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.symbol)
    }
}

/// 24h price statistics for a spot or futures pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    pub last_price: f64,
    pub change_percent_24h: f64,
    pub high_24h: f64,
    pub low_24h: f64,
}

/// Per-wallet balances, BTC-denominated as the exchange reports them, plus
/// aggregate totals in BTC and USDT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletBalances {
    /// Balance per wallet type (Spot, Funding, Cross Margin, ...), in BTC
    pub balances_btc: BTreeMap<String, f64>,
    pub total_btc: f64,
    pub total_usdt: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SnapshotData {
    Price(PriceStats),
    Wallet(WalletBalances),
}

/// Canonical, complete latest-known state for one instrument. Snapshots are
/// replaced whole, never partially mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub data: SnapshotData,
    pub fetched_at_ms: i64,
}

impl Snapshot {
    pub fn price(stats: PriceStats) -> Self {
        Self {
            data: SnapshotData::Price(stats),
            fetched_at_ms: now_ms(),
        }
    }

    pub fn wallet(balances: WalletBalances) -> Self {
        Self {
            data: SnapshotData::Wallet(balances),
            fetched_at_ms: now_ms(),
        }
    }

    pub fn as_price(&self) -> Option<&PriceStats> {
        match &self.data {
            SnapshotData::Price(stats) => Some(stats),
            SnapshotData::Wallet(_) => None,
        }
    }

    pub fn as_wallet(&self) -> Option<&WalletBalances> {
        match &self.data {
            SnapshotData::Wallet(balances) => Some(balances),
            SnapshotData::Price(_) => None,
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Tagged result of one fetch attempt, after the retry policy has run
#[derive(Debug)]
pub enum PollOutcome {
    Success(Snapshot),
    /// Retries exhausted; last snapshot stays in place as stale data
    Transient(String),
    Fatal(FatalReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_interval_is_clamped_to_floor() {
        let instrument =
            TrackedInstrument::spot("BTCUSDT").with_poll_interval(Duration::from_millis(100));
        assert_eq!(instrument.poll_interval, MIN_POLL_INTERVAL);
    }

    #[test]
    fn identity_is_kind_plus_symbol() {
        let a = TrackedInstrument::spot("BTCUSDT");
        let b = TrackedInstrument::spot("BTCUSDT").with_poll_interval(Duration::from_secs(10));
        let c = TrackedInstrument::futures("BTCUSDT");
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn only_wallets_require_auth() {
        assert!(InstrumentKind::Wallet.requires_auth());
        assert!(!InstrumentKind::SpotPair.requires_auth());
        assert!(!InstrumentKind::FuturesPair.requires_auth());
    }
}
