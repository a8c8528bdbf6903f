use crate::core::config::ExchangeConfig;
use crate::core::errors::{ExchangeError, FatalReason};
use crate::core::types::{Snapshot, TrackedInstrument};
use async_trait::async_trait;
use tracing::{info, warn};

/// One fetch for one instrument, already typed and normalized into a
/// [`Snapshot`]. The scheduler only ever talks to the exchange through this
/// seam, which keeps the poll cycles testable without a network.
#[async_trait]
pub trait InstrumentSource: Send + Sync {
    async fn fetch(&self, instrument: &TrackedInstrument) -> Result<Snapshot, ExchangeError>;

    /// Swap in new credentials for private endpoints. Returns
    /// `InvalidCredential` without any network I/O if the secret is
    /// malformed.
    fn replace_credentials(&self, credentials: &ExchangeConfig) -> Result<(), ExchangeError>;
}

/// Receives snapshot updates from the coordinator. The sink turns these into
/// whatever the host platform needs (entities, dashboards, logs); the core
/// makes no assumption about storage or rendering.
///
/// Callbacks must be cheap; they run on the polling task.
pub trait SnapshotSink: Send + Sync {
    fn on_snapshot(&self, instrument: &TrackedInstrument, snapshot: Snapshot, changed: bool);

    /// Called exactly once per cause when an instrument's cycle is disabled
    fn on_instrument_disabled(&self, instrument: &TrackedInstrument, reason: &FatalReason);
}

/// Default sink that just logs updates via `tracing`
pub struct LogSink;

impl SnapshotSink for LogSink {
    fn on_snapshot(&self, instrument: &TrackedInstrument, snapshot: Snapshot, changed: bool) {
        if changed {
            info!(%instrument, fetched_at_ms = snapshot.fetched_at_ms, "snapshot changed");
        } else {
            info!(%instrument, fetched_at_ms = snapshot.fetched_at_ms, "snapshot refreshed");
        }
    }

    fn on_instrument_disabled(&self, instrument: &TrackedInstrument, reason: &FatalReason) {
        warn!(%instrument, %reason, "instrument disabled");
    }
}
