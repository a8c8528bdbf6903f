//! Poll orchestration: the registry of tracked instruments, the per-instrument
//! scheduler, retry handling, and the snapshot diff engine, tied together by
//! the [`Coordinator`].

pub mod normalizer;
pub mod registry;
pub mod resilience;
pub mod scheduler;

pub use normalizer::{Normalizer, DIFF_TOLERANCE};
pub use registry::InstrumentRegistry;
pub use resilience::fetch_with_retry;

use crate::core::config::{ExchangeConfig, RetryPolicy};
use crate::core::errors::ExchangeError;
use crate::core::traits::{InstrumentSource, SnapshotSink};
use crate::core::types::{InstrumentId, Snapshot, TrackedInstrument};
use scheduler::{run_cycle, AuthState, CycleContext};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Owns the tracked-instrument set and one polling task per instrument.
///
/// Each tracked instrument gets an independent cycle; cycles only meet inside
/// the source's shared rate budget and the credential validity signal. Adding
/// and removing instruments is safe at any time and never disturbs the other
/// cycles.
pub struct Coordinator {
    context: Arc<CycleContext>,
    registry: InstrumentRegistry,
}

impl Coordinator {
    pub fn new(
        source: Arc<dyn InstrumentSource>,
        sink: Arc<dyn SnapshotSink>,
        retry: RetryPolicy,
    ) -> Self {
        let (auth, _) = watch::channel(AuthState::initial());
        Self {
            context: Arc::new(CycleContext {
                source,
                normalizer: Arc::new(Normalizer::new()),
                sink,
                retry,
                auth,
            }),
            registry: InstrumentRegistry::new(),
        }
    }

    /// Start polling an instrument. Returns `false` if the same identity is
    /// already tracked; the existing cycle keeps running untouched.
    pub fn track(&self, instrument: TrackedInstrument) -> bool {
        let context = Arc::clone(&self.context);
        let spawned = instrument.clone();
        let added = self.registry.add(instrument.clone(), move |shutdown| {
            tokio::spawn(run_cycle(context, spawned, shutdown))
        });
        if added {
            info!(%instrument, interval_s = instrument.poll_interval.as_secs(), "tracking instrument");
        }
        added
    }

    /// Stop polling an instrument and drop its cached snapshot, so a later
    /// re-add starts from a fresh baseline. Removing an untracked identity
    /// is a no-op.
    pub fn untrack(&self, id: &InstrumentId) -> bool {
        let removed = self.registry.remove(id);
        if removed {
            self.context.normalizer.forget(id);
            info!(%id, "stopped tracking instrument");
        }
        removed
    }

    pub fn is_tracking(&self, id: &InstrumentId) -> bool {
        self.registry.contains(id)
    }

    pub fn instruments(&self) -> Vec<TrackedInstrument> {
        self.registry.list()
    }

    /// Latest snapshot the diff engine has seen for an instrument, if any.
    /// May be stale while the instrument's fetches are failing transiently.
    pub fn last_snapshot(&self, id: &InstrumentId) -> Option<Snapshot> {
        self.context.normalizer.last(id)
    }

    /// Swap in new credentials and re-enable any private cycles parked on an
    /// authentication failure. Cycles pick the new signer up on their next
    /// request; no restart needed.
    pub fn rotate_credentials(&self, credentials: &ExchangeConfig) -> Result<(), ExchangeError> {
        self.context.source.replace_credentials(credentials)?;
        self.context.auth.send_modify(|state| {
            state.generation += 1;
            state.valid = true;
        });
        info!("credentials rotated, private cycles re-enabled");
        Ok(())
    }

    /// Signal every cycle to stop and wait for them to exit.
    pub async fn shutdown(self) {
        let handles = self.registry.drain();
        info!(cycles = handles.len(), "shutting down poll cycles");
        for handle in handles {
            let _ = handle.await;
        }
    }
}
