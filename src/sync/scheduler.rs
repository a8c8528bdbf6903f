use crate::core::config::RetryPolicy;
use crate::core::errors::FatalReason;
use crate::core::traits::{InstrumentSource, SnapshotSink};
use crate::core::types::{PollOutcome, TrackedInstrument};
use crate::sync::normalizer::Normalizer;
use crate::sync::resilience;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

/// Validity of the shared credentials. `generation` bumps on every rotation
/// so each invalidation episode is reported exactly once per private cycle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AuthState {
    pub generation: u64,
    pub valid: bool,
}

impl AuthState {
    pub(crate) fn initial() -> Self {
        Self {
            generation: 0,
            valid: true,
        }
    }
}

/// Everything a poll cycle shares with its siblings. The only cross-cycle
/// contention is inside the source's rate budget.
pub(crate) struct CycleContext {
    pub source: Arc<dyn InstrumentSource>,
    pub normalizer: Arc<Normalizer>,
    pub sink: Arc<dyn SnapshotSink>,
    pub retry: RetryPolicy,
    pub auth: watch::Sender<AuthState>,
}

impl CycleContext {
    fn revoke_auth(&self) {
        self.auth.send_modify(|state| state.valid = false);
    }
}

/// One instrument's repeating fetch cycle: first poll immediately, then
/// every `poll_interval`. Exits when the registry signals shutdown, or
/// permanently on a fatal failure that credential rotation cannot fix.
pub(crate) async fn run_cycle(
    ctx: Arc<CycleContext>,
    instrument: TrackedInstrument,
    mut shutdown: watch::Receiver<bool>,
) {
    let id = instrument.id();
    let mut auth = ctx.auth.subscribe();
    let mut reported_generation: Option<u64> = None;
    let mut ticker = interval(instrument.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(%instrument, "poll cycle started");

    'cycle: loop {
        tokio::select! {
            _ = shutdown.changed() => break 'cycle,
            _ = ticker.tick() => {}
        }

        if instrument.kind.requires_auth() {
            // Park while credentials are invalid; rotation re-enables us
            // and the fetch below runs immediately.
            loop {
                let state = *auth.borrow_and_update();
                if state.valid {
                    break;
                }
                if reported_generation != Some(state.generation) {
                    reported_generation = Some(state.generation);
                    ctx.sink
                        .on_instrument_disabled(&instrument, &FatalReason::AuthRejected);
                }
                tokio::select! {
                    _ = shutdown.changed() => break 'cycle,
                    changed = auth.changed() => {
                        if changed.is_err() {
                            break 'cycle;
                        }
                    }
                }
            }
        }

        let outcome =
            resilience::fetch_with_retry(ctx.source.as_ref(), &instrument, &ctx.retry).await;

        // The instrument may have been removed while the fetch was in
        // flight; its result must not reach the normalizer or the sink.
        if *shutdown.borrow() {
            break 'cycle;
        }

        match outcome {
            PollOutcome::Success(snapshot) => {
                let (snapshot, changed) = ctx.normalizer.apply(&id, snapshot);
                ctx.sink.on_snapshot(&instrument, snapshot, changed);
            }
            PollOutcome::Transient(reason) => {
                warn!(%instrument, %reason, "poll failed, previous snapshot kept as stale");
            }
            PollOutcome::Fatal(FatalReason::AuthRejected)
                if instrument.kind.requires_auth() =>
            {
                // Credentials are invalid for every private cycle, not just
                // this one. The park loop above reports the disable.
                warn!(%instrument, "authentication rejected, disabling private cycles");
                ctx.revoke_auth();
                ticker.reset_immediately();
            }
            PollOutcome::Fatal(reason) => {
                ctx.sink.on_instrument_disabled(&instrument, &reason);
                if instrument.kind.requires_auth() {
                    // Wallet access hinges on account permissions; a new
                    // credential may fix it, so park until rotation.
                    let failed_generation = auth.borrow().generation;
                    tokio::select! {
                        _ = shutdown.changed() => break 'cycle,
                        restored = auth.wait_for(|s| s.valid && s.generation > failed_generation) => {
                            if restored.is_err() {
                                break 'cycle;
                            }
                            ticker.reset_immediately();
                        }
                    }
                } else {
                    // Misconfiguration (bad symbol or similar); retrying
                    // cannot succeed.
                    break 'cycle;
                }
            }
        }
    }

    debug!(%instrument, "poll cycle stopped");
}
