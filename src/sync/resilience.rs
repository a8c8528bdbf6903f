use crate::core::config::RetryPolicy;
use crate::core::errors::{ExchangeError, FailureKind};
use crate::core::traits::InstrumentSource;
use crate::core::types::{PollOutcome, TrackedInstrument};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tracing::{debug, warn};

/// Delays double per attempt starting at `base_delay`, capped at
/// `max_delay`, with jitter so many instruments failing together do not
/// retry in lockstep.
fn backoff_delays(policy: &RetryPolicy) -> impl Iterator<Item = std::time::Duration> {
    let retries = policy.max_attempts.saturating_sub(1) as usize;
    ExponentialBackoff::from_millis(2)
        .factor((policy.base_delay.as_millis() as u64 / 2).max(1))
        .max_delay(policy.max_delay)
        .map(jitter)
        .take(retries)
}

/// Drive one fetch through the retry policy and fold the result into a
/// [`PollOutcome`].
///
/// Transient failures are retried with backoff until the attempt budget runs
/// out, then surface as `Transient` (stale data, no snapshot replacement).
/// Fatal failures return immediately; retrying cannot help them. A
/// rate-limit response counts as transient: the budget manager has already
/// been penalized by the client, so the next attempt waits out the window.
pub async fn fetch_with_retry(
    source: &dyn InstrumentSource,
    instrument: &TrackedInstrument,
    policy: &RetryPolicy,
) -> PollOutcome {
    let mut delays = backoff_delays(policy);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let err: ExchangeError = match source.fetch(instrument).await {
            Ok(snapshot) => return PollOutcome::Success(snapshot),
            Err(err) => err,
        };

        match err.failure_kind() {
            FailureKind::Fatal(reason) => {
                debug!(%instrument, %err, "fatal failure, not retrying");
                return PollOutcome::Fatal(reason);
            }
            FailureKind::Transient => match delays.next() {
                Some(delay) => {
                    warn!(%instrument, %err, attempt, delay_ms = delay.as_millis() as u64,
                        "transient failure, backing off");
                    tokio::time::sleep(delay).await;
                }
                None => {
                    warn!(%instrument, %err, attempt, "retries exhausted, keeping stale data");
                    return PollOutcome::Transient(err.to_string());
                }
            },
        }
    }
}
