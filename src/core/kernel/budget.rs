use crate::core::config::RateBudgetConfig;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Answer to a weight reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Allow,
    /// Budget exhausted; retry the reservation after this many milliseconds
    WaitMs(u64),
}

struct WindowState {
    used: u32,
    window_end: Instant,
}

/// Fixed-window request-weight accounting, shared by every call issued under
/// one credential.
///
/// Callers reserve an endpoint's weight before dispatching; a denied
/// reservation must be retried after the indicated wait, never dropped or
/// fired anyway. An exchange-reported rate-limit response feeds back through
/// [`RateBudget::penalize`], which pessimistically exhausts the window so
/// local accounting cannot drift ahead of the exchange's authoritative
/// counter.
pub struct RateBudget {
    weight_limit: u32,
    window: Duration,
    state: Mutex<WindowState>,
    /// FIFO queue position for suspended callers; the only cross-cycle
    /// serialization point in the coordinator
    turnstile: tokio::sync::Mutex<()>,
}

impl RateBudget {
    pub fn new(config: &RateBudgetConfig) -> Self {
        Self {
            weight_limit: config.weight_limit,
            window: config.window,
            state: Mutex::new(WindowState {
                used: 0,
                window_end: Instant::now() + config.window,
            }),
            turnstile: tokio::sync::Mutex::new(()),
        }
    }

    /// Try to reserve `weight` within the current window
    pub fn reserve(&self, weight: u32) -> Reservation {
        let mut state = self.state.lock().expect("budget state poisoned");
        let now = Instant::now();

        if now >= state.window_end {
            state.used = 0;
            state.window_end = now + self.window;
        }

        // A single call heavier than the whole budget still has to run;
        // grant it an otherwise-empty window.
        if weight >= self.weight_limit && state.used == 0 {
            state.used = self.weight_limit;
            return Reservation::Allow;
        }

        if state.used + weight <= self.weight_limit {
            state.used += weight;
            debug!(weight, used = state.used, limit = self.weight_limit, "weight reserved");
            Reservation::Allow
        } else {
            let wait = state.window_end.saturating_duration_since(now);
            Reservation::WaitMs((wait.as_millis() as u64).max(1))
        }
    }

    /// Suspend until a reservation for `weight` succeeds. Waiters are served
    /// first-reserved, first-served so no cycle starves.
    pub async fn acquire(&self, weight: u32) {
        let _turn = self.turnstile.lock().await;
        loop {
            match self.reserve(weight) {
                Reservation::Allow => return,
                Reservation::WaitMs(ms) => {
                    debug!(weight, wait_ms = ms, "budget exhausted, waiting");
                    sleep(Duration::from_millis(ms)).await;
                }
            }
        }
    }

    /// React to an exchange-reported rate-limit response: mark the window
    /// exhausted and, when the exchange supplied a `Retry-After` hint, adopt
    /// it as the new window end.
    pub fn penalize(&self, retry_after: Option<Duration>) {
        let mut state = self.state.lock().expect("budget state poisoned");
        state.used = self.weight_limit;
        if let Some(hint) = retry_after {
            state.window_end = Instant::now() + hint;
        }
        warn!(?retry_after, "exchange reported rate limit, window marked exhausted");
    }

    /// Weight consumed in the current window
    pub fn used(&self) -> u32 {
        self.state.lock().expect("budget state poisoned").used
    }

    pub fn weight_limit(&self) -> u32 {
        self.weight_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(limit: u32, window: Duration) -> RateBudget {
        RateBudget::new(&RateBudgetConfig {
            weight_limit: limit,
            window,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn twenty_fifth_reservation_of_fifty_is_denied() {
        let budget = budget(1200, Duration::from_secs(60));

        for _ in 0..24 {
            assert_eq!(budget.reserve(50), Reservation::Allow);
        }
        match budget.reserve(50) {
            Reservation::WaitMs(ms) => assert!(ms > 0),
            Reservation::Allow => panic!("reservation beyond the limit must be denied"),
        }
        assert_eq!(budget.used(), 1200);
    }

    #[tokio::test(start_paused = true)]
    async fn window_elapse_releases_reserved_weight() {
        let budget = budget(100, Duration::from_secs(60));

        assert_eq!(budget.reserve(100), Reservation::Allow);
        assert!(matches!(budget.reserve(1), Reservation::WaitMs(_)));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(budget.reserve(100), Reservation::Allow);
    }

    #[tokio::test(start_paused = true)]
    async fn penalize_exhausts_window_and_adopts_hint() {
        let budget = budget(1200, Duration::from_secs(60));
        assert_eq!(budget.reserve(1), Reservation::Allow);

        budget.penalize(Some(Duration::from_secs(5)));
        match budget.reserve(1) {
            Reservation::WaitMs(ms) => assert!(ms <= 5_000, "hint should cap the wait, got {ms}"),
            Reservation::Allow => panic!("penalized budget must deny"),
        }

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(budget.reserve(1), Reservation::Allow);
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_suspends_until_window_resets() {
        let budget = budget(10, Duration::from_secs(60));
        budget.acquire(10).await;

        let started = Instant::now();
        budget.acquire(5).await;
        assert!(started.elapsed() >= Duration::from_secs(59));
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_reservation_gets_an_empty_window() {
        let budget = budget(10, Duration::from_secs(60));
        assert_eq!(budget.reserve(25), Reservation::Allow);
        assert!(matches!(budget.reserve(1), Reservation::WaitMs(_)));
    }
}
