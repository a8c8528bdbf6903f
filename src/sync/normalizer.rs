use crate::core::types::{InstrumentId, Snapshot, SnapshotData};
use std::collections::HashMap;
use std::sync::Mutex;

/// Absolute tolerance under which two numeric fields count as equal,
/// absorbing floating-point noise from the exchange's own rounding
pub const DIFF_TOLERANCE: f64 = 1e-9;

/// Per-instrument snapshot cache and diff engine.
///
/// Holds exactly one prior snapshot per instrument (last-known-good, no
/// history) and flags whether a fresh snapshot materially changed. The new
/// snapshot always replaces the stored one so `fetched_at_ms` stays current
/// for staleness detection downstream, but `fetched_at_ms` alone never
/// constitutes a change.
pub struct Normalizer {
    previous: Mutex<HashMap<InstrumentId, Snapshot>>,
    tolerance: f64,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::with_tolerance(DIFF_TOLERANCE)
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            previous: Mutex::new(HashMap::new()),
            tolerance,
        }
    }

    /// Store `snapshot` as the instrument's latest state and report whether
    /// it materially differs from the prior one. The very first snapshot is
    /// the baseline and reports `changed = false`.
    pub fn apply(&self, id: &InstrumentId, snapshot: Snapshot) -> (Snapshot, bool) {
        let mut previous = self.previous.lock().expect("normalizer lock poisoned");
        let changed = previous
            .get(id)
            .is_some_and(|prior| self.materially_differs(prior, &snapshot));
        previous.insert(id.clone(), snapshot.clone());
        (snapshot, changed)
    }

    /// Latest stored snapshot for an instrument, if any
    pub fn last(&self, id: &InstrumentId) -> Option<Snapshot> {
        self.previous
            .lock()
            .expect("normalizer lock poisoned")
            .get(id)
            .cloned()
    }

    /// Drop the cached snapshot; a re-added instrument starts fresh
    pub fn forget(&self, id: &InstrumentId) {
        self.previous
            .lock()
            .expect("normalizer lock poisoned")
            .remove(id);
    }

    fn differs(&self, a: f64, b: f64) -> bool {
        (a - b).abs() > self.tolerance
    }

    fn materially_differs(&self, prior: &Snapshot, fresh: &Snapshot) -> bool {
        match (&prior.data, &fresh.data) {
            (SnapshotData::Price(a), SnapshotData::Price(b)) => {
                self.differs(a.last_price, b.last_price)
                    || self.differs(a.change_percent_24h, b.change_percent_24h)
                    || self.differs(a.high_24h, b.high_24h)
                    || self.differs(a.low_24h, b.low_24h)
            }
            (SnapshotData::Wallet(a), SnapshotData::Wallet(b)) => {
                if self.differs(a.total_btc, b.total_btc)
                    || self.differs(a.total_usdt, b.total_usdt)
                {
                    return true;
                }
                if a.balances_btc.len() != b.balances_btc.len() {
                    return true;
                }
                a.balances_btc.iter().any(|(wallet, balance)| {
                    b.balances_btc
                        .get(wallet)
                        .is_none_or(|other| self.differs(*balance, *other))
                })
            }
            // An instrument never changes kind in place, but be safe
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{PriceStats, TrackedInstrument, WalletBalances};
    use std::collections::BTreeMap;

    fn price_snapshot(last_price: f64) -> Snapshot {
        Snapshot::price(PriceStats {
            last_price,
            change_percent_24h: 1.5,
            high_24h: 61000.0,
            low_24h: 59000.0,
        })
    }

    fn wallet_snapshot(spot_btc: f64, btc_usdt: f64) -> Snapshot {
        let mut balances_btc = BTreeMap::new();
        balances_btc.insert("Spot".to_string(), spot_btc);
        Snapshot::wallet(WalletBalances {
            total_btc: spot_btc,
            total_usdt: spot_btc * btc_usdt,
            balances_btc,
        })
    }

    #[test]
    fn first_snapshot_is_the_baseline() {
        let normalizer = Normalizer::new();
        let id = TrackedInstrument::spot("BTCUSDT").id();
        let (_, changed) = normalizer.apply(&id, price_snapshot(60000.0));
        assert!(!changed);
    }

    #[test]
    fn identical_fields_do_not_flag_a_change() {
        let normalizer = Normalizer::new();
        let id = TrackedInstrument::spot("BTCUSDT").id();

        normalizer.apply(&id, price_snapshot(60000.0));
        let (_, changed) = normalizer.apply(&id, price_snapshot(60000.0));
        assert!(!changed);
    }

    #[test]
    fn fetched_at_alone_is_never_a_change() {
        let normalizer = Normalizer::new();
        let id = TrackedInstrument::spot("BTCUSDT").id();

        normalizer.apply(&id, price_snapshot(60000.0));
        let mut refreshed = price_snapshot(60000.0);
        refreshed.fetched_at_ms += 5_000;
        let (stored, changed) = normalizer.apply(&id, refreshed.clone());
        assert!(!changed);
        // the refreshed timestamp still replaces the stored snapshot
        assert_eq!(stored.fetched_at_ms, refreshed.fetched_at_ms);
        assert_eq!(
            normalizer.last(&id).unwrap().fetched_at_ms,
            refreshed.fetched_at_ms
        );
    }

    #[test]
    fn price_move_beyond_tolerance_flags_once_at_the_transition() {
        let normalizer = Normalizer::new();
        let id = TrackedInstrument::spot("BTCUSDT").id();

        let flags: Vec<bool> = [60000.0, 60000.0, 60010.5, 60010.5]
            .into_iter()
            .map(|price| normalizer.apply(&id, price_snapshot(price)).1)
            .collect();
        assert_eq!(flags, vec![false, false, true, false]);
    }

    #[test]
    fn sub_tolerance_noise_is_absorbed() {
        let normalizer = Normalizer::new();
        let id = TrackedInstrument::spot("BTCUSDT").id();

        normalizer.apply(&id, price_snapshot(60000.0));
        let (_, changed) = normalizer.apply(&id, price_snapshot(60000.0 + 1e-10));
        assert!(!changed);
    }

    #[test]
    fn wallet_balance_moves_flag_changes() {
        let normalizer = Normalizer::new();
        let id = TrackedInstrument::wallet("primary").id();

        normalizer.apply(&id, wallet_snapshot(0.5, 60000.0));
        let (_, unchanged) = normalizer.apply(&id, wallet_snapshot(0.5, 60000.0));
        let (_, changed) = normalizer.apply(&id, wallet_snapshot(0.6, 60000.0));
        assert!(!unchanged);
        assert!(changed);
    }

    #[test]
    fn forget_resets_the_baseline() {
        let normalizer = Normalizer::new();
        let id = TrackedInstrument::spot("BTCUSDT").id();

        normalizer.apply(&id, price_snapshot(60000.0));
        normalizer.forget(&id);
        assert!(normalizer.last(&id).is_none());
        let (_, changed) = normalizer.apply(&id, price_snapshot(70000.0));
        assert!(!changed);
    }
}
