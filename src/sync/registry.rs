use crate::core::types::{InstrumentId, TrackedInstrument};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct RegisteredInstrument {
    instrument: TrackedInstrument,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// The mutable set of tracked instruments.
///
/// Read concurrently by poll cycles, mutated by the external configuration
/// collaborator. Each entry owns the shutdown signal for its cycle; removing
/// the entry fires the signal so the cycle exits at its next wait boundary.
#[derive(Default)]
pub struct InstrumentRegistry {
    inner: Mutex<HashMap<InstrumentId, RegisteredInstrument>>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instrument and spawn its cycle via `spawn`. Adding an
    /// already-present identity is idempotent and returns `false` without
    /// creating a second polling stream.
    pub fn add(
        &self,
        instrument: TrackedInstrument,
        spawn: impl FnOnce(watch::Receiver<bool>) -> JoinHandle<()>,
    ) -> bool {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        let id = instrument.id();
        if inner.contains_key(&id) {
            return false;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = spawn(shutdown_rx);
        inner.insert(
            id,
            RegisteredInstrument {
                instrument,
                shutdown,
                handle,
            },
        );
        true
    }

    /// Deregister an instrument, signalling its cycle to stop. Removing an
    /// absent identity is a no-op, not an error.
    pub fn remove(&self, id: &InstrumentId) -> bool {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        match inner.remove(id) {
            Some(entry) => {
                let _ = entry.shutdown.send(true);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &InstrumentId) -> bool {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .contains_key(id)
    }

    pub fn list(&self) -> Vec<TrackedInstrument> {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .values()
            .map(|entry| entry.instrument.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signal every cycle and hand back the join handles so the caller can
    /// await a clean exit
    pub fn drain(&self) -> Vec<JoinHandle<()>> {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        inner
            .drain()
            .map(|(_, entry)| {
                let _ = entry.shutdown.send(true);
                entry.handle
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_spawn(_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async {})
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let registry = InstrumentRegistry::new();
        assert!(registry.add(TrackedInstrument::spot("BTCUSDT"), noop_spawn));
        assert!(!registry.add(TrackedInstrument::spot("BTCUSDT"), noop_spawn));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn remove_absent_is_a_noop() {
        let registry = InstrumentRegistry::new();
        assert!(!registry.remove(&TrackedInstrument::spot("BTCUSDT").id()));
    }

    #[tokio::test]
    async fn remove_signals_shutdown() {
        let registry = InstrumentRegistry::new();
        let (signal_tx, signal_rx) = watch::channel(false);

        registry.add(TrackedInstrument::spot("BTCUSDT"), move |mut rx| {
            tokio::spawn(async move {
                let _ = rx.changed().await;
                let _ = signal_tx.send(true);
            })
        });

        assert!(registry.remove(&TrackedInstrument::spot("BTCUSDT").id()));
        let mut signal_rx = signal_rx;
        signal_rx.changed().await.unwrap();
        assert!(*signal_rx.borrow());
        assert!(registry.is_empty());
    }
}
