//! Background state polling.
//!
//! One named thread fetches the player state on a fixed cadence and feeds
//! it to the [`StateStore`]. Failed ticks are skipped without backoff: the
//! next tick is the retry.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use tracing::{debug, info, warn};

use crate::reconcile::MergeOutcome;
use crate::store::StateStore;
use crate::volumio_client::PlayerApi;

/// Fetches the state once and merges it.
///
/// Never fails: transport errors and payloads that are not a mapping are
/// logged and dropped. Returns the merge outcome when something was merged.
pub fn poll_once(api: &dyn PlayerApi, store: &StateStore) -> Option<MergeOutcome> {
    match api.fetch_state() {
        Ok(raw) => store.merge(raw),
        Err(err) => {
            debug!(error = %err, "Skipping poll tick");
            None
        }
    }
}

struct PollerHandle {
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

/// Owns the polling thread.
pub struct Poller {
    api: Arc<dyn PlayerApi>,
    store: StateStore,
    interval: Duration,
    handle: Mutex<Option<PollerHandle>>,
}

impl Poller {
    pub fn new(api: Arc<dyn PlayerApi>, store: StateStore, interval: Duration) -> Self {
        Self {
            api,
            store,
            interval,
            handle: Mutex::new(None),
        }
    }

    /// Starts the polling thread. Idempotent.
    pub fn start(&self) {
        let mut guard = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let api = Arc::clone(&self.api);
        let store = self.store.clone();
        let interval = self.interval;

        let spawned = thread::Builder::new()
            .name("volumito-poller".to_string())
            .spawn(move || poll_loop(api, store, interval, stop_rx));

        match spawned {
            Ok(thread) => {
                info!(interval_ms = interval.as_millis() as u64, "Poller started");
                *guard = Some(PollerHandle { stop_tx, thread });
            }
            Err(err) => warn!(error = %err, "Failed to spawn poller thread"),
        }
    }

    /// Stops the polling thread and waits for it. Idempotent.
    pub fn stop(&self) {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.stop_tx.send(());
            let _ = handle.thread.join();
            info!("Poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll_loop(api: Arc<dyn PlayerApi>, store: StateStore, interval: Duration, stop_rx: Receiver<()>) {
    loop {
        poll_once(api.as_ref(), &store);

        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("Poller thread exiting");
}
